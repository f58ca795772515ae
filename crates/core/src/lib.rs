//! # agentloom Core
//!
//! Domain types, traits, and error definitions for the agentloom
//! multi-agent orchestration runtime. This crate has **zero framework
//! dependencies** — it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in
//! their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)
//!
//! There are no ambient singletons: session and memory stores are explicit
//! handles threaded through every invocation.

pub mod agent;
pub mod error;
pub mod memory;
pub mod provider;
pub mod session;
pub mod tool;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use agent::{Agent, AgentOutcome, InvocationContext};
pub use error::{Error, Result};
pub use memory::{MemoryQuery, MemoryRecord, MemoryService};
pub use provider::{ModelProvider, ModelReply, ModelRequest};
pub use session::{Session, SessionKey, SessionService, SessionState, StateScope};
pub use tool::{
    Tool, ToolCall, ToolContext, ToolControl, ToolDefinition, ToolDispatch, ToolRegistry,
    ToolResponse,
};
pub use turn::{Role, Turn};
