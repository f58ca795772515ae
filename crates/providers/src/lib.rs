//! Model providers for agentloom.
//!
//! `GeminiProvider` talks to the hosted API; `RetryingProvider` wraps any
//! provider with exponential backoff; `ScriptedProvider` is the test
//! double used throughout the workspace.

mod gemini;
mod retry;
mod scripted;

pub use gemini::GeminiProvider;
pub use retry::{RetryPolicy, RetryingProvider};
pub use scripted::ScriptedProvider;
