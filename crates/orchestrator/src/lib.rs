//! Agent orchestration for agentloom.
//!
//! `LlmAgent` is the model-backed leaf; `SequentialAgent`, `ParallelAgent`,
//! and `LoopAgent` compose agents into pipelines that satisfy the same
//! `Agent` contract; `Runner` drives a root agent against a session store.

mod hooks;
mod llm_agent;
mod pipeline;
mod runner;

pub use hooks::{AfterRunHook, HookedAgent, SaveToMemoryHook};
pub use llm_agent::LlmAgent;
pub use pipeline::{LoopAgent, LoopRun, LoopTermination, ParallelAgent, ParallelPolicy, SequentialAgent};
pub use runner::Runner;
