//! The Agent invocation contract.
//!
//! Leaf agents and pipeline composites satisfy the same trait, so a
//! pipeline is usable anywhere a single agent is (the composability
//! invariant). An agent is immutable configuration: all mutable state
//! lives in the session it is invoked against.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::memory::MemoryService;
use crate::session::Session;

/// Everything an agent invocation may touch: the shared session, the
/// running input, and the (optional) memory service handle.
///
/// Cloning is cheap; the parallel composite hands each concurrent
/// sub-agent its own clone over the same shared session.
#[derive(Clone)]
pub struct InvocationContext {
    pub session: Arc<Session>,
    pub input: String,
    pub memory: Option<Arc<dyn MemoryService>>,
}

impl InvocationContext {
    pub fn new(session: Arc<Session>, input: impl Into<String>) -> Self {
        Self {
            session,
            input: input.into(),
            memory: None,
        }
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemoryService>) -> Self {
        self.memory = Some(memory);
        self
    }
}

/// What one agent invocation produced.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    /// The agent's final content for this invocation.
    pub content: String,

    /// Set when the exit signal was raised during this invocation.
    /// Bubbles up through composites until a loop consumes it.
    pub exit_requested: bool,
}

impl AgentOutcome {
    /// An ordinary completed outcome.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            exit_requested: false,
        }
    }

    /// An outcome carrying the loop-exit signal.
    pub fn exit(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            exit_requested: true,
        }
    }
}

/// The shared invocation contract for leaf agents and composites.
#[async_trait]
pub trait Agent: Send + Sync {
    /// The unique name of this agent within its pipeline.
    fn name(&self) -> &str;

    /// A short description, surfaced to coordinating agents and agent cards.
    fn description(&self) -> &str {
        ""
    }

    /// Run this agent against the given context.
    ///
    /// Failure aborts the enclosing pipeline scope (fail-fast by default);
    /// there is no partial-success continuation for a single agent.
    async fn run(&self, ctx: &InvocationContext) -> Result<AgentOutcome>;
}
