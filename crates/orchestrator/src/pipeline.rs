//! Pipeline composites: sequential, parallel, and bounded loop.
//!
//! Every composite satisfies the `Agent` contract itself, so pipelines
//! nest arbitrarily. All composition happens over one shared session; the
//! parallel composite assumes disjoint output keys between its branches.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use agentloom_core::agent::{Agent, AgentOutcome, InvocationContext};
use agentloom_core::error::{Error, Result};

/// Runs sub-agents in order against the shared session.
///
/// Fail-fast: the first failure aborts the remaining sequence. An exit
/// signal from a sub-agent skips the rest of the sequence and bubbles up.
pub struct SequentialAgent {
    name: String,
    agents: Vec<Arc<dyn Agent>>,
}

impl SequentialAgent {
    pub fn new(name: impl Into<String>, agents: Vec<Arc<dyn Agent>>) -> Self {
        Self {
            name: name.into(),
            agents,
        }
    }
}

#[async_trait]
impl Agent for SequentialAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &InvocationContext) -> Result<AgentOutcome> {
        let mut content = String::new();
        for agent in &self.agents {
            debug!(pipeline = %self.name, agent = agent.name(), "Running sequential step");
            let outcome = agent.run(ctx).await?;
            if !outcome.content.is_empty() {
                content = outcome.content;
            }
            if outcome.exit_requested {
                debug!(pipeline = %self.name, agent = agent.name(), "Exit signal, skipping rest of sequence");
                return Ok(AgentOutcome::exit(content));
            }
        }
        Ok(AgentOutcome::text(content))
    }
}

/// What a failed branch does to its still-running siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParallelPolicy {
    /// Let every branch finish, then report the first failure (by branch
    /// order) if any.
    #[default]
    WaitAll,
    /// Abort remaining branches as soon as one fails.
    FailFast,
}

/// Runs sub-agents concurrently against the shared session.
///
/// Branches must write disjoint output keys; concurrent writes to the
/// same key are out of contract.
pub struct ParallelAgent {
    name: String,
    agents: Vec<Arc<dyn Agent>>,
    policy: ParallelPolicy,
}

impl ParallelAgent {
    pub fn new(name: impl Into<String>, agents: Vec<Arc<dyn Agent>>) -> Self {
        Self {
            name: name.into(),
            agents,
            policy: ParallelPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ParallelPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[async_trait]
impl Agent for ParallelAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &InvocationContext) -> Result<AgentOutcome> {
        let mut set = JoinSet::new();
        for (index, agent) in self.agents.iter().enumerate() {
            let agent = Arc::clone(agent);
            let ctx = ctx.clone();
            set.spawn(async move { (index, agent.run(&ctx).await) });
        }

        let mut outcomes: Vec<Option<AgentOutcome>> = (0..self.agents.len()).map(|_| None).collect();
        let mut first_failure: Option<(usize, Error)> = None;

        while let Some(joined) = set.join_next().await {
            let (index, result) = joined
                .map_err(|e| Error::Internal(format!("parallel branch panicked: {e}")))?;
            match result {
                Ok(outcome) => outcomes[index] = Some(outcome),
                Err(e) => {
                    warn!(pipeline = %self.name, branch = index, error = %e, "Parallel branch failed");
                    if self.policy == ParallelPolicy::FailFast {
                        set.abort_all();
                        return Err(e);
                    }
                    if first_failure.as_ref().is_none_or(|(i, _)| index < *i) {
                        first_failure = Some((index, e));
                    }
                }
            }
        }

        if let Some((_, e)) = first_failure {
            return Err(e);
        }

        let mut exit_requested = false;
        let mut parts = Vec::new();
        for outcome in outcomes.into_iter().flatten() {
            exit_requested |= outcome.exit_requested;
            if !outcome.content.is_empty() {
                parts.push(outcome.content);
            }
        }
        let content = parts.join("\n");
        Ok(if exit_requested {
            AgentOutcome::exit(content)
        } else {
            AgentOutcome::text(content)
        })
    }
}

/// Why a loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopTermination {
    /// A sub-agent raised the exit signal.
    ExitSignal,
    /// The iteration bound was reached. Not a failure.
    BoundReached,
}

/// The observable result of one loop execution.
#[derive(Debug, Clone)]
pub struct LoopRun {
    pub termination: LoopTermination,
    /// Completed (or partially completed, on exit) iterations.
    pub iterations: u32,
    /// The last non-empty content produced by the body.
    pub content: String,
}

/// Runs its body sequentially, once per iteration, up to a bound.
///
/// The exit signal terminates the loop before the bound and cancels the
/// remainder of the current body iteration; it is consumed here and does
/// not propagate further up.
pub struct LoopAgent {
    name: String,
    body: Vec<Arc<dyn Agent>>,
    max_iterations: u32,
}

impl LoopAgent {
    pub fn new(name: impl Into<String>, body: Vec<Arc<dyn Agent>>, max_iterations: u32) -> Self {
        Self {
            name: name.into(),
            body,
            max_iterations,
        }
    }

    /// Run the loop and report how it terminated.
    pub async fn execute(&self, ctx: &InvocationContext) -> Result<LoopRun> {
        let mut content = String::new();
        for iteration in 1..=self.max_iterations {
            for agent in &self.body {
                debug!(
                    loop_ = %self.name,
                    iteration,
                    agent = agent.name(),
                    "Running loop body step"
                );
                let outcome = agent.run(ctx).await?;
                if !outcome.content.is_empty() {
                    content = outcome.content;
                }
                if outcome.exit_requested {
                    info!(loop_ = %self.name, iteration, "Loop terminated by exit signal");
                    return Ok(LoopRun {
                        termination: LoopTermination::ExitSignal,
                        iterations: iteration,
                        content,
                    });
                }
            }
        }
        info!(
            loop_ = %self.name,
            iterations = self.max_iterations,
            "Loop reached its iteration bound"
        );
        Ok(LoopRun {
            termination: LoopTermination::BoundReached,
            iterations: self.max_iterations,
            content,
        })
    }
}

#[async_trait]
impl Agent for LoopAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &InvocationContext) -> Result<AgentOutcome> {
        let run = self.execute(ctx).await?;
        Ok(AgentOutcome::text(run.content))
    }
}
