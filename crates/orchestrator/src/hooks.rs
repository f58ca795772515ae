//! Post-run hooks: side effects attached to a pipeline node.
//!
//! Hooks run after the node's output has been committed. A hook failure is
//! logged and isolated from the pipeline result unless the hook declares
//! itself fatal.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use agentloom_core::agent::{Agent, AgentOutcome, InvocationContext};
use agentloom_core::error::{Error, Result};

/// A side effect to run after an agent invocation commits its output.
#[async_trait]
pub trait AfterRunHook: Send + Sync {
    fn name(&self) -> &str;

    /// Whether a failure of this hook fails the whole invocation.
    fn fatal(&self) -> bool {
        false
    }

    async fn after_run(&self, ctx: &InvocationContext, outcome: &AgentOutcome) -> Result<()>;
}

/// Wraps any agent with a list of post-run hooks.
pub struct HookedAgent {
    inner: Arc<dyn Agent>,
    hooks: Vec<Arc<dyn AfterRunHook>>,
}

impl HookedAgent {
    pub fn new(inner: Arc<dyn Agent>) -> Self {
        Self {
            inner,
            hooks: Vec::new(),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn AfterRunHook>) -> Self {
        self.hooks.push(hook);
        self
    }
}

#[async_trait]
impl Agent for HookedAgent {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    async fn run(&self, ctx: &InvocationContext) -> Result<AgentOutcome> {
        let outcome = self.inner.run(ctx).await?;
        for hook in &self.hooks {
            match hook.after_run(ctx, &outcome).await {
                Ok(()) => debug!(agent = self.inner.name(), hook = hook.name(), "Hook ran"),
                Err(e) if hook.fatal() => {
                    return Err(Error::Hook {
                        hook: hook.name().to_string(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(
                        agent = self.inner.name(),
                        hook = hook.name(),
                        error = %e,
                        "Hook failed, continuing"
                    );
                }
            }
        }
        Ok(outcome)
    }
}

/// Ingests the session into the memory store after each run.
pub struct SaveToMemoryHook;

#[async_trait]
impl AfterRunHook for SaveToMemoryHook {
    fn name(&self) -> &str {
        "save_to_memory"
    }

    async fn after_run(&self, ctx: &InvocationContext, _outcome: &AgentOutcome) -> Result<()> {
        let Some(memory) = &ctx.memory else {
            return Err(Error::Internal("no memory service configured".into()));
        };
        let count = memory.ingest(&ctx.session).await?;
        debug!(session = %ctx.session.key, records = count, "Session saved to memory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloom_core::memory::{MemoryQuery, MemoryService};
    use agentloom_core::session::{Session, SessionKey, SessionState};
    use agentloom_core::turn::Turn;
    use agentloom_memory::InMemoryMemoryService;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct EchoAgent;

    #[async_trait]
    impl Agent for EchoAgent {
        fn name(&self) -> &str {
            "echo"
        }
        async fn run(&self, ctx: &InvocationContext) -> Result<AgentOutcome> {
            ctx.session
                .append(Turn::model("echo", ctx.input.clone()))
                .await;
            Ok(AgentOutcome::text(ctx.input.clone()))
        }
    }

    struct CountingHook {
        calls: AtomicU32,
        fail: bool,
        fatal: bool,
    }

    impl CountingHook {
        fn new(fail: bool, fatal: bool) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail,
                fatal,
            }
        }
    }

    #[async_trait]
    impl AfterRunHook for CountingHook {
        fn name(&self) -> &str {
            "counting"
        }
        fn fatal(&self) -> bool {
            self.fatal
        }
        async fn after_run(&self, _ctx: &InvocationContext, _outcome: &AgentOutcome) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(Error::Internal("hook broke".into()))
            } else {
                Ok(())
            }
        }
    }

    fn ctx() -> InvocationContext {
        InvocationContext::new(
            Arc::new(Session::new(
                SessionKey::new("app", "user", "s1"),
                SessionState::detached(),
            )),
            "remember that my favorite color is blue",
        )
    }

    #[tokio::test]
    async fn hooks_run_after_success() {
        let hook = Arc::new(CountingHook::new(false, false));
        let agent = HookedAgent::new(Arc::new(EchoAgent)).with_hook(Arc::clone(&hook) as _);
        agent.run(&ctx()).await.unwrap();
        assert_eq!(hook.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_fatal_hook_failure_is_swallowed() {
        let hook = Arc::new(CountingHook::new(true, false));
        let agent = HookedAgent::new(Arc::new(EchoAgent)).with_hook(Arc::clone(&hook) as _);
        let outcome = agent.run(&ctx()).await.unwrap();
        assert_eq!(outcome.content, "remember that my favorite color is blue");
    }

    #[tokio::test]
    async fn fatal_hook_failure_fails_the_run() {
        let hook = Arc::new(CountingHook::new(true, true));
        let agent = HookedAgent::new(Arc::new(EchoAgent)).with_hook(hook as _);
        let err = agent.run(&ctx()).await.unwrap_err();
        assert!(matches!(err, Error::Hook { .. }));
    }

    #[tokio::test]
    async fn save_to_memory_hook_ingests_session() {
        let memory = Arc::new(InMemoryMemoryService::new());
        let agent = HookedAgent::new(Arc::new(EchoAgent)).with_hook(Arc::new(SaveToMemoryHook));
        let ctx = ctx().with_memory(Arc::clone(&memory) as _);
        agent.run(&ctx).await.unwrap();

        let results = memory
            .search(MemoryQuery::new("favorite color"))
            .await
            .unwrap();
        assert!(!results.is_empty());
    }
}
