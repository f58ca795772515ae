//! The runner: entry point for driving a root agent against sessions.
//!
//! Owns the store handles and passes them explicitly into every
//! invocation; there is no ambient session or memory singleton.

use std::sync::Arc;
use tracing::{debug, info};

use agentloom_core::agent::{Agent, InvocationContext};
use agentloom_core::error::{Error, Result};
use agentloom_core::memory::MemoryService;
use agentloom_core::session::{SessionKey, SessionService};
use agentloom_core::turn::Turn;

/// Drives a root agent (leaf or composite) for one application.
pub struct Runner {
    app: String,
    root: Arc<dyn Agent>,
    sessions: Arc<dyn SessionService>,
    memory: Option<Arc<dyn MemoryService>>,
}

impl Runner {
    pub fn new(
        app: impl Into<String>,
        root: Arc<dyn Agent>,
        sessions: Arc<dyn SessionService>,
    ) -> Self {
        Self {
            app: app.into(),
            root,
            sessions,
            memory: None,
        }
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemoryService>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    fn key(&self, user: &str, session: &str) -> SessionKey {
        SessionKey::new(self.app.clone(), user, session)
    }

    /// Submit one user message into a session and return the root agent's
    /// final content.
    ///
    /// Creates the session on first use. Clears the `temp:` scope, appends
    /// the user turn, then invokes the root agent; the agent (and its
    /// sub-agents) append their own model and tool turns.
    pub async fn run(&self, user: &str, session: &str, input: &str) -> Result<String> {
        let session = self.sessions.create_or_get(self.key(user, session)).await?;
        info!(session = %session.key, agent = self.root.name(), "Run started");

        session.state().clear_turn_scope().await;
        session.append(Turn::user(input)).await;

        let mut ctx = InvocationContext::new(Arc::clone(&session), input);
        if let Some(memory) = &self.memory {
            ctx = ctx.with_memory(Arc::clone(memory));
        }

        let outcome = self.root.run(&ctx).await?;
        debug!(session = %session.key, turns = session.turn_count().await, "Run finished");
        Ok(outcome.content)
    }

    /// Ingest a finished session into the memory store.
    pub async fn ingest_session(&self, user: &str, session: &str) -> Result<usize> {
        let Some(memory) = &self.memory else {
            return Err(Error::Internal("no memory service configured".into()));
        };
        let session = self.sessions.get(&self.key(user, session)).await?;
        let count = memory.ingest(&session).await?;
        info!(session = %session.key, records = count, "Session ingested into memory");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_agent::LlmAgent;
    use agentloom_core::provider::ModelReply;
    use agentloom_core::turn::Role;
    use agentloom_memory::InMemoryMemoryService;
    use agentloom_providers::ScriptedProvider;
    use agentloom_session::InMemorySessionService;
    use serde_json::json;

    fn runner_with(provider: Arc<ScriptedProvider>) -> Runner {
        let agent = LlmAgent::new("assistant", provider)
            .with_instruction("Be helpful.")
            .with_output_key("last_answer");
        Runner::new(
            "chat_app",
            Arc::new(agent),
            Arc::new(InMemorySessionService::new()),
        )
    }

    #[tokio::test]
    async fn run_appends_user_and_model_turns() {
        let runner = runner_with(Arc::new(ScriptedProvider::text("Hello, Sid!")));
        let answer = runner.run("sid", "s1", "Hi, I am Sid").await.unwrap();
        assert_eq!(answer, "Hello, Sid!");

        let session = runner
            .sessions
            .get(&SessionKey::new("chat_app", "sid", "s1"))
            .await
            .unwrap();
        let turns = session.turns().await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].role, Role::Model);
    }

    #[tokio::test]
    async fn state_written_in_one_run_survives_to_the_next() {
        let runner = runner_with(Arc::new(ScriptedProvider::new(vec![
            ModelReply::Text("first answer".into()),
            ModelReply::Text("second answer".into()),
        ])));

        runner.run("sid", "s1", "one").await.unwrap();
        let session = runner
            .sessions
            .get(&SessionKey::new("chat_app", "sid", "s1"))
            .await
            .unwrap();
        assert_eq!(
            session.state().get("last_answer").await,
            Some(json!("first answer"))
        );

        runner.run("sid", "s1", "two").await.unwrap();
        assert_eq!(
            session.state().get("last_answer").await,
            Some(json!("second answer"))
        );
        assert_eq!(session.turn_count().await, 4);
    }

    #[tokio::test]
    async fn temp_scope_cleared_between_runs() {
        let runner = runner_with(Arc::new(ScriptedProvider::new(vec![
            ModelReply::Text("one".into()),
            ModelReply::Text("two".into()),
        ])));

        runner.run("sid", "s1", "first").await.unwrap();
        let session = runner
            .sessions
            .get(&SessionKey::new("chat_app", "sid", "s1"))
            .await
            .unwrap();
        session.state().set("temp:scratch", json!(1)).await;

        runner.run("sid", "s1", "second").await.unwrap();
        assert_eq!(session.state().get("temp:scratch").await, None);
    }

    #[tokio::test]
    async fn ingest_session_round_trips_through_memory() {
        let memory = Arc::new(InMemoryMemoryService::new());
        let runner = runner_with(Arc::new(ScriptedProvider::text(
            "Noted, your favorite color is blue.",
        )))
        .with_memory(Arc::clone(&memory) as _);

        runner
            .run("sid", "s1", "My favorite color is blue")
            .await
            .unwrap();
        let count = runner.ingest_session("sid", "s1").await.unwrap();
        assert_eq!(count, 2);

        // Idempotent per session.
        runner.ingest_session("sid", "s1").await.unwrap();
        assert_eq!(memory.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn ingest_without_memory_service_is_an_error() {
        let runner = runner_with(Arc::new(ScriptedProvider::text("hi")));
        runner.run("sid", "s1", "hello").await.unwrap();
        assert!(runner.ingest_session("sid", "s1").await.is_err());
    }
}
