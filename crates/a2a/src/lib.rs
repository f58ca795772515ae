//! Remote agent proxy — a network-hosted agent behind the local `Agent`
//! contract.
//!
//! Discovery fetches the remote's agent card from the well-known path
//! once, then every invocation is a single request/response carrying the
//! user's message and returning the remote's final content. Connection
//! failures, non-success statuses, and malformed replies all surface as
//! the one `RemoteAgentUnavailable` failure kind; there is no fallback.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use agentloom_core::agent::{Agent, AgentOutcome, InvocationContext};
use agentloom_core::error::{Error, Result};
use agentloom_core::turn::Turn;

/// Conventional location of the agent card on a remote host.
pub const AGENT_CARD_WELL_KNOWN_PATH: &str = "/.well-known/agent-card.json";

/// The remote agent's self-description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCard {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Entry endpoint for invocations; absolute, or relative to the host.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

#[derive(Serialize)]
struct InvokeRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct InvokeReply {
    content: String,
}

/// Client-side proxy for an agent served by another process.
pub struct RemoteAgent {
    name: String,
    description: String,
    base_url: String,
    client: reqwest::Client,
    card: OnceCell<AgentCard>,
}

impl RemoteAgent {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            card: OnceCell::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    fn unavailable(&self, reason: impl Into<String>) -> Error {
        Error::RemoteAgentUnavailable {
            agent: self.name.clone(),
            reason: reason.into(),
        }
    }

    /// The remote's card, fetched on first use and cached.
    pub async fn card(&self) -> Result<&AgentCard> {
        self.card
            .get_or_try_init(|| async {
                let url = format!("{}{}", self.base_url, AGENT_CARD_WELL_KNOWN_PATH);
                debug!(agent = %self.name, url = %url, "Fetching agent card");
                let response = self
                    .client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| self.unavailable(format!("card fetch failed: {e}")))?;
                if !response.status().is_success() {
                    return Err(
                        self.unavailable(format!("card fetch returned {}", response.status()))
                    );
                }
                let card: AgentCard = response
                    .json()
                    .await
                    .map_err(|e| self.unavailable(format!("malformed agent card: {e}")))?;
                info!(agent = %self.name, remote = %card.name, "Agent card resolved");
                Ok(card)
            })
            .await
    }

    fn invoke_url(&self, card: &AgentCard) -> String {
        if card.url.starts_with("http://") || card.url.starts_with("https://") {
            card.url.clone()
        } else if card.url.is_empty() {
            format!("{}/invoke", self.base_url)
        } else {
            format!("{}/{}", self.base_url, card.url.trim_start_matches('/'))
        }
    }
}

#[async_trait]
impl Agent for RemoteAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, ctx: &InvocationContext) -> Result<AgentOutcome> {
        let card = self.card().await?;
        let url = self.invoke_url(card);

        let response = self
            .client
            .post(&url)
            .json(&InvokeRequest { message: &ctx.input })
            .send()
            .await
            .map_err(|e| self.unavailable(format!("request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(self.unavailable(format!("remote returned {}", response.status())));
        }
        let reply: InvokeReply = response
            .json()
            .await
            .map_err(|e| self.unavailable(format!("malformed reply: {e}")))?;

        ctx.session
            .append(Turn::model(&self.name, reply.content.clone()))
            .await;
        Ok(AgentOutcome::text(reply.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloom_core::session::{Session, SessionKey, SessionState};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    async fn serve(card_fetches: Arc<AtomicU32>) -> SocketAddr {
        let app = Router::new()
            .route(
                "/.well-known/agent-card.json",
                get(move || {
                    card_fetches.fetch_add(1, Ordering::SeqCst);
                    async {
                        Json(json!({
                            "name": "product_catalog",
                            "description": "Product lookups",
                            "url": "/invoke",
                            "version": "1.0.0",
                            "capabilities": ["product_info"]
                        }))
                    }
                }),
            )
            .route(
                "/invoke",
                post(|Json(body): Json<Value>| async move {
                    let message = body["message"].as_str().unwrap_or_default();
                    Json(json!({ "content": format!("Catalog says: {message}") }))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn ctx(input: &str) -> InvocationContext {
        InvocationContext::new(
            Arc::new(Session::new(
                SessionKey::new("app", "user", "s1"),
                SessionState::detached(),
            )),
            input,
        )
    }

    #[tokio::test]
    async fn invokes_remote_and_appends_model_turn() {
        let fetches = Arc::new(AtomicU32::new(0));
        let addr = serve(Arc::clone(&fetches)).await;

        let agent = RemoteAgent::new("product_catalog", format!("http://{addr}"));
        let ctx = ctx("price of the blue lamp?");
        let outcome = agent.run(&ctx).await.unwrap();

        assert_eq!(outcome.content, "Catalog says: price of the blue lamp?");
        let turns = ctx.session.turns().await;
        assert_eq!(
            turns.last().unwrap().author.as_deref(),
            Some("product_catalog")
        );
    }

    #[tokio::test]
    async fn card_is_fetched_once_across_invocations() {
        let fetches = Arc::new(AtomicU32::new(0));
        let addr = serve(Arc::clone(&fetches)).await;

        let agent = RemoteAgent::new("product_catalog", format!("http://{addr}"));
        agent.run(&ctx("first")).await.unwrap();
        agent.run(&ctx("second")).await.unwrap();

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(agent.card().await.unwrap().name, "product_catalog");
    }

    #[tokio::test]
    async fn unreachable_host_is_unavailable() {
        // Port 1 is essentially never listening.
        let agent = RemoteAgent::new("ghost", "http://127.0.0.1:1");
        let err = agent.run(&ctx("hello")).await.unwrap_err();
        assert!(matches!(err, Error::RemoteAgentUnavailable { .. }));
        assert!(err.to_string().contains("ghost"));
    }

    #[tokio::test]
    async fn non_success_status_is_unavailable() {
        let app = Router::new().route(
            "/.well-known/agent-card.json",
            get(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let agent = RemoteAgent::new("broken", format!("http://{addr}"));
        let err = agent.run(&ctx("hello")).await.unwrap_err();
        assert!(matches!(err, Error::RemoteAgentUnavailable { .. }));
    }

    #[tokio::test]
    async fn malformed_reply_is_unavailable() {
        let app = Router::new()
            .route(
                "/.well-known/agent-card.json",
                get(|| async { Json(json!({ "name": "catalog", "url": "/invoke" })) }),
            )
            .route("/invoke", post(|| async { "not json" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let agent = RemoteAgent::new("catalog", format!("http://{addr}"));
        let err = agent.run(&ctx("hello")).await.unwrap_err();
        assert!(matches!(err, Error::RemoteAgentUnavailable { .. }));
    }
}
