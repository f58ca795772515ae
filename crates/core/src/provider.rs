//! ModelProvider trait — the abstraction over the hosted LLM call.
//!
//! A provider takes an instruction, the conversation so far, and the
//! available tool definitions, and replies with either final text or a
//! set of tool-call requests. Retry behavior is layered on top by a
//! wrapping provider, not implemented by backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::tool::{ToolCall, ToolDefinition};
use crate::turn::Turn;

/// A single generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// The (state-resolved) system instruction
    pub instruction: String,

    /// The conversation turns so far, oldest first
    pub turns: Vec<Turn>,

    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

/// What the model produced for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModelReply {
    /// A final text answer
    Text(String),
    /// One or more tool-call requests to satisfy before answering
    ToolCalls(Vec<ToolCall>),
}

/// The outbound model-call contract.
///
/// Implementations: HTTP-backed (Gemini), scripted (tests), retry wrapper.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// A human-readable name for this provider (e.g., "gemini", "scripted").
    fn name(&self) -> &str;

    /// Send a request and get a reply.
    async fn generate(
        &self,
        request: ModelRequest,
    ) -> std::result::Result<ModelReply, ProviderError>;
}
