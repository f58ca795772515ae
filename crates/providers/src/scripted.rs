//! Scripted provider — a deterministic test double.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use agentloom_core::error::ProviderError;
use agentloom_core::provider::{ModelProvider, ModelReply, ModelRequest};

/// Replays a fixed sequence of replies, one per generate call.
///
/// Running past the end of the script is a test authoring mistake and
/// surfaces as a `MalformedResponse` error rather than a panic.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ModelReply>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<ModelReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// One text reply, the common case.
    pub fn text(reply: impl Into<String>) -> Self {
        Self::new(vec![ModelReply::Text(reply.into())])
    }

    /// Requests seen so far, for asserting on instructions and history.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: ModelRequest) -> Result<ModelReply, ProviderError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| ProviderError::MalformedResponse("script exhausted".into()))
    }
}
