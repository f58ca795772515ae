//! Gemini provider — the `generateContent` REST API over reqwest.
//!
//! Maps the runtime's turn/tool model onto Gemini's wire format and maps
//! HTTP failures onto the provider error taxonomy so the retry policy can
//! classify them (429 rate limit, 5xx availability, timeouts).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};
use uuid::Uuid;

use agentloom_core::error::ProviderError;
use agentloom_core::provider::{ModelProvider, ModelReply, ModelRequest};
use agentloom_core::tool::ToolCall;
use agentloom_core::turn::{Role, Turn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// A Gemini-backed model provider.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.into(),
            client,
        }
    }

    /// Override the API base URL (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Build the `generateContent` request body from a model request.
fn build_body(request: &ModelRequest) -> Value {
    let contents: Vec<Value> = request.turns.iter().map(turn_to_content).collect();

    let mut body = json!({
        "system_instruction": { "parts": [{ "text": request.instruction }] },
        "contents": contents,
    });

    if !request.tools.is_empty() {
        let declarations: Vec<Value> = request
            .tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                })
            })
            .collect();
        body["tools"] = json!([{ "functionDeclarations": declarations }]);
    }

    body
}

fn turn_to_content(turn: &Turn) -> Value {
    match turn.role {
        Role::User => json!({ "role": "user", "parts": [{ "text": turn.content }] }),
        Role::Model => json!({ "role": "model", "parts": [{ "text": turn.content }] }),
        Role::Tool => {
            // Tool results go back as a functionResponse part.
            let response: Value = serde_json::from_str(&turn.content)
                .unwrap_or_else(|_| json!({ "output": turn.content }));
            json!({
                "role": "user",
                "parts": [{
                    "functionResponse": {
                        "name": turn.author.clone().unwrap_or_default(),
                        "response": response,
                    }
                }]
            })
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
}

#[derive(Debug, Deserialize)]
struct ApiCandidate {
    content: Option<ApiContent>,
}

#[derive(Debug, Deserialize)]
struct ApiContent {
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(Debug, Deserialize)]
struct ApiPart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, rename = "functionCall")]
    function_call: Option<ApiFunctionCall>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

/// Parse a `generateContent` response body into a model reply.
fn parse_reply(body: &str) -> Result<ModelReply, ProviderError> {
    let response: ApiResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    let content = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .ok_or_else(|| ProviderError::MalformedResponse("no candidates in response".into()))?;

    let mut calls = Vec::new();
    let mut text = String::new();
    for part in content.parts {
        if let Some(fc) = part.function_call {
            calls.push(ToolCall {
                id: Uuid::new_v4().to_string(),
                name: fc.name,
                arguments: fc.args,
            });
        } else if let Some(t) = part.text {
            text.push_str(&t);
        }
    }

    if calls.is_empty() {
        Ok(ModelReply::Text(text))
    } else {
        Ok(ModelReply::ToolCalls(calls))
    }
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: ModelRequest) -> Result<ModelReply, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model
        );
        debug!(model = %self.model, turns = request.turns.len(), "Calling Gemini");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&build_body(&request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 429 {
            return Err(ProviderError::RateLimited { retry_after_secs: 5 });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "API key rejected".into(),
            ));
        }
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            warn!(status, body = %body, "Gemini returned error");
            return Err(ProviderError::Api {
                status_code: status,
                message: body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        parse_reply(&body)
    }
}
