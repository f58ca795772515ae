//! The model-backed leaf agent.
//!
//! An `LlmAgent` is immutable configuration: a provider, an instruction
//! template, a tool registry, and an optional output key. Each run resolves
//! `{key}` placeholders in the instruction against the session's merged
//! state, drives the model/tool loop to a final text answer, appends that
//! answer to the session, and commits it under the output key.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use agentloom_core::agent::{Agent, AgentOutcome, InvocationContext};
use agentloom_core::error::{Error, Result};
use agentloom_core::provider::{ModelProvider, ModelReply, ModelRequest};
use agentloom_core::tool::{ToolContext, ToolDispatch, ToolRegistry};
use agentloom_core::turn::Turn;

const DEFAULT_MAX_TOOL_ITERATIONS: u32 = 8;

/// A single model-backed agent.
pub struct LlmAgent {
    name: String,
    description: String,
    provider: Arc<dyn ModelProvider>,
    instruction: String,
    output_key: Option<String>,
    tools: Arc<ToolRegistry>,
    max_tool_iterations: u32,
}

impl LlmAgent {
    pub fn new(name: impl Into<String>, provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            provider,
            instruction: String::new(),
            output_key: None,
            tools: Arc::new(ToolRegistry::new()),
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// The system instruction. `{key}` placeholders are resolved against
    /// the session state at call time.
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// Commit the final answer under this session-state key.
    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    /// Cap on model calls per run; exceeding it fails the run.
    pub fn with_max_tool_iterations(mut self, max: u32) -> Self {
        self.max_tool_iterations = max;
        self
    }
}

fn is_placeholder_key(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Resolve `{key}` placeholders against a state snapshot.
///
/// A referenced key that is absent resolves to the empty string (logged);
/// braces that do not delimit a well-formed key pass through untouched.
fn resolve_template(template: &str, state: &HashMap<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) if is_placeholder_key(&after[..end]) => {
                let key = &after[..end];
                match state.get(key) {
                    Some(Value::String(s)) => out.push_str(s),
                    Some(other) => out.push_str(&other.to_string()),
                    None => {
                        warn!(key, "Instruction references a state key that is not set");
                    }
                }
                rest = &after[end + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[async_trait]
impl Agent for LlmAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, ctx: &InvocationContext) -> Result<AgentOutcome> {
        let state = ctx.session.state();
        let mut tool_ctx = ToolContext::new(state.clone());
        if let Some(memory) = &ctx.memory {
            tool_ctx = tool_ctx.with_memory(Arc::clone(memory));
        }

        let mut turns = ctx.session.turns().await;
        let mut content = String::new();
        let mut answered = false;
        let mut exit_requested = false;

        for iteration in 1..=self.max_tool_iterations {
            // Re-resolve each iteration: tool calls may have written state.
            let instruction = resolve_template(&self.instruction, &state.snapshot().await);
            let request = ModelRequest {
                instruction,
                turns: turns.clone(),
                tools: self.tools.definitions(),
            };

            let reply = self
                .provider
                .generate(request)
                .await
                .map_err(|e| Error::Provider(e).in_agent(&self.name))?;

            match reply {
                ModelReply::Text(text) => {
                    content = text;
                    answered = true;
                    break;
                }
                ModelReply::ToolCalls(calls) => {
                    debug!(
                        agent = %self.name,
                        iteration,
                        calls = calls.len(),
                        "Model requested tool calls"
                    );
                    for call in &calls {
                        let dispatch = self.tools.dispatch(call, &tool_ctx).await;
                        let turn = Turn::tool(call.name.clone(), dispatch.response().to_json());
                        ctx.session.append(turn.clone()).await;
                        turns.push(turn);
                        if matches!(dispatch, ToolDispatch::Exit(_)) {
                            // The exit signal cancels the rest of the batch.
                            exit_requested = true;
                            break;
                        }
                    }
                    if exit_requested {
                        break;
                    }
                }
            }
        }

        if exit_requested {
            info!(agent = %self.name, "Exit signal raised, ending run");
            return Ok(AgentOutcome::exit(content));
        }
        if !answered {
            return Err(Error::Internal(format!(
                "no final answer after {} tool iterations",
                self.max_tool_iterations
            ))
            .in_agent(&self.name));
        }

        ctx.session
            .append(Turn::model(&self.name, content.clone()))
            .await;
        if let Some(key) = &self.output_key {
            state.set(key.clone(), Value::String(content.clone())).await;
            debug!(agent = %self.name, key = %key, "Committed output to session state");
        }

        Ok(AgentOutcome::text(content))
    }
}
