//! Tool trait and registry — schema-described actions an agent can invoke.
//!
//! Every tool returns a tagged `ToolResponse`: `{status:"success", ...}` or
//! `{status:"error", error_message}`. Failures never cross the agent
//! boundary as errors; the registry converts them to the error-tagged form
//! so the model can inspect and recover.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::memory::MemoryService;
use crate::session::SessionState;

/// A request from the model to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the provider's tool_call id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: Value,
}

/// A tool definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: Value,
}

/// The tagged result contract every tool must honor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResponse {
    /// The call succeeded; `data` fields are flattened beside `status`.
    Success {
        #[serde(flatten)]
        data: Map<String, Value>,
    },
    /// The call failed in a way the model should reason about.
    Error { error_message: String },
}

impl ToolResponse {
    /// Build a success response from a JSON object.
    ///
    /// Non-object values are wrapped under a `"result"` field so the tagged
    /// shape is preserved.
    pub fn success(data: Value) -> Self {
        let data = match data {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("result".into(), other);
                map
            }
        };
        ToolResponse::Success { data }
    }

    /// Build an error response.
    pub fn error(message: impl Into<String>) -> Self {
        ToolResponse::Error {
            error_message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolResponse::Error { .. })
    }

    /// Serialize to the wire form fed back to the model.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"status":"error","error_message":"unserializable tool response"}"#.into()
        })
    }
}

/// What a tool contributes to control flow when dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolControl {
    /// Ordinary data tool (default)
    #[default]
    Data,
    /// Invoking this tool signals the enclosing loop to terminate
    ExitLoop,
}

/// The dispatch layer's verdict on a single tool call.
///
/// The exit signal is a distinct variant, not data: the orchestrator
/// special-cases it instead of string-matching tool output.
#[derive(Debug, Clone)]
pub enum ToolDispatch {
    /// An ordinary tagged response to feed back to the model.
    Response(ToolResponse),
    /// The designated exit tool ran; terminate the enclosing loop.
    Exit(ToolResponse),
}

impl ToolDispatch {
    pub fn response(&self) -> &ToolResponse {
        match self {
            ToolDispatch::Response(r) | ToolDispatch::Exit(r) => r,
        }
    }
}

/// Per-invocation handle passed to executing tools.
///
/// The session state is the sole sanctioned side channel besides the
/// return value; the memory service is present when the runner has one.
#[derive(Clone)]
pub struct ToolContext {
    pub state: SessionState,
    pub memory: Option<Arc<dyn MemoryService>>,
}

impl ToolContext {
    pub fn new(state: SessionState) -> Self {
        Self {
            state,
            memory: None,
        }
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemoryService>) -> Self {
        self.memory = Some(memory);
        self
    }
}

/// The core Tool trait.
///
/// `execute` returns a `ToolResponse` directly rather than a `Result`:
/// converting failures into the error-tagged form is the tool's job, and
/// the registry guarantees it for argument and lookup failures.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "fee_lookup", "exit_loop").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Control-flow contribution of this tool. Data for almost everything.
    fn control(&self) -> ToolControl {
        ToolControl::Data
    }

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolResponse;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// The agent loop uses this to:
/// 1. Get tool definitions to send to the model
/// 2. Dispatch tool calls the model requests
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the model).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Dispatch a tool call.
    ///
    /// Never fails across the boundary: an unknown tool becomes an
    /// error-tagged response. A tool marked `ExitLoop` yields the distinct
    /// exit variant for the orchestrator to act on.
    pub async fn dispatch(&self, call: &ToolCall, ctx: &ToolContext) -> ToolDispatch {
        let Some(tool) = self.tools.get(&call.name) else {
            return ToolDispatch::Response(ToolResponse::error(format!(
                "Tool not found: {}",
                call.name
            )));
        };

        let response = tool.execute(call.arguments.clone(), ctx).await;
        match tool.control() {
            ToolControl::Data => ToolDispatch::Response(response),
            ToolControl::ExitLoop => ToolDispatch::Exit(response),
        }
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
