//! Stdio toolset — tools served by a local subprocess.
//!
//! The client spawns the server process and speaks newline-delimited JSON
//! over its stdin/stdout. One handshake message elicits a capability list
//! (the callable action names with their schemas); after that, every
//! invocation is a synchronous call/result pair matched by id. The server
//! is expected to honor the same tagged response contract as local tools.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info};

use agentloom_core::error::ToolError;
use agentloom_core::tool::{Tool, ToolContext, ToolResponse};

/// How to launch a stdio tool server.
#[derive(Debug, Clone)]
pub struct StdioServerParams {
    pub command: String,
    pub args: Vec<String>,
    /// Deadline for the handshake and for each individual call.
    pub call_timeout: Duration,
}

impl StdioServerParams {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            call_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

fn default_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// One callable action advertised by the server during the handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_schema")]
    pub parameters: Value,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Outbound<'a> {
    Handshake,
    Call {
        id: u64,
        name: &'a str,
        arguments: &'a Value,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Inbound {
    Capabilities { tools: Vec<Capability> },
    Result { id: u64, response: Value },
}

/// The exclusive line channel to the server process.
///
/// Calls are strictly sequential; the mutex in the toolset serializes
/// concurrent tool invocations onto it.
#[derive(Debug)]
struct Channel {
    // Held so the process is killed when the channel is dropped.
    _child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
}

impl Channel {
    async fn send(&mut self, message: &Outbound<'_>) -> Result<(), ToolError> {
        let line =
            serde_json::to_string(message).map_err(|e| ToolError::Protocol(e.to_string()))?;
        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ToolError::Protocol(format!("write to tool server failed: {e}")))?;
        self.stdin
            .write_all(b"\n")
            .await
            .map_err(|e| ToolError::Protocol(format!("write to tool server failed: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| ToolError::Protocol(format!("write to tool server failed: {e}")))?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Inbound, ToolError> {
        let line = self
            .stdout
            .next_line()
            .await
            .map_err(|e| ToolError::Protocol(format!("read from tool server failed: {e}")))?
            .ok_or_else(|| ToolError::Protocol("tool server closed its stdout".into()))?;
        serde_json::from_str(&line)
            .map_err(|e| ToolError::Protocol(format!("unparsable server message: {e}")))
    }
}

/// A connected stdio tool server and its advertised capabilities.
#[derive(Debug)]
pub struct StdioToolset {
    channel: Arc<Mutex<Channel>>,
    capabilities: Vec<Capability>,
    call_timeout: Duration,
}

impl StdioToolset {
    /// Spawn the server and perform the capability handshake.
    pub async fn spawn(params: StdioServerParams) -> Result<Self, ToolError> {
        let mut child = Command::new(&params.command)
            .args(&params.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ToolError::Protocol(format!("failed to spawn '{}': {e}", params.command))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ToolError::Protocol("tool server has no stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ToolError::Protocol("tool server has no stdout".into()))?;

        let mut channel = Channel {
            _child: child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 0,
        };

        channel.send(&Outbound::Handshake).await?;
        let reply = tokio::time::timeout(params.call_timeout, channel.recv())
            .await
            .map_err(|_| ToolError::Timeout {
                tool_name: "handshake".into(),
                timeout_secs: params.call_timeout.as_secs(),
            })??;

        let capabilities = match reply {
            Inbound::Capabilities { tools } => tools,
            other => {
                return Err(ToolError::Protocol(format!(
                    "expected capabilities after handshake, got: {other:?}"
                )));
            }
        };
        info!(
            command = %params.command,
            tools = capabilities.len(),
            "Stdio tool server connected"
        );

        Ok(Self {
            channel: Arc::new(Mutex::new(channel)),
            capabilities,
            call_timeout: params.call_timeout,
        })
    }

    /// Names of the advertised tools.
    pub fn tool_names(&self) -> Vec<&str> {
        self.capabilities.iter().map(|c| c.name.as_str()).collect()
    }

    /// One `Tool` per advertised capability, all sharing the channel.
    pub fn into_tools(self) -> Vec<Box<dyn Tool>> {
        self.capabilities
            .into_iter()
            .map(|capability| {
                Box::new(StdioTool {
                    capability,
                    channel: Arc::clone(&self.channel),
                    call_timeout: self.call_timeout,
                }) as Box<dyn Tool>
            })
            .collect()
    }
}

/// A single server-hosted tool, dispatched over the shared channel.
struct StdioTool {
    capability: Capability,
    channel: Arc<Mutex<Channel>>,
    call_timeout: Duration,
}

impl StdioTool {
    async fn call(&self, arguments: &Value) -> Result<ToolResponse, ToolError> {
        let mut channel = self.channel.lock().await;
        channel.next_id += 1;
        let id = channel.next_id;

        debug!(tool = %self.capability.name, id, "Dispatching stdio tool call");
        channel
            .send(&Outbound::Call {
                id,
                name: &self.capability.name,
                arguments,
            })
            .await?;

        // A timed-out call leaves its late reply buffered on the channel;
        // replies with an older id are discarded until ours arrives.
        let reply = loop {
            let inbound = tokio::time::timeout(self.call_timeout, channel.recv())
                .await
                .map_err(|_| ToolError::Timeout {
                    tool_name: self.capability.name.clone(),
                    timeout_secs: self.call_timeout.as_secs(),
                })??;
            match inbound {
                Inbound::Result { id: reply_id, .. } if reply_id < id => {
                    debug!(
                        tool = %self.capability.name,
                        stale_id = reply_id,
                        "Discarding stale reply from a timed-out call"
                    );
                }
                other => break other,
            }
        };

        match reply {
            Inbound::Result { id: reply_id, response } if reply_id == id => {
                serde_json::from_value(response).map_err(|e| {
                    ToolError::Protocol(format!("untagged tool server response: {e}"))
                })
            }
            Inbound::Result { id: reply_id, .. } => Err(ToolError::Protocol(format!(
                "result id mismatch: sent {id}, got {reply_id}"
            ))),
            Inbound::Capabilities { .. } => {
                Err(ToolError::Protocol("unexpected capabilities message".into()))
            }
        }
    }
}

#[async_trait]
impl Tool for StdioTool {
    fn name(&self) -> &str {
        &self.capability.name
    }

    fn description(&self) -> &str {
        &self.capability.description
    }

    fn parameters_schema(&self) -> Value {
        self.capability.parameters.clone()
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> ToolResponse {
        match self.call(&arguments).await {
            Ok(response) => response,
            Err(e) => ToolResponse::error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloom_core::session::SessionState;

    fn ctx() -> ToolContext {
        ToolContext::new(SessionState::detached())
    }

    fn sh_server(script: &str) -> StdioServerParams {
        StdioServerParams::new("sh", vec!["-c".into(), script.into()])
            .with_call_timeout(Duration::from_secs(5))
    }

    const CAPABILITIES_LINE: &str = r#"{"type":"capabilities","tools":[{"name":"ping","description":"Replies with pong","parameters":{"type":"object","properties":{}}}]}"#;

    #[test]
    fn call_message_wire_shape() {
        let arguments = json!({ "text": "hi" });
        let message = Outbound::Call {
            id: 7,
            name: "ping",
            arguments: &arguments,
        };
        let wire: Value =
            serde_json::from_str(&serde_json::to_string(&message).unwrap()).unwrap();
        assert_eq!(wire["type"], "call");
        assert_eq!(wire["id"], 7);
        assert_eq!(wire["name"], "ping");
        assert_eq!(wire["arguments"]["text"], "hi");
    }

    #[test]
    fn inbound_messages_parse() {
        assert!(matches!(
            serde_json::from_str::<Inbound>(CAPABILITIES_LINE).unwrap(),
            Inbound::Capabilities { tools } if tools[0].name == "ping"
        ));
        let result: Inbound = serde_json::from_str(
            r#"{"type":"result","id":1,"response":{"status":"success"}}"#,
        )
        .unwrap();
        assert!(matches!(result, Inbound::Result { id: 1, .. }));
    }

    #[tokio::test]
    async fn handshake_then_call_round_trip() {
        let script = format!(
            "read _\necho '{CAPABILITIES_LINE}'\nread _\necho '{}'",
            r#"{"type":"result","id":1,"response":{"status":"success","reply":"pong"}}"#
        );
        let toolset = StdioToolset::spawn(sh_server(&script)).await.unwrap();
        assert_eq!(toolset.tool_names(), vec!["ping"]);

        let tools = toolset.into_tools();
        let response = tools[0].execute(json!({}), &ctx()).await;
        let wire: Value = serde_json::from_str(&response.to_json()).unwrap();
        assert_eq!(wire["status"], "success");
        assert_eq!(wire["reply"], "pong");
    }

    #[tokio::test]
    async fn unresponsive_call_times_out() {
        let script = format!("read _\necho '{CAPABILITIES_LINE}'\nsleep 30");
        let params = sh_server(&script).with_call_timeout(Duration::from_millis(200));
        let toolset = StdioToolset::spawn(params).await.unwrap();

        let tools = toolset.into_tools();
        let response = tools[0].execute(json!({}), &ctx()).await;
        assert!(response.is_error());
        assert!(response.to_json().contains("timed out"));
    }

    #[tokio::test]
    async fn channel_recovers_after_a_timed_out_call() {
        // The server ignores the first call until the second one arrives,
        // then flushes both replies. The first call times out; the second
        // must skip the stale reply and pick up its own.
        let script = format!(
            "read _\necho '{CAPABILITIES_LINE}'\nread _\nread _\necho '{}'\necho '{}'",
            r#"{"type":"result","id":1,"response":{"status":"success","reply":"late"}}"#,
            r#"{"type":"result","id":2,"response":{"status":"success","reply":"pong"}}"#
        );
        let params = sh_server(&script).with_call_timeout(Duration::from_millis(200));
        let toolset = StdioToolset::spawn(params).await.unwrap();
        let tools = toolset.into_tools();

        let first = tools[0].execute(json!({}), &ctx()).await;
        assert!(first.is_error());
        assert!(first.to_json().contains("timed out"));

        let second = tools[0].execute(json!({}), &ctx()).await;
        let wire: Value = serde_json::from_str(&second.to_json()).unwrap();
        assert_eq!(wire["status"], "success");
        assert_eq!(wire["reply"], "pong");
    }

    #[tokio::test]
    async fn untagged_server_response_is_error() {
        let script = format!(
            "read _\necho '{CAPABILITIES_LINE}'\nread _\necho '{}'",
            r#"{"type":"result","id":1,"response":{"pong":true}}"#
        );
        let toolset = StdioToolset::spawn(sh_server(&script)).await.unwrap();

        let tools = toolset.into_tools();
        let response = tools[0].execute(json!({}), &ctx()).await;
        assert!(response.is_error());
    }

    #[tokio::test]
    async fn spawn_failure_is_protocol_error() {
        let params = StdioServerParams::new("definitely-not-a-real-binary", vec![]);
        let err = StdioToolset::spawn(params).await.unwrap_err();
        assert!(matches!(err, ToolError::Protocol(_)));
    }
}
