//! The loop-termination tool.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use agentloom_core::tool::{Tool, ToolContext, ToolControl, ToolResponse};

/// Signals the enclosing loop to stop.
///
/// The tool itself returns ordinary tagged data; termination is carried by
/// its `ExitLoop` control class, which the dispatch layer turns into a
/// distinct exit verdict.
pub struct ExitLoopTool;

#[async_trait]
impl Tool for ExitLoopTool {
    fn name(&self) -> &str {
        "exit_loop"
    }

    fn description(&self) -> &str {
        "Call this tool ONLY when the work is complete and no more changes \
         are needed. Calling it ends the current refinement loop."
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    fn control(&self) -> ToolControl {
        ToolControl::ExitLoop
    }

    async fn execute(&self, _arguments: Value, _ctx: &ToolContext) -> ToolResponse {
        debug!("Exit signal raised");
        ToolResponse::success(json!({ "message": "Approved. Exiting refinement loop." }))
    }
}
