//! Memory recall as a tool.

use async_trait::async_trait;
use serde_json::{Value, json};

use agentloom_core::memory::MemoryQuery;
use agentloom_core::tool::{Tool, ToolContext, ToolResponse};

/// Searches the memory store for records relevant to a query.
///
/// Only usable when the runner was built with a memory service; otherwise
/// the tool reports a tagged error the model can relay.
pub struct RecallMemoryTool;

#[async_trait]
impl Tool for RecallMemoryTool {
    fn name(&self) -> &str {
        "recall_memory"
    }

    fn description(&self) -> &str {
        "Search past conversations for information relevant to a query. Use \
         this when the user refers to something discussed before."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Free-text description of what to recall"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of records to return"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolResponse {
        let Some(memory) = &ctx.memory else {
            return ToolResponse::error("no memory service is configured");
        };
        let Some(text) = arguments["query"].as_str() else {
            return ToolResponse::error("missing required argument: query");
        };

        let mut query = MemoryQuery::new(text);
        if let Some(limit) = arguments["limit"].as_u64() {
            query.limit = limit as usize;
        }

        match memory.search(query).await {
            Ok(records) => {
                let memories: Vec<Value> = records
                    .iter()
                    .map(|r| json!({ "role": r.role, "content": r.content }))
                    .collect();
                ToolResponse::success(json!({ "memories": memories }))
            }
            Err(e) => ToolResponse::error(format!("memory search failed: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloom_core::memory::MemoryService;
    use agentloom_core::session::{Session, SessionKey, SessionState};
    use agentloom_core::turn::Turn;
    use agentloom_memory::InMemoryMemoryService;
    use std::sync::Arc;

    #[tokio::test]
    async fn recalls_ingested_turns() {
        let memory = Arc::new(InMemoryMemoryService::new());
        let session = Session::new(
            SessionKey::new("app", "sid", "s1"),
            SessionState::detached(),
        );
        session
            .append(Turn::user("My favorite color is blue"))
            .await;
        memory.ingest(&session).await.unwrap();

        let ctx = ToolContext::new(SessionState::detached()).with_memory(memory);
        let resp = RecallMemoryTool
            .execute(json!({ "query": "favorite color" }), &ctx)
            .await;
        let wire: Value = serde_json::from_str(&resp.to_json()).unwrap();
        assert_eq!(wire["status"], "success");
        assert!(
            wire["memories"][0]["content"]
                .as_str()
                .unwrap()
                .contains("blue")
        );
    }

    #[tokio::test]
    async fn no_memory_service_is_tagged_error() {
        let ctx = ToolContext::new(SessionState::detached());
        let resp = RecallMemoryTool
            .execute(json!({ "query": "anything" }), &ctx)
            .await;
        assert!(resp.is_error());
    }

    #[tokio::test]
    async fn empty_result_is_success() {
        let memory = Arc::new(InMemoryMemoryService::new());
        let ctx = ToolContext::new(SessionState::detached()).with_memory(memory);
        let resp = RecallMemoryTool
            .execute(json!({ "query": "nothing ever said" }), &ctx)
            .await;
        let wire: Value = serde_json::from_str(&resp.to_json()).unwrap();
        assert_eq!(wire["status"], "success");
        assert_eq!(wire["memories"].as_array().map(Vec::len), Some(0));
    }
}
