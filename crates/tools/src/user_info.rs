//! State tools: save and retrieve user profile facts.
//!
//! Both write and read through the `user:` scope, so the facts survive the
//! session that captured them and are visible to every other session of
//! the same app+user pair.

use async_trait::async_trait;
use serde_json::{Value, json};

use agentloom_core::tool::{Tool, ToolContext, ToolResponse};

const NAME_KEY: &str = "user:name";
const COUNTRY_KEY: &str = "user:country";

/// Stores the user's name and country in user-scoped state.
pub struct SaveUserInfoTool;

#[async_trait]
impl Tool for SaveUserInfoTool {
    fn name(&self) -> &str {
        "save_user_info"
    }

    fn description(&self) -> &str {
        "Save the user's name and country so they can be recalled in later \
         conversations."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user_name": { "type": "string", "description": "The name of the user" },
                "country": { "type": "string", "description": "The country of the user" }
            },
            "required": ["user_name", "country"]
        })
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolResponse {
        let Some(user_name) = arguments["user_name"].as_str() else {
            return ToolResponse::error("missing required argument: user_name");
        };
        let Some(country) = arguments["country"].as_str() else {
            return ToolResponse::error("missing required argument: country");
        };

        ctx.state.set(NAME_KEY, json!(user_name)).await;
        ctx.state.set(COUNTRY_KEY, json!(country)).await;
        ToolResponse::success(json!({}))
    }
}

/// Reads the user's name and country back from user-scoped state.
pub struct GetUserInfoTool;

#[async_trait]
impl Tool for GetUserInfoTool {
    fn name(&self) -> &str {
        "get_user_info"
    }

    fn description(&self) -> &str {
        "Retrieve the user's previously saved name and country."
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _arguments: Value, ctx: &ToolContext) -> ToolResponse {
        let user_name = ctx
            .state
            .get(NAME_KEY)
            .await
            .unwrap_or_else(|| json!("username not found"));
        let country = ctx
            .state
            .get(COUNTRY_KEY)
            .await
            .unwrap_or_else(|| json!("country not found"));
        ToolResponse::success(json!({ "user_name": user_name, "country": country }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloom_core::session::{SessionState, SharedStateMap};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let ctx = ToolContext::new(SessionState::detached());

        let saved = SaveUserInfoTool
            .execute(json!({ "user_name": "Sid", "country": "India" }), &ctx)
            .await;
        assert!(!saved.is_error());

        let got = GetUserInfoTool.execute(json!({}), &ctx).await;
        let wire: Value = serde_json::from_str(&got.to_json()).unwrap();
        assert_eq!(wire["user_name"], "Sid");
        assert_eq!(wire["country"], "India");
    }

    #[tokio::test]
    async fn get_without_save_reports_placeholders() {
        let ctx = ToolContext::new(SessionState::detached());
        let got = GetUserInfoTool.execute(json!({}), &ctx).await;
        let wire: Value = serde_json::from_str(&got.to_json()).unwrap();
        assert_eq!(wire["status"], "success");
        assert_eq!(wire["user_name"], "username not found");
    }

    #[tokio::test]
    async fn missing_argument_is_tagged_error() {
        let ctx = ToolContext::new(SessionState::detached());
        let resp = SaveUserInfoTool
            .execute(json!({ "user_name": "Sid" }), &ctx)
            .await;
        assert!(resp.is_error());
    }

    #[tokio::test]
    async fn saved_info_is_visible_to_sibling_sessions() {
        let user_map: SharedStateMap = Arc::new(RwLock::new(HashMap::new()));
        let app_map: SharedStateMap = Arc::new(RwLock::new(HashMap::new()));
        let first = ToolContext::new(SessionState::new(user_map.clone(), app_map.clone()));
        let second = ToolContext::new(SessionState::new(user_map, app_map));

        SaveUserInfoTool
            .execute(json!({ "user_name": "Ana", "country": "Chile" }), &first)
            .await;

        let got = GetUserInfoTool.execute(json!({}), &second).await;
        let wire: Value = serde_json::from_str(&got.to_json()).unwrap();
        assert_eq!(wire["user_name"], "Ana");
    }
}
