//! Conversation turns — the value objects that flow through every pipeline.
//!
//! A session holds an ordered sequence of turns; agents append model turns,
//! tool dispatches append tool turns, and the runner appends user turns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The author of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// A model-backed agent
    Model,
    /// A tool execution result
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Model => write!(f, "model"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A single turn in a session's conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Unique turn ID
    pub id: String,

    /// Who authored this turn
    pub role: Role,

    /// The text content
    pub content: String,

    /// Name of the agent or tool that produced this turn, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a new user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            author: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a model turn attributed to an agent.
    pub fn model(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Model,
            content: content.into(),
            author: Some(author.into()),
            timestamp: Utc::now(),
        }
    }

    /// Create a tool result turn attributed to a tool.
    pub fn tool(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Tool,
            content: content.into(),
            author: Some(tool_name.into()),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_turn_has_no_author() {
        let turn = Turn::user("Hello, agent!");
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.content, "Hello, agent!");
        assert!(turn.author.is_none());
    }

    #[test]
    fn model_turn_carries_agent_name() {
        let turn = Turn::model("critic", "APPROVED");
        assert_eq!(turn.role, Role::Model);
        assert_eq!(turn.author.as_deref(), Some("critic"));
    }

    #[test]
    fn turn_serialization_roundtrip() {
        let turn = Turn::tool("fee_lookup", r#"{"status":"success"}"#);
        let json = serde_json::to_string(&turn).unwrap();
        let back: Turn = serde_json::from_str(&json).unwrap();
        assert_eq!(back.role, Role::Tool);
        assert_eq!(back.author.as_deref(), Some("fee_lookup"));
    }
}
