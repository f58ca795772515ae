//! Memory service trait — ingestion and recall of finished sessions.
//!
//! When a session is finalized, every turn becomes a searchable memory
//! record. Re-ingesting the same session must not duplicate records;
//! backends deduplicate by session key.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;
use crate::session::{Session, SessionKey};
use crate::turn::Role;

/// A single memory record, derived from one turn of a finalized session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique ID for this record
    pub id: String,

    /// Session this record came from
    pub session: SessionKey,

    /// Who authored the source turn
    pub role: Role,

    /// The content of the turn
    pub content: String,

    /// When this record was ingested
    pub ingested_at: DateTime<Utc>,

    /// Relevance score (set by search operations)
    #[serde(default)]
    pub score: f32,
}

/// A query for searching memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryQuery {
    /// The search text
    pub text: String,

    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Restrict to one application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,

    /// Restrict to one user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

fn default_limit() -> usize {
    10
}

impl MemoryQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: default_limit(),
            app: None,
            user: None,
        }
    }

    pub fn for_user(mut self, app: impl Into<String>, user: impl Into<String>) -> Self {
        self.app = Some(app.into());
        self.user = Some(user.into());
        self
    }
}

/// The memory store contract.
///
/// Implementations own their records exclusively; records are read-only
/// once ingested, except for store-level eviction.
#[async_trait]
pub trait MemoryService: Send + Sync {
    /// The backend name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Ingest every turn of a finalized session as memory records.
    ///
    /// Idempotent per session key: re-ingesting replaces that session's
    /// records instead of duplicating them. Returns the number of records
    /// now held for the session.
    async fn ingest(&self, session: &Session) -> std::result::Result<usize, MemoryError>;

    /// Search records by free-text query, ranked by relevance.
    /// An empty result is valid, not an error.
    async fn search(
        &self,
        query: MemoryQuery,
    ) -> std::result::Result<Vec<MemoryRecord>, MemoryError>;

    /// Total record count across all sessions.
    async fn count(&self) -> std::result::Result<usize, MemoryError>;
}
