//! In-memory memory store with keyword relevance search.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use agentloom_core::error::MemoryError;
use agentloom_core::memory::{MemoryQuery, MemoryRecord, MemoryService};
use agentloom_core::session::{Session, SessionKey};
use agentloom_core::turn::Role;

/// An in-memory memory service.
///
/// Records are grouped by source session key; ingesting a session again
/// replaces that group wholesale, which makes ingestion idempotent.
pub struct InMemoryMemoryService {
    records: RwLock<HashMap<SessionKey, Vec<MemoryRecord>>>,
}

impl InMemoryMemoryService {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryMemoryService {
    fn default() -> Self {
        Self::new()
    }
}

/// Keyword relevance: occurrence count normalized by content length.
fn score(content: &str, query_lower: &str) -> f32 {
    if query_lower.is_empty() {
        return 0.0;
    }
    let occurrences = content.to_lowercase().matches(query_lower).count();
    occurrences as f32 / (content.len() as f32 / 100.0).max(1.0)
}

#[async_trait]
impl MemoryService for InMemoryMemoryService {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn ingest(&self, session: &Session) -> Result<usize, MemoryError> {
        let now = Utc::now();
        let records: Vec<MemoryRecord> = session
            .turns()
            .await
            .into_iter()
            .filter(|t| !t.content.is_empty() && t.role != Role::Tool)
            .map(|t| MemoryRecord {
                id: Uuid::new_v4().to_string(),
                session: session.key.clone(),
                role: t.role,
                content: t.content,
                ingested_at: now,
                score: 0.0,
            })
            .collect();

        let count = records.len();
        debug!(session = %session.key, records = count, "Ingesting session into memory");

        // Replace, don't append: re-ingesting the same session must not
        // duplicate records.
        self.records
            .write()
            .await
            .insert(session.key.clone(), records);
        Ok(count)
    }

    async fn search(&self, query: MemoryQuery) -> Result<Vec<MemoryRecord>, MemoryError> {
        let query_lower = query.text.to_lowercase();
        let records = self.records.read().await;

        let mut results: Vec<MemoryRecord> = records
            .iter()
            .filter(|(key, _)| {
                query.app.as_deref().is_none_or(|app| key.app == app)
                    && query.user.as_deref().is_none_or(|user| key.user == user)
            })
            .flat_map(|(_, group)| group.iter())
            .filter(|r| r.content.to_lowercase().contains(&query_lower))
            .cloned()
            .map(|mut r| {
                r.score = score(&r.content, &query_lower);
                r
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(query.limit);
        Ok(results)
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        Ok(self.records.read().await.values().map(Vec::len).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloom_core::session::SessionState;
    use agentloom_core::turn::Turn;

    async fn finished_session(name: &str, turns: Vec<Turn>) -> Session {
        let session = Session::new(
            SessionKey::new("memory_demo", "default", name),
            SessionState::detached(),
        );
        for turn in turns {
            session.append(turn).await;
        }
        session
    }

    #[tokio::test]
    async fn ingest_and_search() {
        let memory = InMemoryMemoryService::new();
        let session = finished_session(
            "s1",
            vec![
                Turn::user("My favorite color is blue"),
                Turn::model("assistant", "Noted, your favorite color is blue."),
            ],
        )
        .await;

        let ingested = memory.ingest(&session).await.unwrap();
        assert_eq!(ingested, 2);

        let results = memory
            .search(MemoryQuery::new("favorite color"))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].content.to_lowercase().contains("favorite color"));
    }

    #[tokio::test]
    async fn reingest_does_not_duplicate() {
        let memory = InMemoryMemoryService::new();
        let session = finished_session(
            "s1",
            vec![
                Turn::user("Remember the lighthouse story"),
                Turn::model("writer", "A keeper watched the sea."),
            ],
        )
        .await;

        memory.ingest(&session).await.unwrap();
        let before = memory.count().await.unwrap();

        memory.ingest(&session).await.unwrap();
        assert_eq!(memory.count().await.unwrap(), before);
    }

    #[tokio::test]
    async fn tool_turns_are_not_ingested() {
        let memory = InMemoryMemoryService::new();
        let session = finished_session(
            "s1",
            vec![
                Turn::user("convert 100 usd"),
                Turn::tool("exchange_rate", r#"{"status":"success","rate":0.93}"#),
                Turn::model("assistant", "That is 93 EUR."),
            ],
        )
        .await;

        assert_eq!(memory.ingest(&session).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn empty_result_is_valid() {
        let memory = InMemoryMemoryService::new();
        let results = memory
            .search(MemoryQuery::new("nothing here"))
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn search_filters_by_user() {
        let memory = InMemoryMemoryService::new();

        let sid = Session::new(
            SessionKey::new("app", "sid", "s1"),
            SessionState::detached(),
        );
        sid.append(Turn::user("sid likes trains")).await;
        memory.ingest(&sid).await.unwrap();

        let ana = Session::new(
            SessionKey::new("app", "ana", "s1"),
            SessionState::detached(),
        );
        ana.append(Turn::user("ana likes trains")).await;
        memory.ingest(&ana).await.unwrap();

        let results = memory
            .search(MemoryQuery::new("trains").for_user("app", "sid"))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].content.contains("sid"));
    }

    #[tokio::test]
    async fn results_ranked_by_relevance() {
        let memory = InMemoryMemoryService::new();
        let session = finished_session(
            "s1",
            vec![
                Turn::user("rust rust rust"),
                Turn::user("rust mentioned once in a much longer sentence about other things"),
            ],
        )
        .await;
        memory.ingest(&session).await.unwrap();

        let results = memory.search(MemoryQuery::new("rust")).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, "rust rust rust");
    }
}
