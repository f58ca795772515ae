//! In-memory session store — useful for demos, tests, and single-process runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use agentloom_core::error::SessionError;
use agentloom_core::session::{
    Session, SessionKey, SessionService, SessionState, SharedStateMap,
};

/// An in-memory session service.
///
/// Owns all sessions exclusively, plus the user-scope and app-scope state
/// maps that sibling sessions share. Dropping the service drops every
/// session and all scoped state.
pub struct InMemorySessionService {
    sessions: RwLock<HashMap<SessionKey, Arc<Session>>>,
    user_state: RwLock<HashMap<(String, String), SharedStateMap>>,
    app_state: RwLock<HashMap<String, SharedStateMap>>,
}

impl InMemorySessionService {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            user_state: RwLock::new(HashMap::new()),
            app_state: RwLock::new(HashMap::new()),
        }
    }

    /// The shared user-scope map for an app+user pair, created on first use.
    async fn user_map(&self, app: &str, user: &str) -> SharedStateMap {
        let mut maps = self.user_state.write().await;
        maps.entry((app.to_string(), user.to_string()))
            .or_default()
            .clone()
    }

    /// The shared app-scope map for an app, created on first use.
    async fn app_map(&self, app: &str) -> SharedStateMap {
        let mut maps = self.app_state.write().await;
        maps.entry(app.to_string()).or_default().clone()
    }
}

impl Default for InMemorySessionService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionService for InMemorySessionService {
    async fn create(&self, key: SessionKey) -> Result<Arc<Session>, SessionError> {
        // Resolve shared maps before taking the sessions lock.
        let user_map = self.user_map(&key.app, &key.user).await;
        let app_map = self.app_map(&key.app).await;

        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&key) {
            return Err(SessionError::AlreadyExists(key.to_string()));
        }

        debug!(session = %key, "Creating session");
        let state = SessionState::new(user_map, app_map);
        let session = Arc::new(Session::new(key.clone(), state));
        sessions.insert(key, session.clone());
        Ok(session)
    }

    async fn get(&self, key: &SessionKey) -> Result<Arc<Session>, SessionError> {
        self.sessions
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &SessionKey) -> Result<bool, SessionError> {
        Ok(self.sessions.write().await.remove(key).is_some())
    }

    async fn list(&self, app: &str, user: &str) -> Result<Vec<SessionKey>, SessionError> {
        Ok(self
            .sessions
            .read()
            .await
            .keys()
            .filter(|k| k.app == app && k.user == user)
            .cloned()
            .collect())
    }
}
