//! Sessions — keyed conversation state with scoped key namespaces.
//!
//! A session is identified by an `(app, user, session)` triple. It owns an
//! ordered sequence of turns and a scoped key/value state. State keys are
//! partitioned by an unambiguous prefix:
//!
//! - `temp:` — turn-scoped, cleared at the start of each run
//! - no prefix — session-scoped, lives as long as the session
//! - `user:` — shared by all sessions of one app+user pair
//! - `app:` — shared by all sessions of one app
//!
//! The scope prefix determines which backing map a key lands in, and
//! therefore its garbage-collection boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::SessionError;
use crate::turn::Turn;

/// Identity of a session: application, user, and session name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub app: String,
    pub user: String,
    pub session: String,
}

impl SessionKey {
    pub fn new(
        app: impl Into<String>,
        user: impl Into<String>,
        session: impl Into<String>,
    ) -> Self {
        Self {
            app: app.into(),
            user: user.into(),
            session: session.into(),
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.app, self.user, self.session)
    }
}

/// The lifetime scope of a state key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateScope {
    /// Cleared each run (`temp:` prefix)
    Turn,
    /// Lives for the session (no prefix)
    Session,
    /// Shared across sessions of one app+user (`user:` prefix)
    User,
    /// Shared across all users of one app (`app:` prefix)
    App,
}

impl StateScope {
    /// Determine the scope of a key from its prefix.
    ///
    /// Prefixes are matched longest-first so the mapping is unambiguous;
    /// a key like `user:temp:x` is user-scoped because only the leading
    /// prefix counts.
    pub fn of(key: &str) -> StateScope {
        if key.starts_with("temp:") {
            StateScope::Turn
        } else if key.starts_with("user:") {
            StateScope::User
        } else if key.starts_with("app:") {
            StateScope::App
        } else {
            StateScope::Session
        }
    }
}

/// A shared scoped map. Cheap to clone; cloning shares the underlying map.
pub type SharedStateMap = Arc<RwLock<HashMap<String, Value>>>;

/// Handle to a session's scoped key/value state.
///
/// The turn and session maps belong to one session; the user and app maps
/// are shared with sibling sessions by the owning `SessionService`.
/// Concurrent writes to *distinct* keys are safe (the parallel composite
/// relies on this); concurrent writes to the same key are out of contract.
#[derive(Debug, Clone)]
pub struct SessionState {
    turn: SharedStateMap,
    session: SharedStateMap,
    user: SharedStateMap,
    app: SharedStateMap,
}

impl SessionState {
    /// Create a state handle with fresh turn/session maps and the given
    /// shared user/app maps.
    pub fn new(user: SharedStateMap, app: SharedStateMap) -> Self {
        Self {
            turn: Arc::new(RwLock::new(HashMap::new())),
            session: Arc::new(RwLock::new(HashMap::new())),
            user,
            app,
        }
    }

    /// A fully private state handle, not shared with any other session.
    /// Useful for tests and one-shot invocations.
    pub fn detached() -> Self {
        Self::new(
            Arc::new(RwLock::new(HashMap::new())),
            Arc::new(RwLock::new(HashMap::new())),
        )
    }

    fn map_for(&self, scope: StateScope) -> &SharedStateMap {
        match scope {
            StateScope::Turn => &self.turn,
            StateScope::Session => &self.session,
            StateScope::User => &self.user,
            StateScope::App => &self.app,
        }
    }

    /// Read a value. The key's prefix selects the scope.
    pub async fn get(&self, key: &str) -> Option<Value> {
        let map = self.map_for(StateScope::of(key));
        map.read().await.get(key).cloned()
    }

    /// Write a value. Last writer wins within a scope.
    pub async fn set(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let map = self.map_for(StateScope::of(&key));
        map.write().await.insert(key, value);
    }

    /// Remove a key. Returns the previous value, if any.
    pub async fn remove(&self, key: &str) -> Option<Value> {
        let map = self.map_for(StateScope::of(key));
        map.write().await.remove(key)
    }

    /// Clear the turn scope. Called by the runner before each run.
    pub async fn clear_turn_scope(&self) {
        self.turn.write().await.clear();
    }

    /// A merged snapshot of all scopes, for instruction templating.
    ///
    /// More specific scopes shadow broader ones on (unlikely) key
    /// collisions: turn > session > user > app.
    pub async fn snapshot(&self) -> HashMap<String, Value> {
        let mut merged = HashMap::new();
        for map in [&self.app, &self.user, &self.session, &self.turn] {
            for (k, v) in map.read().await.iter() {
                merged.insert(k.clone(), v.clone());
            }
        }
        merged
    }
}

/// A session: identity, ordered turns, and scoped state.
///
/// Owned exclusively by a `SessionService`; agents and tools only ever see
/// it behind an `Arc` and mutate it through the async accessors.
#[derive(Debug)]
pub struct Session {
    pub key: SessionKey,
    pub created_at: DateTime<Utc>,
    turns: RwLock<Vec<Turn>>,
    state: SessionState,
}

impl Session {
    pub fn new(key: SessionKey, state: SessionState) -> Self {
        Self {
            key,
            created_at: Utc::now(),
            turns: RwLock::new(Vec::new()),
            state,
        }
    }

    /// The scoped state handle for this session.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Append a turn.
    pub async fn append(&self, turn: Turn) {
        self.turns.write().await.push(turn);
    }

    /// A snapshot of all turns in order.
    pub async fn turns(&self) -> Vec<Turn> {
        self.turns.read().await.clone()
    }

    /// Number of turns so far.
    pub async fn turn_count(&self) -> usize {
        self.turns.read().await.len()
    }
}

/// The session store contract.
///
/// `create` fails when the key is taken, `get` fails when it is not;
/// `create_or_get` mirrors the common try-create-then-get pattern.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Create a new session. Fails with `AlreadyExists` if the key is taken.
    async fn create(&self, key: SessionKey) -> std::result::Result<Arc<Session>, SessionError>;

    /// Fetch an existing session. Fails with `NotFound` if absent.
    async fn get(&self, key: &SessionKey) -> std::result::Result<Arc<Session>, SessionError>;

    /// Delete a session. Returns whether it existed.
    async fn delete(&self, key: &SessionKey) -> std::result::Result<bool, SessionError>;

    /// List session keys for one app+user pair.
    async fn list(
        &self,
        app: &str,
        user: &str,
    ) -> std::result::Result<Vec<SessionKey>, SessionError>;

    /// Create the session, or fetch it if it already exists.
    async fn create_or_get(
        &self,
        key: SessionKey,
    ) -> std::result::Result<Arc<Session>, SessionError> {
        match self.create(key.clone()).await {
            Ok(session) => Ok(session),
            Err(SessionError::AlreadyExists(_)) => self.get(&key).await,
            Err(e) => Err(e),
        }
    }
}
