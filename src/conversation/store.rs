//! Session persistence behind a trait so a durable backend can be swapped in.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::conversation::state::Session;

/// Keyed storage for per-user sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the session for `user_id`, if one was stored.
    async fn get(&self, user_id: &str) -> Option<Session>;

    /// Replace the session for `user_id`.
    async fn put(&self, user_id: &str, session: Session);
}

/// Process-local store. Sessions are lost on restart.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, user_id: &str) -> Option<Session> {
        self.sessions.read().await.get(user_id).cloned()
    }

    async fn put(&self, user_id: &str, session: Session) {
        self.sessions
            .write()
            .await
            .insert(user_id.to_string(), session);
    }
}
