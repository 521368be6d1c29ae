// In-memory session repository
// Single-node store, mainly for development and tests

use super::repository::{SessionRepository, SessionStoreError};
use super::types::{PRINCIPAL_NAME_INDEX_NAME, SessionConfig, StoredSession};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory session repository
pub struct MemorySessionRepository {
    sessions: Arc<RwLock<HashMap<String, StoredSession>>>,
    config: SessionConfig,
}

impl MemorySessionRepository {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Number of stored sessions, expired ones included
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Copy of every stored session, keyed by ID
    pub async fn snapshot(&self) -> HashMap<String, StoredSession> {
        self.sessions.read().await.clone()
    }
}

impl Default for MemorySessionRepository {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    fn create_session(&self) -> StoredSession {
        StoredSession::new(&self.config)
    }

    async fn save(&self, session: StoredSession) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<StoredSession>, SessionStoreError> {
        let mut sessions = self.sessions.write().await;

        match sessions.get(session_id) {
            Some(session) if session.is_expired() => {
                debug!("Purging expired session {}", session_id);
                sessions.remove(session_id);
                Ok(None)
            }
            Some(session) => Ok(Some(session.clone())),
            None => Ok(None),
        }
    }

    async fn find_by_index_name_and_value(
        &self,
        index_name: &str,
        index_value: &str,
    ) -> Result<HashMap<String, StoredSession>, SessionStoreError> {
        if index_name != PRINCIPAL_NAME_INDEX_NAME {
            return Ok(HashMap::new());
        }

        let sessions = self.sessions.read().await;
        let found = sessions
            .values()
            .filter(|s| s.principal_name().as_deref() == Some(index_value))
            .map(|s| (s.id.clone(), s.clone()))
            .collect();

        Ok(found)
    }

    async fn delete(&self, session_id: &str) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
        Ok(())
    }
}
