// Session repository abstraction
// The external store is the single source of truth for sessions

use super::types::{SessionConfig, StoredSession};
use crate::models::StoreConfig;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Trait for external session stores that can look sessions up by an index
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a new session with the store's defaults. The session is not persisted
    /// until it is saved.
    fn create_session(&self) -> StoredSession;

    /// Persist a session, creating or replacing it and updating its index entries
    async fn save(&self, session: StoredSession) -> Result<(), SessionStoreError>;

    /// Get a session by ID. Expired sessions are purged and reported as absent.
    async fn get_session(&self, session_id: &str) -> Result<Option<StoredSession>, SessionStoreError>;

    /// Find all sessions indexed under the given index name and value, keyed by session ID.
    ///
    /// Sessions that have expired but are not yet purged are included.
    async fn find_by_index_name_and_value(
        &self,
        index_name: &str,
        index_value: &str,
    ) -> Result<HashMap<String, StoredSession>, SessionStoreError>;

    /// Delete a session. Deleting a session that does not exist succeeds.
    async fn delete(&self, session_id: &str) -> Result<(), SessionStoreError>;
}

/// Session store errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStoreError {
    ConnectionError(String),
    SerializationError(String),
    InvalidData(String),
}

impl std::fmt::Display for SessionStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStoreError::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            SessionStoreError::SerializationError(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            SessionStoreError::InvalidData(msg) => write!(f, "Invalid data: {}", msg),
        }
    }
}

impl std::error::Error for SessionStoreError {}

impl From<serde_json::Error> for SessionStoreError {
    fn from(e: serde_json::Error) -> Self {
        SessionStoreError::SerializationError(e.to_string())
    }
}

impl From<redis::RedisError> for SessionStoreError {
    fn from(e: redis::RedisError) -> Self {
        SessionStoreError::ConnectionError(e.to_string())
    }
}

/// Factory function to create a session repository based on configuration
pub async fn create_repository(
    store: &StoreConfig,
    config: SessionConfig,
) -> Result<Arc<dyn SessionRepository>, SessionStoreError> {
    match store {
        StoreConfig::Memory => Ok(Arc::new(super::memory::MemorySessionRepository::new(config))),
        StoreConfig::Redis { url, namespace } => {
            let repository =
                super::redis_store::RedisSessionRepository::new(url, namespace, config).await?;
            Ok(Arc::new(repository))
        }
    }
}
