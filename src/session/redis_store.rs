// Redis-backed session repository
// Shares sessions and the principal index across every node of a cluster

use super::repository::{SessionRepository, SessionStoreError};
use super::types::{PRINCIPAL_NAME_INDEX_NAME, SessionConfig, StoredSession};
use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Expired sessions stay readable this long so index lookups can still report them
const EXPIRED_SESSION_GRACE_SECS: u64 = 300;

/// Redis session repository
///
/// Layout:
/// - `{namespace}:sessions:{id}` holds the JSON-encoded session
/// - `{namespace}:index:principal_name:{name}` is a set of session IDs
pub struct RedisSessionRepository {
    conn: Arc<Mutex<MultiplexedConnection>>,
    namespace: String,
    config: SessionConfig,
}

impl RedisSessionRepository {
    /// Connect to Redis and create a repository under the given key namespace
    pub async fn new(
        redis_url: &str,
        namespace: &str,
        config: SessionConfig,
    ) -> Result<Self, SessionStoreError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_tokio_connection().await?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            namespace: namespace.to_string(),
            config,
        })
    }

    fn session_key(&self, session_id: &str) -> String {
        format!("{}:sessions:{}", self.namespace, session_id)
    }

    fn index_key(&self, principal_name: &str) -> String {
        format!(
            "{}:index:{}:{}",
            self.namespace, PRINCIPAL_NAME_INDEX_NAME, principal_name
        )
    }

    async fn load(
        &self,
        conn: &mut MultiplexedConnection,
        session_id: &str,
    ) -> Result<Option<StoredSession>, SessionStoreError> {
        let raw: Option<String> = conn.get(self.session_key(session_id)).await?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn remove(
        &self,
        conn: &mut MultiplexedConnection,
        session: &StoredSession,
    ) -> Result<(), SessionStoreError> {
        let mut pipe = redis::pipe();
        pipe.atomic().del(self.session_key(&session.id)).ignore();
        if let Some(principal) = session.principal_name() {
            pipe.srem(self.index_key(&principal), &session.id).ignore();
        }

        let _: () = pipe.query_async(conn).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for RedisSessionRepository {
    fn create_session(&self) -> StoredSession {
        StoredSession::new(&self.config)
    }

    async fn save(&self, session: StoredSession) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.lock().await;

        let previous_principal = self
            .load(&mut conn, &session.id)
            .await?
            .and_then(|s| s.principal_name());
        let principal = session.principal_name();
        let json = serde_json::to_string(&session)?;
        let key = self.session_key(&session.id);

        let mut pipe = redis::pipe();
        pipe.atomic();

        if session.max_inactive_interval_secs >= 0 {
            let ttl = (session.max_inactive_interval_secs as u64)
                .saturating_add(EXPIRED_SESSION_GRACE_SECS);
            pipe.set_ex(&key, json, ttl).ignore();
        } else {
            pipe.set(&key, json).ignore();
        }

        if let Some(previous) = previous_principal.as_deref()
            && principal.as_deref() != Some(previous)
        {
            pipe.srem(self.index_key(previous), &session.id).ignore();
        }

        if let Some(principal) = principal.as_deref() {
            pipe.sadd(self.index_key(principal), &session.id).ignore();
        }

        let _: () = pipe.query_async(&mut *conn).await?;
        debug!("Saved session {} to Redis", session.id);
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<StoredSession>, SessionStoreError> {
        let mut conn = self.conn.lock().await;

        match self.load(&mut conn, session_id).await? {
            Some(session) if session.is_expired() => {
                debug!("Purging expired session {}", session_id);
                self.remove(&mut conn, &session).await?;
                Ok(None)
            }
            other => Ok(other),
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

        let index_key = self.index_key(index_value);
        let mut conn = self.conn.lock().await;
        let ids: Vec<String> = conn.smembers(&index_key).await?;

        let mut found = HashMap::with_capacity(ids.len());
        let mut stale = Vec::new();

        for id in ids {
            match self.load(&mut conn, &id).await {
                Ok(Some(session)) => {
                    found.insert(id, session);
                }
                Ok(None) => stale.push(id),
                Err(SessionStoreError::SerializationError(e)) => {
                    warn!("Skipping undecodable session {}: {}", id, e);
                }
                Err(e) => return Err(e),
            }
        }

        if !stale.is_empty() {
            debug!(
                "Pruning {} stale entries from index {}",
                stale.len(),
                index_key
            );
            let _: () = conn.srem(&index_key, stale).await?;
        }

        Ok(found)
    }

    async fn delete(&self, session_id: &str) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.lock().await;

        match self.load(&mut conn, session_id).await {
            Ok(Some(session)) => self.remove(&mut conn, &session).await,
            Ok(None) => Ok(()),
            Err(SessionStoreError::SerializationError(_)) => {
                let _: () = conn.del(self.session_key(session_id)).await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
