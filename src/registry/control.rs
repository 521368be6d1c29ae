// Concurrent session control
// Enforces the maximum number of sessions per user on top of a session registry

use super::information::SessionInformation;
use super::principal::Principal;
use super::registry::SessionRegistry;
use crate::session::SessionStoreError;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Concurrent session policy
#[derive(Debug, Clone)]
pub struct ControlConfig {
    /// Maximum concurrent sessions per user; `None` means unlimited
    pub maximum_sessions: Option<usize>,
    /// Reject new logins at the limit instead of evicting the oldest sessions
    pub max_sessions_prevents_login: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            maximum_sessions: Some(1),
            max_sessions_prevents_login: false,
        }
    }
}

/// Concurrent session control errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// The user already has the maximum number of sessions and new logins are refused
    MaximumSessionsExceeded { principal: String, allowed: usize },
    Store(SessionStoreError),
}

impl std::fmt::Display for ControlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlError::MaximumSessionsExceeded { principal, allowed } => write!(
                f,
                "Maximum sessions of {} for user '{}' exceeded",
                allowed, principal
            ),
            ControlError::Store(e) => write!(f, "Session store error: {}", e),
        }
    }
}

impl std::error::Error for ControlError {}

impl From<SessionStoreError> for ControlError {
    fn from(e: SessionStoreError) -> Self {
        ControlError::Store(e)
    }
}

/// Applies the concurrent session policy when a user authenticates and on every request
pub struct ConcurrentSessionControl {
    registry: Arc<dyn SessionRegistry>,
    config: ControlConfig,
}

impl ConcurrentSessionControl {
    pub fn new(registry: Arc<dyn SessionRegistry>, config: ControlConfig) -> Self {
        Self { registry, config }
    }

    /// Check the user's session count before `session_id` becomes authenticated.
    ///
    /// At the limit, either refuses the login or expires the least recently used
    /// sessions to make room, depending on configuration.
    pub async fn on_authentication(
        &self,
        principal: &dyn Principal,
        session_id: &str,
    ) -> Result<(), ControlError> {
        let Some(allowed) = self.config.maximum_sessions else {
            return Ok(());
        };

        let mut sessions = self.registry.all_sessions(principal, false).await?;
        let count = sessions.len();

        if count < allowed {
            return Ok(());
        }

        // Re-authentication within one of the user's existing sessions
        if count == allowed && sessions.iter().any(|s| s.session_id() == session_id) {
            return Ok(());
        }

        let name = principal.display_name();

        if self.config.max_sessions_prevents_login {
            warn!(
                "User '{}' has reached max concurrent sessions ({}), refusing login",
                name, allowed
            );
            return Err(ControlError::MaximumSessionsExceeded {
                principal: name,
                allowed,
            });
        }

        // Oldest first
        sessions.sort_by_key(|s| s.last_request());
        let excess = count + 1 - allowed;

        for session in sessions.iter_mut().take(excess) {
            info!(
                "Expiring session {} for user '{}' to stay within {} concurrent session(s)",
                session.session_id(),
                name,
                allowed
            );
            session.expire_now().await?;
        }

        Ok(())
    }

    /// Per-request check. Returns the session when it may continue, after refreshing
    /// its last access time; `None` when the session is unknown or expired.
    ///
    /// Stores that purge expired sessions on read never hand an expired one out here;
    /// the expiry check is for stores that keep them readable.
    pub async fn check_request(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionInformation>, ControlError> {
        let Some(info) = self.registry.session_information(session_id).await? else {
            debug!("Session {} is unknown", session_id);
            return Ok(None);
        };

        if info.is_expired() {
            debug!("Session {} has expired", session_id);
            return Ok(None);
        }

        self.registry.refresh_last_request(session_id).await?;
        Ok(Some(info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{RepositorySessionRegistry, UserDetails};
    use crate::session::{
        MemorySessionRepository, PRINCIPAL_NAME_INDEX_NAME, SessionRepository, StoredSession,
    };
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::collections::HashMap;
    use serde_json::json;

    fn setup(config: ControlConfig) -> (Arc<MemorySessionRepository>, ConcurrentSessionControl) {
        let memory = Arc::new(MemorySessionRepository::default());
        let registry = Arc::new(RepositorySessionRegistry::new(memory.clone()));
        (memory, ConcurrentSessionControl::new(registry, config))
    }

    async fn save_session(
        repo: &MemorySessionRepository,
        principal: &str,
        idle_secs: i64,
    ) -> StoredSession {
        let mut session = repo.create_session();
        session.set_attribute(PRINCIPAL_NAME_INDEX_NAME, json!(principal));
        session.last_accessed_at = Utc::now() - Duration::seconds(idle_secs);
        repo.save(session.clone()).await.unwrap();
        session
    }

    fn limit(max: usize, prevents_login: bool) -> ControlConfig {
        ControlConfig {
            maximum_sessions: Some(max),
            max_sessions_prevents_login: prevents_login,
        }
    }

    #[tokio::test]
    async fn test_under_limit_allows_login() {
        let (repo, control) = setup(limit(2, false));
        save_session(&repo, "alice", 0).await;

        control
            .on_authentication(&UserDetails::new("alice"), "new-session")
            .await
            .unwrap();
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_at_limit_evicts_oldest() {
        let (repo, control) = setup(limit(2, false));
        let oldest = save_session(&repo, "alice", 300).await;
        let newer = save_session(&repo, "alice", 10).await;

        control
            .on_authentication(&UserDetails::new("alice"), "new-session")
            .await
            .unwrap();

        assert!(repo.get_session(&oldest.id).await.unwrap().is_none());
        assert!(repo.get_session(&newer.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_over_limit_evicts_all_excess() {
        let (repo, control) = setup(limit(2, false));
        let first = save_session(&repo, "alice", 500).await;
        let second = save_session(&repo, "alice", 400).await;
        let third = save_session(&repo, "alice", 10).await;

        control
            .on_authentication(&UserDetails::new("alice"), "new-session")
            .await
            .unwrap();

        assert!(repo.get_session(&first.id).await.unwrap().is_none());
        assert!(repo.get_session(&second.id).await.unwrap().is_none());
        assert!(repo.get_session(&third.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_limit_prevents_login() {
        let (repo, control) = setup(limit(1, true));
        let existing = save_session(&repo, "alice", 0).await;

        let result = control
            .on_authentication(&UserDetails::new("alice"), "new-session")
            .await;

        assert_eq!(
            result,
            Err(ControlError::MaximumSessionsExceeded {
                principal: "alice".to_string(),
                allowed: 1,
            })
        );
        assert!(repo.get_session(&existing.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reauthentication_in_existing_session() {
        let (repo, control) = setup(limit(1, true));
        let existing = save_session(&repo, "alice", 0).await;

        control
            .on_authentication(&UserDetails::new("alice"), &existing.id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_other_users_are_unaffected() {
        let (repo, control) = setup(limit(1, false));
        let bob = save_session(&repo, "bob", 500).await;
        save_session(&repo, "alice", 0).await;

        control
            .on_authentication(&UserDetails::new("alice"), "new-session")
            .await
            .unwrap();

        assert!(repo.get_session(&bob.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unlimited_sessions() {
        let config = ControlConfig {
            maximum_sessions: None,
            max_sessions_prevents_login: true,
        };
        let (repo, control) = setup(config);
        for _ in 0..10 {
            save_session(&repo, "alice", 0).await;
        }

        control
            .on_authentication(&UserDetails::new("alice"), "new-session")
            .await
            .unwrap();
        assert_eq!(repo.len().await, 10);
    }

    #[tokio::test]
    async fn test_check_request_refreshes_live_session() {
        let (repo, control) = setup(ControlConfig::default());
        let session = save_session(&repo, "alice", 120).await;

        let info = control.check_request(&session.id).await.unwrap().unwrap();
        assert_eq!(info.principal(), "alice");

        let refreshed = repo.get_session(&session.id).await.unwrap().unwrap();
        assert!(refreshed.last_accessed_at > session.last_accessed_at);
    }

    #[tokio::test]
    async fn test_check_request_unknown_session() {
        let (repo, control) = setup(ControlConfig::default());
        assert!(control.check_request("missing").await.unwrap().is_none());
        assert!(repo.is_empty().await);
    }

    /// Store that keeps expired sessions readable by ID
    #[derive(Default)]
    struct RetainingRepository {
        sessions: std::sync::Mutex<HashMap<String, StoredSession>>,
    }

    #[async_trait]
    impl SessionRepository for RetainingRepository {
        fn create_session(&self) -> StoredSession {
            StoredSession::new(&Default::default())
        }

        async fn save(&self, session: StoredSession) -> Result<(), SessionStoreError> {
            self.sessions
                .lock()
                .unwrap()
                .insert(session.id.clone(), session);
            Ok(())
        }

        async fn get_session(
            &self,
            session_id: &str,
        ) -> Result<Option<StoredSession>, SessionStoreError> {
            Ok(self.sessions.lock().unwrap().get(session_id).cloned())
        }

        async fn find_by_index_name_and_value(
            &self,
            _index_name: &str,
            _index_value: &str,
        ) -> Result<HashMap<String, StoredSession>, SessionStoreError> {
            Ok(self.sessions.lock().unwrap().clone())
        }

        async fn delete(&self, session_id: &str) -> Result<(), SessionStoreError> {
            self.sessions.lock().unwrap().remove(session_id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_check_request_rejects_expired_session() {
        let repo = Arc::new(RetainingRepository::default());
        let registry = Arc::new(RepositorySessionRegistry::new(repo.clone()));
        let control = ConcurrentSessionControl::new(registry, ControlConfig::default());

        let mut session = repo.create_session();
        session.set_attribute(PRINCIPAL_NAME_INDEX_NAME, json!("alice"));
        session.max_inactive_interval_secs = 60;
        session.last_accessed_at = Utc::now() - Duration::seconds(120);
        repo.save(session.clone()).await.unwrap();

        assert!(control.check_request(&session.id).await.unwrap().is_none());

        // Not refreshed back to life
        let stored = repo.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.last_accessed_at, session.last_accessed_at);
    }
}
