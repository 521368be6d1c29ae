// Session registry backed by the external session store
// Holds no state of its own; every answer comes from the store

use super::information::SessionInformation;
use super::principal::Principal;
use super::RegistryError;
use crate::session::{PRINCIPAL_NAME_INDEX_NAME, SessionRepository, SessionStoreError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Read and evict capability used by concurrent session control
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// All sessions of the given principal, in store order.
    /// Expired sessions are left out unless `include_expired` is set.
    async fn all_sessions(
        &self,
        principal: &dyn Principal,
        include_expired: bool,
    ) -> Result<Vec<SessionInformation>, SessionStoreError>;

    /// Look a session up by ID
    async fn session_information(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionInformation>, SessionStoreError>;

    /// Mark the session as used now. A session that no longer exists is ignored.
    async fn refresh_last_request(&self, session_id: &str) -> Result<(), SessionStoreError>;
}

/// Session registry that reads sessions from a [`SessionRepository`] instead of
/// tracking them itself, so concurrent session control works across a cluster.
///
/// Evicting a session deletes it from the store: users of an evicted session are
/// simply logged out. Lookups rely on [`Principal::display_name`] producing the same
/// value the store indexed the session under.
#[derive(Clone)]
pub struct RepositorySessionRegistry {
    repository: Arc<dyn SessionRepository>,
}

impl RepositorySessionRegistry {
    pub fn new(repository: Arc<dyn SessionRepository>) -> Self {
        Self { repository }
    }

    /// Not supported: the store keeps no index of all known principals.
    pub fn all_principals(&self) -> Result<Vec<String>, RegistryError> {
        Err(RegistryError::Unsupported(
            "retrieving all principals is not supported, the session store provides no way to obtain them"
                .to_string(),
        ))
    }

    /// No-op: sessions are created by the session store, not registered here.
    pub fn register_new_session(&self, session_id: &str, principal: &dyn Principal) {
        debug!(
            "Ignoring registration of session {} for '{}', the session store owns it",
            session_id,
            principal.display_name()
        );
    }

    /// No-op: sessions are only removed through [`SessionInformation::expire_now`].
    pub fn remove_session_information(&self, session_id: &str) {
        debug!(
            "Ignoring removal of session {}, the session store owns it",
            session_id
        );
    }
}

#[async_trait]
impl SessionRegistry for RepositorySessionRegistry {
    async fn all_sessions(
        &self,
        principal: &dyn Principal,
        include_expired: bool,
    ) -> Result<Vec<SessionInformation>, SessionStoreError> {
        let name = principal.display_name();
        let sessions = self
            .repository
            .find_by_index_name_and_value(PRINCIPAL_NAME_INDEX_NAME, &name)
            .await?;

        let infos: Vec<SessionInformation> = sessions
            .values()
            .filter(|s| include_expired || !s.is_expired())
            .map(|s| SessionInformation::new(s, self.repository.clone()))
            .collect();

        debug!("Found {} session(s) for '{}'", infos.len(), name);
        Ok(infos)
    }

    async fn session_information(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionInformation>, SessionStoreError> {
        let session = self.repository.get_session(session_id).await?;
        Ok(session.map(|s| SessionInformation::new(&s, self.repository.clone())))
    }

    async fn refresh_last_request(&self, session_id: &str) -> Result<(), SessionStoreError> {
        // Read then write is not atomic: a session evicted by another node between the
        // two calls is written back and lives until its idle timeout. Tolerated, the
        // store offers no conditional save.
        if let Some(mut session) = self.repository.get_session(session_id).await? {
            session.touch();
            self.repository.save(session).await?;
        }
        Ok(())
    }
}
