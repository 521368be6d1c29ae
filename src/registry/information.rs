// Point-in-time view of a stored session used for session-limiting decisions

use crate::session::{SessionRepository, SessionStoreError, StoredSession};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Derived view of one stored session.
///
/// Built fresh from a store snapshot on every query and stale as soon as it is
/// built. Expiring it deletes the underlying session, because the store is the
/// authoritative source and offers no way to merely mark a session expired.
pub struct SessionInformation {
    principal: String,
    session_id: String,
    last_request: DateTime<Utc>,
    expired: bool,
    repository: Arc<dyn SessionRepository>,
}

impl SessionInformation {
    pub fn new(session: &StoredSession, repository: Arc<dyn SessionRepository>) -> Self {
        Self {
            principal: session.principal_name().unwrap_or_default(),
            session_id: session.id.clone(),
            last_request: session.last_accessed_at,
            expired: session.is_expired(),
            repository,
        }
    }

    /// Principal name, or an empty string if the session names nobody
    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn last_request(&self) -> DateTime<Utc> {
        self.last_request
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Expire this session by deleting it from the store.
    ///
    /// The local flag is set before the delete is issued, so it stays expired even
    /// when the store call fails; the error is returned to the caller untouched.
    /// Safe to call more than once.
    pub async fn expire_now(&mut self) -> Result<(), SessionStoreError> {
        debug!(
            "Deleting session {} for user '{}', presumably because max concurrent sessions was reached",
            self.session_id, self.principal
        );
        self.expired = true;
        self.repository.delete(&self.session_id).await
    }
}

impl fmt::Debug for SessionInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionInformation")
            .field("principal", &self.principal)
            .field("session_id", &self.session_id)
            .field("last_request", &self.last_request)
            .field("expired", &self.expired)
            .finish()
    }
}
