// Stored session types and well-known attribute names

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Name of the index (and attribute) under which sessions are looked up by principal.
///
/// The store's indexing path and the session registry both read this constant, so
/// the index name cannot drift between them. The principal *value* is still derived
/// independently on each side; see `registry::principal`.
pub const PRINCIPAL_NAME_INDEX_NAME: &str = "principal_name";

/// Attribute holding the serialized [`SecurityContext`] of an authenticated session
pub const SECURITY_CONTEXT_ATTRIBUTE: &str = "security_context";

/// Default idle timeout for new sessions (30 minutes)
pub const DEFAULT_MAX_INACTIVE_INTERVAL_SECS: i64 = 1800;

/// Largest idle timeout accepted from configuration (one year)
pub const MAX_INACTIVE_INTERVAL_CEILING_SECS: i64 = 365 * 24 * 3600;

/// Store configuration for newly created sessions
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Idle timeout applied to new sessions; negative means never expire
    pub max_inactive_interval_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_inactive_interval_secs: DEFAULT_MAX_INACTIVE_INTERVAL_SECS,
        }
    }
}

/// Authenticated identity as recorded in a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Authentication {
    /// Principal name
    pub name: String,
    /// Granted roles
    #[serde(default)]
    pub authorities: Vec<String>,
}

/// Security context stored in the session after login
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecurityContext {
    pub authentication: Option<Authentication>,
}

/// Session record owned by the external session store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredSession {
    /// Unique session identifier
    pub id: String,
    /// Session attributes
    pub attributes: HashMap<String, Value>,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// Last time a request used this session
    pub last_accessed_at: DateTime<Utc>,
    /// Idle timeout in seconds; negative means never expire
    pub max_inactive_interval_secs: i64,
}

impl StoredSession {
    /// Create a new, unsaved session
    pub fn new(config: &SessionConfig) -> Self {
        let now = Utc::now();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            attributes: HashMap::new(),
            created_at: now,
            last_accessed_at: now,
            max_inactive_interval_secs: config.max_inactive_interval_secs,
        }
    }

    /// Whether the session has been idle for longer than its max inactive interval
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Intervals too large to represent never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        if self.max_inactive_interval_secs < 0 {
            return false;
        }
        match Duration::try_seconds(self.max_inactive_interval_secs) {
            Some(interval) => now - self.last_accessed_at >= interval,
            None => false,
        }
    }

    /// Mark the session as used now
    pub fn touch(&mut self) {
        self.last_accessed_at = Utc::now();
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: Value) {
        self.attributes.insert(name.into(), value);
    }

    /// Decode the security context attribute, if present and well-formed
    pub fn security_context(&self) -> Option<SecurityContext> {
        self.attribute(SECURITY_CONTEXT_ATTRIBUTE)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn set_security_context(&mut self, context: &SecurityContext) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(context)?;
        self.set_attribute(SECURITY_CONTEXT_ATTRIBUTE, value);
        Ok(())
    }

    /// Resolve the principal name this session is indexed under.
    ///
    /// Prefers the explicit index attribute, then the authentication name held in
    /// the security context.
    pub fn principal_name(&self) -> Option<String> {
        if let Some(name) = self
            .attribute(PRINCIPAL_NAME_INDEX_NAME)
            .and_then(Value::as_str)
        {
            return Some(name.to_string());
        }

        self.security_context()
            .and_then(|ctx| ctx.authentication)
            .map(|auth| auth.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session() -> StoredSession {
        StoredSession::new(&SessionConfig::default())
    }

    #[test]
    fn test_new_session_is_not_expired() {
        let session = session();
        assert!(!session.is_expired());
        assert_eq!(session.created_at, session.last_accessed_at);
        assert!(uuid::Uuid::parse_str(&session.id).is_ok());
    }

    #[test]
    fn test_session_expires_after_idle_interval() {
        let mut session = session();
        session.max_inactive_interval_secs = 60;
        session.last_accessed_at = Utc::now() - Duration::seconds(61);
        assert!(session.is_expired());

        session.touch();
        assert!(!session.is_expired());
    }

    #[test]
    fn test_negative_interval_never_expires() {
        let mut session = session();
        session.max_inactive_interval_secs = -1;
        session.last_accessed_at = Utc::now() - Duration::days(365);
        assert!(!session.is_expired());
    }

    #[test]
    fn test_huge_interval_never_expires() {
        let mut session = session();
        session.max_inactive_interval_secs = 10_000_000_000_000_000;
        session.last_accessed_at = Utc::now() - Duration::days(365);
        assert!(!session.is_expired());

        session.max_inactive_interval_secs = i64::MAX;
        assert!(!session.is_expired());
    }

    #[test]
    fn test_principal_name_prefers_index_attribute() {
        let mut session = session();
        session.set_attribute(PRINCIPAL_NAME_INDEX_NAME, json!("alice"));
        session
            .set_security_context(&SecurityContext {
                authentication: Some(Authentication {
                    name: "bob".to_string(),
                    authorities: vec![],
                }),
            })
            .unwrap();

        assert_eq!(session.principal_name(), Some("alice".to_string()));
    }

    #[test]
    fn test_principal_name_falls_back_to_security_context() {
        let mut session = session();
        session
            .set_security_context(&SecurityContext {
                authentication: Some(Authentication {
                    name: "bob".to_string(),
                    authorities: vec!["ROLE_USER".to_string()],
                }),
            })
            .unwrap();

        assert_eq!(session.principal_name(), Some("bob".to_string()));
    }

    #[test]
    fn test_principal_name_absent() {
        let mut session = session();
        assert_eq!(session.principal_name(), None);

        session
            .set_security_context(&SecurityContext::default())
            .unwrap();
        assert_eq!(session.principal_name(), None);

        // Non-string index values are ignored
        session.set_attribute(PRINCIPAL_NAME_INDEX_NAME, json!(42));
        assert_eq!(session.principal_name(), None);
    }
}
