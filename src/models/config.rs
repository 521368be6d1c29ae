use crate::registry::ControlConfig;
use crate::session::SessionConfig;
use crate::session::types::{
    DEFAULT_MAX_INACTIVE_INTERVAL_SECS, MAX_INACTIVE_INTERVAL_CEILING_SECS,
};
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Session store backend
    #[serde(default)]
    pub store: StoreConfig,
    /// Session lifetime and concurrency policy
    #[serde(default)]
    pub sessions: SessionsConfig,
    /// Users allowed to log in
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

/// Session store backend selection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// In-process store, for a single node
    #[default]
    Memory,
    /// Redis store, shared by every node of a cluster
    Redis {
        url: String,
        #[serde(default = "default_namespace")]
        namespace: String,
    },
}

fn default_namespace() -> String {
    "session-registry".to_string()
}

/// Session lifetime and concurrency policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Idle timeout in seconds; negative means never expire (default: 1800)
    #[serde(default = "default_max_inactive_interval")]
    pub max_inactive_interval_secs: i64,
    /// Maximum concurrent sessions per user; omit for unlimited
    #[serde(default)]
    pub maximum_sessions: Option<usize>,
    /// Reject logins at the limit instead of evicting the oldest session
    #[serde(default)]
    pub max_sessions_prevents_login: bool,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_inactive_interval_secs: default_max_inactive_interval(),
            maximum_sessions: None,
            max_sessions_prevents_login: false,
        }
    }
}

fn default_max_inactive_interval() -> i64 {
    DEFAULT_MAX_INACTIVE_INTERVAL_SECS
}

impl SessionsConfig {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            max_inactive_interval_secs: self.max_inactive_interval_secs,
        }
    }

    pub fn control_config(&self) -> ControlConfig {
        ControlConfig {
            maximum_sessions: self.maximum_sessions,
            max_sessions_prevents_login: self.max_sessions_prevents_login,
        }
    }
}

/// A user account that can log in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub username: String,
    /// bcrypt hash of the password
    pub password_hash: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl AppConfig {
    pub fn get_user(&self, username: &str) -> Option<&UserConfig> {
        self.users.iter().find(|u| u.username == username)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_address.is_empty() {
            return Err("Server bind_address must not be empty".to_string());
        }

        if let StoreConfig::Redis { url, namespace } = &self.store {
            if url.is_empty() {
                return Err("Redis store must have a url".to_string());
            }
            if namespace.is_empty() {
                return Err("Redis store namespace must not be empty".to_string());
            }
        }

        if self.sessions.max_inactive_interval_secs > MAX_INACTIVE_INTERVAL_CEILING_SECS {
            return Err(format!(
                "sessions.max_inactive_interval_secs must be at most {} (use a negative value for sessions that never expire)",
                MAX_INACTIVE_INTERVAL_CEILING_SECS
            ));
        }

        if self.sessions.maximum_sessions == Some(0) {
            return Err(
                "sessions.maximum_sessions must be at least 1 (omit it for unlimited)".to_string(),
            );
        }

        for (i, user) in self.users.iter().enumerate() {
            if user.username.is_empty() {
                return Err(format!("User #{} must have a username", i + 1));
            }
            if user.password_hash.is_empty() {
                return Err(format!(
                    "User '{}' must have a password_hash",
                    user.username
                ));
            }
            if self.users[..i].iter().any(|u| u.username == user.username) {
                return Err(format!("User '{}' is defined more than once", user.username));
            }
        }

        Ok(())
    }
}
