use crate::models::{AppConfig, StoreConfig};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Parse and validate a YAML configuration document
pub fn parse_config(contents: &str) -> Result<AppConfig, String> {
    let config: AppConfig = serde_yaml::from_str(contents)
        .map_err(|e| format!("Failed to parse YAML config: {}", e))?;

    config.validate()?;
    Ok(config)
}

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Arc<AppConfig>, String> {
    let path = path.as_ref();
    info!("Loading configuration from: {}", path.display());

    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

    let config = parse_config(&contents)?;

    match &config.store {
        StoreConfig::Memory => info!("  Session store: in-memory"),
        StoreConfig::Redis { namespace, .. } => {
            info!("  Session store: redis (namespace '{}')", namespace)
        }
    }

    match config.sessions.maximum_sessions {
        Some(max) => info!(
            "  Maximum sessions per user: {} ({})",
            max,
            if config.sessions.max_sessions_prevents_login {
                "new logins refused at the limit"
            } else {
                "oldest session evicted at the limit"
            }
        ),
        None => info!("  Maximum sessions per user: unlimited"),
    }

    info!(
        "Configuration loaded successfully with {} user(s)",
        config.users.len()
    );

    Ok(Arc::new(config))
}

/// Load configuration with fallback options
pub fn load_config_with_fallback() -> Result<Arc<AppConfig>, String> {
    // Try loading from environment variable first
    if let Ok(config_path) = std::env::var("CONFIG_PATH") {
        match load_config(&config_path) {
            Ok(config) => return Ok(config),
            Err(e) => warn!(
                "Failed to load config from CONFIG_PATH ({}): {}",
                config_path, e
            ),
        }
    }

    let paths = ["config.yaml", "config.yml"];

    for path in paths {
        if Path::new(path).exists() {
            match load_config(path) {
                Ok(config) => return Ok(config),
                Err(e) => warn!("Failed to load config from '{}': {}", path, e),
            }
        }
    }

    Err(
        "No configuration file found. Please create a config.yaml file or set CONFIG_PATH environment variable. \
        See config.example.yaml for an example configuration."
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserConfig;

    #[test]
    fn test_load_valid_config() {
        let yaml = r#"
server:
  bind_address: "127.0.0.1:8080"
store:
  type: redis
  url: "redis://127.0.0.1/"
sessions:
  max_inactive_interval_secs: 600
  maximum_sessions: 2
users:
  - username: alice
    password_hash: "$2b$04$abcdefghijklmnopqrstuv"
    roles: [user]
"#;

        let config = parse_config(yaml).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert_eq!(
            config.store,
            StoreConfig::Redis {
                url: "redis://127.0.0.1/".to_string(),
                namespace: "session-registry".to_string(),
            }
        );
        assert_eq!(config.sessions.maximum_sessions, Some(2));
        assert!(!config.sessions.max_sessions_prevents_login);
        assert_eq!(config.sessions.session_config().max_inactive_interval_secs, 600);
        assert!(config.get_user("alice").is_some());
        assert!(config.get_user("bob").is_none());
    }

    #[test]
    fn test_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:3000");
        assert_eq!(config.store, StoreConfig::Memory);
        assert_eq!(config.sessions.max_inactive_interval_secs, 1800);
        assert_eq!(config.sessions.control_config().maximum_sessions, None);
        assert!(config.users.is_empty());
    }

    #[test]
    fn test_config_validation_zero_maximum_sessions() {
        let result = parse_config("sessions:\n  maximum_sessions: 0\n");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("at least 1"));
    }

    #[test]
    fn test_config_validation_interval_too_large() {
        let result = parse_config("sessions:\n  max_inactive_interval_secs: 10000000000000000\n");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("at most"));

        let never = parse_config("sessions:\n  max_inactive_interval_secs: -1\n").unwrap();
        assert_eq!(never.sessions.max_inactive_interval_secs, -1);
    }

    #[test]
    fn test_config_validation_empty_redis_url() {
        let result = parse_config("store:\n  type: redis\n  url: \"\"\n");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("url"));
    }

    #[test]
    fn test_config_validation_duplicate_users() {
        let user = UserConfig {
            username: "alice".to_string(),
            password_hash: "hash".to_string(),
            roles: vec![],
        };
        let config = AppConfig {
            users: vec![user.clone(), user],
            ..Default::default()
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("more than once"));
    }

    #[test]
    fn test_missing_config_file() {
        let result = load_config("/nonexistent/config.yaml");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Failed to read config file"));
    }
}
