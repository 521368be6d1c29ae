pub mod config;

pub use config::{AppConfig, ServerConfig, SessionsConfig, StoreConfig, UserConfig};
