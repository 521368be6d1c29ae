pub mod auth;
pub mod health;
pub mod sessions;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::middleware::require_session;
use crate::models::AppConfig;
use crate::registry::{ConcurrentSessionControl, RepositorySessionRegistry};
use crate::session::SessionRepository;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repository: Arc<dyn SessionRepository>,
    pub registry: Arc<RepositorySessionRegistry>,
    pub control: Arc<ConcurrentSessionControl>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, repository: Arc<dyn SessionRepository>) -> Self {
        let registry = Arc::new(RepositorySessionRegistry::new(repository.clone()));
        let control = Arc::new(ConcurrentSessionControl::new(
            registry.clone(),
            config.sessions.control_config(),
        ));

        Self {
            config,
            repository,
            registry,
            control,
        }
    }
}

/// Build the application routes
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/", get(sessions::list_sessions))
        .route("/logout", post(auth::logout))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/login", post(auth::login))
        .merge(protected)
        .with_state(state)
}
