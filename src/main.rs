use session_registry::{config, handlers, session};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_registry=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let app_config = match config::load_config_with_fallback() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("{} Starting with defaults: in-memory store, no users.", e);
            Arc::new(Default::default())
        }
    };

    let repository = match session::create_repository(
        &app_config.store,
        app_config.sessions.session_config(),
    )
    .await
    {
        Ok(repository) => repository,
        Err(e) => {
            tracing::error!("Failed to create session store: {}", e);
            std::process::exit(1);
        }
    };

    let bind_address = app_config.server.bind_address.clone();
    let state = handlers::AppState::new(app_config, repository);
    let app = handlers::router(state).layer(TraceLayer::new_for_http());

    let listener = match tokio::net::TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", bind_address, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting session registry server on {}", bind_address);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
