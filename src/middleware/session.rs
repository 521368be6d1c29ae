use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::Response,
};
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::handlers::AppState;

/// Name of the cookie carrying the session ID
pub const SESSION_COOKIE: &str = "SESSION";

// Extension to store the authenticated session in the request
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub session_id: String,
    pub principal: String,
}

/// Extract the session ID from the request's cookies
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .find(|id| !id.is_empty())
        .map(|id| id.to_string())
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "Unauthorized"
        })),
    )
}

fn store_unavailable<E: std::fmt::Display>(e: E) -> (StatusCode, Json<Value>) {
    error!("Session store error: {}", e);
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "error": "Session store unavailable"
        })),
    )
}

/// Only let requests through that belong to a live, authenticated session.
///
/// A session evicted by concurrent session control is gone from the store, so its
/// requests end up here as unauthenticated.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<Value>)> {
    let session_id = session_id_from_headers(request.headers()).ok_or_else(unauthorized)?;

    let info = state
        .control
        .check_request(&session_id)
        .await
        .map_err(store_unavailable)?
        .ok_or_else(|| {
            debug!("Rejecting request for session {}", session_id);
            unauthorized()
        })?;

    if info.principal().is_empty() {
        return Err(unauthorized());
    }
    let principal = info.principal().to_string();

    request.extensions_mut().insert(CurrentSession {
        session_id,
        principal,
    });

    Ok(next.run(request).await)
}
