use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::error;

use crate::handlers::AppState;
use crate::middleware::CurrentSession;
use crate::session::PRINCIPAL_NAME_INDEX_NAME;

/// One of the current user's sessions
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub expired: bool,
    pub current: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub principal: String,
    pub current_session_id: String,
    pub sessions: Vec<SessionView>,
}

/// List the current user's sessions as recorded in the session store
pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<SessionListResponse>, (StatusCode, Json<Value>)> {
    let found = state
        .repository
        .find_by_index_name_and_value(PRINCIPAL_NAME_INDEX_NAME, &current.principal)
        .await
        .map_err(|e| {
            error!("Failed to list sessions for '{}': {}", current.principal, e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "Session store unavailable"
                })),
            )
        })?;

    let mut sessions: Vec<SessionView> = found
        .into_values()
        .map(|s| SessionView {
            current: s.id == current.session_id,
            expired: s.is_expired(),
            session_id: s.id,
            created_at: s.created_at,
            last_accessed_at: s.last_accessed_at,
        })
        .collect();

    // Most recently used first
    sessions.sort_by(|a, b| b.last_accessed_at.cmp(&a.last_accessed_at));

    Ok(Json(SessionListResponse {
        principal: current.principal,
        current_session_id: current.session_id,
        sessions,
    }))
}
