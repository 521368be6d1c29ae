use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::handlers::AppState;
use crate::middleware::{CurrentSession, SESSION_COOKIE, session_id_from_headers};
use crate::registry::{ControlError, SessionRegistry, UserDetails};
use crate::session::{
    Authentication, PRINCIPAL_NAME_INDEX_NAME, SecurityContext, SessionStoreError,
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message })))
}

fn session_cookie(session_id: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, session_id)
}

fn cleared_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Authenticate a configured user and start a new session, applying the
/// concurrent session limit first
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, (StatusCode, Json<Value>)> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Username and password are required",
        ));
    }

    let user = state.config.get_user(&payload.username).ok_or_else(|| {
        warn!("Login attempt for unknown user '{}'", payload.username);
        error_response(StatusCode::UNAUTHORIZED, "Invalid credentials")
    })?;

    let valid = bcrypt::verify(&payload.password, &user.password_hash).map_err(|e| {
        error!("Unusable password hash for user '{}': {}", user.username, e);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to verify password")
    })?;

    if !valid {
        warn!("Invalid password for user '{}'", user.username);
        return Err(error_response(StatusCode::UNAUTHORIZED, "Invalid credentials"));
    }

    let store_error = |e: &dyn std::fmt::Display| {
        error!("Session store error during login: {}", e);
        error_response(StatusCode::SERVICE_UNAVAILABLE, "Session store unavailable")
    };

    // Never carry a pre-login session over into the authenticated one
    if let Some(previous) = session_id_from_headers(&headers) {
        state
            .repository
            .delete(&previous)
            .await
            .map_err(|e| store_error(&e))?;
    }

    let principal = UserDetails {
        username: user.username.clone(),
        authorities: user.roles.clone(),
    };

    let mut session = state.repository.create_session();

    state
        .control
        .on_authentication(&principal, &session.id)
        .await
        .map_err(|e| match &e {
            ControlError::MaximumSessionsExceeded { .. } => {
                error_response(StatusCode::CONFLICT, &e.to_string())
            }
            ControlError::Store(inner) => store_error(inner),
        })?;

    session.set_attribute(PRINCIPAL_NAME_INDEX_NAME, json!(principal.username));
    session
        .set_security_context(&SecurityContext {
            authentication: Some(Authentication {
                name: principal.username.clone(),
                authorities: principal.authorities.clone(),
            }),
        })
        .map_err(|e| store_error(&e))?;

    let session_id = session.id.clone();
    state
        .repository
        .save(session)
        .await
        .map_err(|e| store_error(&e))?;

    info!("User '{}' logged in with session {}", principal.username, session_id);

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie(&session_id))],
        Json(json!({
            "session_id": session_id,
            "username": principal.username,
        })),
    )
        .into_response())
}

/// End the current session
///
/// Goes through the registry's expire path, the same deletion used for eviction.
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Response, (StatusCode, Json<Value>)> {
    let store_error = |e: SessionStoreError| {
        error!("Failed to delete session {}: {}", current.session_id, e);
        error_response(StatusCode::SERVICE_UNAVAILABLE, "Session store unavailable")
    };

    if let Some(mut info) = state
        .registry
        .session_information(&current.session_id)
        .await
        .map_err(store_error)?
    {
        info.expire_now().await.map_err(store_error)?;
    }

    info!(
        "User '{}' logged out of session {}",
        current.principal, current.session_id
    );

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cleared_session_cookie())],
        Json(json!({ "status": "logged_out" })),
    )
        .into_response())
}
