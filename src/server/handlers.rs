//! Auth lifecycle and system info handlers

use super::AppState;
use crate::auth::{credentials::cookie_value, AuthMode, Identity, SESSION_COOKIE_NAME};
use crate::error::{ErrorReporter, ManagerError};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LoginResponse {
    fn ok() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(message.into()),
        }
    }
}

/// `Set-Cookie` value for a new session
pub fn session_cookie(token: &str, ttl: Duration) -> String {
    format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        ttl.as_secs()
    )
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// HTTP status for a failed login
pub fn login_error_status(error: &ManagerError) -> StatusCode {
    match error {
        ManagerError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        ManagerError::Unreachable(_) | ManagerError::Protocol(_) | ManagerError::Http(_) => {
            StatusCode::BAD_GATEWAY
        }
        ManagerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `POST /api/auth/login`
pub async fn login(State(state): State<AppState>, body: Bytes) -> Response {
    if state.gateway.mode() != AuthMode::RouterDelegated {
        return (
            StatusCode::BAD_REQUEST,
            Json(LoginResponse::error("router auth not configured")),
        )
            .into_response();
    }

    let request: LoginRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            let err = ManagerError::invalid_input(format!("login body: {e}"));
            ErrorReporter::log_error(&err, "login");
            return (
                login_error_status(&err),
                Json(LoginResponse::error("invalid request")),
            )
                .into_response();
        }
    };

    match state.gateway.login(&request.username, &request.password).await {
        Ok(result) => match (result.token, state.gateway.session_ttl()) {
            (Some(token), Some(ttl)) => (
                StatusCode::OK,
                [(header::SET_COOKIE, session_cookie(&token, ttl))],
                Json(LoginResponse::ok()),
            )
                .into_response(),
            _ => (StatusCode::OK, Json(LoginResponse::ok())).into_response(),
        },
        Err(e) => {
            ErrorReporter::log_error(&e, "login");
            (login_error_status(&e), Json(ErrorReporter::format_api_error(&e))).into_response()
        }
    }
}

/// `POST /api/auth/logout`
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let token = cookie_value(&headers, SESSION_COOKIE_NAME);
    state.gateway.logout(token.as_deref()).await;

    (
        StatusCode::OK,
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(LoginResponse::ok()),
    )
        .into_response()
}

/// `GET /api/auth/check`
pub async fn check(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    Json(state.gateway.check(&headers).await)
}

/// `GET /api/system`
pub async fn system_info(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> impl IntoResponse {
    let hostname = hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    Json(serde_json::json!({
        "hostname": hostname,
        "architecture": std::env::consts::ARCH,
        "manager_version": env!("CARGO_PKG_VERSION"),
        "auth_mode": state.gateway.mode().as_str(),
        "router_target_degraded": state.gateway.router_target_degraded(),
        "user": identity.username(),
    }))
}
