//! Request middleware

use super::AppState;
use crate::auth::AuthDecision;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::time::Instant;
use tracing::{debug, info};

/// Challenge sent with every 401
pub const WWW_AUTHENTICATE_VALUE: &str = r#"Basic realm="TrustTunnel Manager""#;

/// Reject requests the gateway does not authorize.
///
/// Authorized requests carry their [`crate::auth::Identity`] as a request extension.
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    match state.gateway.authorize(request.headers()).await {
        AuthDecision::Allowed(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        AuthDecision::Denied => {
            debug!(path = %request.uri().path(), "Unauthorized request");
            unauthorized()
        }
    }
}

pub fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, WWW_AUTHENTICATE_VALUE)],
        Json(serde_json::json!({ "error": "unauthorized" })),
    )
        .into_response()
}

/// Access log: `method path status elapsed`
pub async fn log_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request"
    );
    response
}
