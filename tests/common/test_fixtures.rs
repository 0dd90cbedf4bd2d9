//! Test fixtures and utilities for consistent test setup

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose, Engine as _};
use rstest::*;
use serde_json::Value;
use std::net::TcpListener;
use std::time::Duration;
use tower::ServiceExt;
use trusttunnel_manager::auth::{AuthGateway, Delegation};
use trusttunnel_manager::ndm::ChallengeResponseVerifier;

/// Router account used across tests
#[derive(Debug, Clone)]
pub struct TestUser {
    pub username: &'static str,
    pub password: &'static str,
    pub realm: &'static str,
    pub challenge: &'static str,
    /// sha256("abc123" + md5("alice:example:secret")), computed independently
    pub expected_response: &'static str,
}

#[fixture]
pub fn alice() -> TestUser {
    TestUser {
        username: "alice",
        password: "secret",
        realm: "example",
        challenge: "abc123",
        expected_response: "84c6556a839355ff32b59228139f41b1cdc8d6f970fd2796d9f33d4a5ec59539",
    }
}

/// Base URL of a loopback port with nothing listening on it
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

pub fn unreachable_verifier() -> ChallengeResponseVerifier {
    ChallengeResponseVerifier::new(closed_port_url(), Duration::from_secs(1))
        .expect("verifier for closed port")
}

pub fn session_gateway(verifier: ChallengeResponseVerifier) -> AuthGateway {
    AuthGateway::router_delegated(
        verifier,
        Delegation::Session,
        Duration::from_secs(3600),
        Duration::from_secs(30),
        Duration::from_secs(600),
    )
}

pub fn forward_gateway(verifier: ChallengeResponseVerifier) -> AuthGateway {
    AuthGateway::router_delegated(
        verifier,
        Delegation::Forward,
        Duration::from_secs(3600),
        Duration::from_secs(30),
        Duration::from_secs(600),
    )
}

pub fn basic_auth_value(username: &str, password: &str) -> String {
    let encoded = general_purpose::STANDARD.encode(format!("{username}:{password}"));
    format!("Basic {encoded}")
}

pub fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({ "username": username, "password": password }).to_string(),
        ))
        .expect("login request")
}

pub fn get_request(uri: &str, headers: &[(header::HeaderName, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    for (name, value) in headers {
        builder = builder.header(name.clone(), *value);
    }
    builder.body(Body::empty()).expect("get request")
}

/// Response parts after a `oneshot` call; `body` is `Null` when empty
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn set_cookie(&self) -> Option<&str> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
    }

    /// `name=value` part of the `Set-Cookie` header
    pub fn cookie_pair(&self) -> Option<String> {
        self.set_cookie()
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.expect("infallible router");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    TestResponse {
        status,
        headers,
        body,
    }
}
