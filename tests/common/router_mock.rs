//! WireMock-based Keenetic router
//!
//! Serves the web-auth endpoint (`/auth`) and the RCI interface query
//! (`/rci/show/interface/{name}`) so the gateway can be driven end to end
//! without a router.

use serde_json::json;
use std::time::Duration;
use trusttunnel_manager::ndm::challenge::{CHALLENGE_HEADER, REALM_HEADER};
use trusttunnel_manager::ndm::ChallengeResponseVerifier;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

/// Cookie the mock router sets alongside its challenge
pub const ROUTER_COOKIE: &str = "ndm_sid=router-cookie";

/// Mock Keenetic router
pub struct MockRouter {
    pub server: MockServer,
    pub base_url: String,
}

impl MockRouter {
    /// Start an empty mock router; mount behaviour with the `mock_*` methods
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();
        Self { server, base_url }
    }

    /// `host:port` of the mock, as RCI would report an interface address
    pub fn address(&self) -> String {
        self.base_url.trim_start_matches("http://").to_string()
    }

    pub fn verifier(&self) -> ChallengeResponseVerifier {
        ChallengeResponseVerifier::new(&self.base_url, Duration::from_secs(2))
            .expect("verifier for mock router")
    }

    /// `GET /auth` answers 401 with a realm, challenge and session cookie
    pub async fn mock_challenge(&self, realm: &str, challenge: &str) {
        Mock::given(method("GET"))
            .and(path("/auth"))
            .respond_with(
                ResponseTemplate::new(401)
                    .insert_header(REALM_HEADER, realm)
                    .insert_header(CHALLENGE_HEADER, challenge)
                    .insert_header("Set-Cookie", format!("{ROUTER_COOKIE}; Path=/; HttpOnly")),
            )
            .mount(&self.server)
            .await;
    }

    /// `POST /auth` accepts exactly this body with the challenge cookie replayed.
    ///
    /// Any other POST falls through to wiremock's 404.
    pub async fn mock_accept_login(&self, username: &str, response_hash: &str) {
        Mock::given(method("POST"))
            .and(path("/auth"))
            .and(header("cookie", ROUTER_COOKIE))
            .and(body_json(json!({ "login": username, "password": response_hash })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&self.server)
            .await;
    }

    /// `GET /auth` answers 200: the connection is already trusted
    pub async fn mock_already_trusted(&self) {
        Mock::given(method("GET"))
            .and(path("/auth"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.server)
            .await;
    }

    /// `GET /auth` redirects to `location`
    pub async fn mock_redirect(&self, location: &str) {
        Mock::given(method("GET"))
            .and(path("/auth"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", location))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// `GET /auth` answers with a bare status and no challenge headers
    pub async fn mock_auth_status(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path("/auth"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// `GET /auth` answers 200 only when these router cookies are presented
    pub async fn mock_cookie_session(&self, cookie_header: &str) {
        Mock::given(method("GET"))
            .and(path("/auth"))
            .and(header("cookie", cookie_header))
            .respond_with(ResponseTemplate::new(200))
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    /// RCI reports `address` for interface `name`
    pub async fn mock_interface(&self, name: &str, address: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/rci/show/interface/{name}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": name,
                "address": address,
                "mask": "255.255.255.0",
                "link": "up",
            })))
            .mount(&self.server)
            .await;
    }

    /// RCI fails for interface `name`
    pub async fn mock_interface_failure(&self, name: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/rci/show/interface/{name}")))
            .respond_with(ResponseTemplate::new(status).set_body_string("not found"))
            .mount(&self.server)
            .await;
    }

    /// Number of requests received for `request_path` with `http_method`
    pub async fn request_count(&self, http_method: &str, request_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == http_method && r.url.path() == request_path)
            .count()
    }
}
