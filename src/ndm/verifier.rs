//! Two-step login against the router's `/auth` endpoint
//!
//! 1. `GET /auth`, following at most one redirect by hand (HTTP to HTTPS
//!    upgrade). `200` means the connection is already trusted, `401` carries
//!    the realm and challenge headers.
//! 2. `POST /auth` with `{"login", "password": <challenge response>}`,
//!    replaying the cookies set by step 1. Only `200` is success.

use super::challenge::Challenge;
use crate::error::{ManagerError, Result};
use reqwest::header::{HeaderMap, COOKIE, LOCATION, SET_COOKIE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const AUTH_PATH: &str = "/auth";

/// How the router accepted a login
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMethod {
    /// `GET /auth` answered `200` without a challenge
    AlreadyTrusted,
    /// Challenge answered and the `POST` accepted
    ChallengeResponse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedLogin {
    pub username: String,
    pub method: LoginMethod,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    login: &'a str,
    password: &'a str,
}

/// Stateless client for the router's web-auth endpoint
#[derive(Debug, Clone)]
pub struct ChallengeResponseVerifier {
    base_url: String,
    http: reqwest::Client,
}

impl ChallengeResponseVerifier {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: super::build_http_client(timeout)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth_url(&self) -> String {
        format!("{}{}", self.base_url, AUTH_PATH)
    }

    /// Run the full login protocol for `username`/`password`
    pub async fn login(&self, username: &str, password: &str) -> Result<VerifiedLogin> {
        let (url, response) = self.probe(None).await?;

        match response.status() {
            StatusCode::OK => {
                debug!(username, "Router already trusts this connection");
                return Ok(VerifiedLogin {
                    username: username.to_string(),
                    method: LoginMethod::AlreadyTrusted,
                });
            }
            StatusCode::UNAUTHORIZED => {}
            status => {
                return Err(ManagerError::protocol(format!(
                    "unexpected status {status} from {url}"
                )))
            }
        }

        let challenge = Challenge::from_headers(response.headers())?;
        let cookies = cookie_header(response.headers());
        let response_hash = challenge.respond(username, password);

        let mut request = self.http.post(&url).json(&LoginBody {
            login: username,
            password: &response_hash,
        });
        if let Some(cookies) = cookies {
            request = request.header(COOKIE, cookies);
        }

        let response = send(request, &url).await?;
        if response.status() == StatusCode::OK {
            Ok(VerifiedLogin {
                username: username.to_string(),
                method: LoginMethod::ChallengeResponse,
            })
        } else {
            // Status stays in the debug log, callers only learn "invalid"
            debug!(status = %response.status(), "Router rejected credentials");
            Err(ManagerError::InvalidCredentials)
        }
    }

    /// Like [`login`](Self::login), but a rejection is `Ok(false)`.
    ///
    /// Unreachable and protocol errors are still returned so callers can
    /// avoid caching them.
    pub async fn verify(&self, username: &str, password: &str) -> Result<bool> {
        match self.login(username, password).await {
            Ok(_) => Ok(true),
            Err(ManagerError::InvalidCredentials) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Single yes/no verification; any error counts as "no"
    pub async fn verify_once(&self, username: &str, password: &str) -> bool {
        match self.verify(username, password).await {
            Ok(valid) => valid,
            Err(e) => {
                warn!("Router verification failed: {e}");
                false
            }
        }
    }

    /// Ask the router whether the caller's own cookies are a live session.
    ///
    /// `cookies` is a ready `Cookie` header value.
    pub async fn verify_cookies(&self, cookies: &str) -> Result<bool> {
        let (_, response) = self.probe(Some(cookies)).await?;
        Ok(response.status() == StatusCode::OK)
    }

    /// `GET /auth`, following one redirect. Returns the URL that answered.
    async fn probe(&self, cookies: Option<&str>) -> Result<(String, Response)> {
        let url = self.auth_url();
        let response = self.get(&url, cookies).await?;

        if is_redirect(response.status()) {
            if let Some(location) = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
            {
                let next = resolve_location(&url, location)?;
                info!(target_url = %next, "Following router auth redirect");
                let response = self.get(&next, cookies).await?;
                return Ok((next, response));
            }
        }

        Ok((url, response))
    }

    async fn get(&self, url: &str, cookies: Option<&str>) -> Result<Response> {
        let mut request = self.http.get(url);
        if let Some(cookies) = cookies {
            request = request.header(COOKIE, cookies);
        }
        send(request, url).await
    }
}

async fn send(request: RequestBuilder, url: &str) -> Result<Response> {
    request.send().await.map_err(|e| {
        if e.is_timeout() {
            ManagerError::unreachable(format!("request to {url} timed out"))
        } else if e.is_builder() {
            ManagerError::internal(format!("invalid router request: {e}"))
        } else {
            ManagerError::unreachable(format!("{url}: {e}"))
        }
    })
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

fn resolve_location(current: &str, location: &str) -> Result<String> {
    let base = Url::parse(current)
        .map_err(|e| ManagerError::internal(format!("invalid auth URL {current}: {e}")))?;
    let next = base
        .join(location)
        .map_err(|e| ManagerError::protocol(format!("invalid redirect location {location:?}: {e}")))?;
    Ok(next.to_string())
}

/// Turn `Set-Cookie` headers into a `Cookie` header value
fn cookie_header(headers: &HeaderMap) -> Option<String> {
    let pairs: Vec<&str> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('=') && !pair.starts_with('='))
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}
