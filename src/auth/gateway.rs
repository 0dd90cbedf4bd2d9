//! Single authorization entry point for the HTTP layer

use super::credentials::{basic_credentials, cookie_value, request_cookies, Credentials};
use super::session_store::{SessionStore, SESSION_COOKIE_NAME};
use super::verification_cache::{cookie_key, credential_key, VerificationCache};
use super::{AuthConfiguration, AuthDecision, AuthMode, Delegation, Identity};
use crate::error::{ErrorReporter, ManagerError, Result};
use crate::ndm::{ChallengeResponseVerifier, RciClient, TargetResolver};
use axum::http::HeaderMap;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of a successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResult {
    pub username: String,
    /// Session token to hand out as a cookie; `None` in forward delegation
    pub token: Option<String>,
}

/// Side-effect free authentication state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckStatus {
    pub authenticated: bool,
    pub auth_mode: &'static str,
}

enum Backend {
    None,
    Local(Credentials),
    Router {
        verifier: ChallengeResponseVerifier,
        trust: Trust,
    },
}

enum Trust {
    Sessions(SessionStore),
    Forward(VerificationCache),
}

/// Authorization façade over the three auth modes
pub struct AuthGateway {
    backend: Backend,
    target_degraded: bool,
}

impl AuthGateway {
    /// Every request is authorized
    pub fn disabled() -> Self {
        Self {
            backend: Backend::None,
            target_degraded: false,
        }
    }

    /// Static username/password
    pub fn local(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            backend: Backend::Local(Credentials::new(username, password)),
            target_degraded: false,
        }
    }

    /// Router-delegated auth. Session delegation spawns the session reaper,
    /// so this must run inside a Tokio runtime.
    pub fn router_delegated(
        verifier: ChallengeResponseVerifier,
        delegation: Delegation,
        session_ttl: Duration,
        cache_ttl: Duration,
        reap_interval: Duration,
    ) -> Self {
        let trust = match delegation {
            Delegation::Session => Trust::Sessions(SessionStore::new(session_ttl, reap_interval)),
            Delegation::Forward => Trust::Forward(VerificationCache::new(cache_ttl)),
        };
        Self {
            backend: Backend::Router { verifier, trust },
            target_degraded: false,
        }
    }

    /// Build the gateway for `config`, resolving the router address if needed
    pub async fn from_config(config: &AuthConfiguration) -> Result<Self> {
        let gateway = match config.mode {
            AuthMode::None => Self::disabled(),
            AuthMode::Local => Self::local(&config.username, &config.password),
            AuthMode::RouterDelegated => {
                let rci = RciClient::new(&config.rci_url, config.router_timeout)?;
                let target = TargetResolver::new(rci).resolve().await;
                let degraded = target.is_degraded();
                let verifier =
                    ChallengeResponseVerifier::new(target.base_url, config.router_timeout)?;
                let mut gateway = Self::router_delegated(
                    verifier,
                    config.delegation,
                    config.session_ttl,
                    config.cache_ttl,
                    config.reap_interval,
                );
                gateway.target_degraded = degraded;
                gateway
            }
        };
        info!(
            mode = %gateway.mode(),
            delegation = ?gateway.delegation(),
            degraded = gateway.target_degraded,
            "Auth gateway ready"
        );
        Ok(gateway)
    }

    pub fn mode(&self) -> AuthMode {
        match self.backend {
            Backend::None => AuthMode::None,
            Backend::Local(_) => AuthMode::Local,
            Backend::Router { .. } => AuthMode::RouterDelegated,
        }
    }

    /// Delegation style, router mode only
    pub fn delegation(&self) -> Option<Delegation> {
        match &self.backend {
            Backend::Router {
                trust: Trust::Sessions(_),
                ..
            } => Some(Delegation::Session),
            Backend::Router {
                trust: Trust::Forward(_),
                ..
            } => Some(Delegation::Forward),
            _ => None,
        }
    }

    /// Lifetime of issued sessions, if this gateway issues any
    pub fn session_ttl(&self) -> Option<Duration> {
        match &self.backend {
            Backend::Router {
                trust: Trust::Sessions(store),
                ..
            } => Some(store.ttl()),
            _ => None,
        }
    }

    /// Base URL of the router auth endpoint, router mode only
    pub fn router_url(&self) -> Option<&str> {
        match &self.backend {
            Backend::Router { verifier, .. } => Some(verifier.base_url()),
            _ => None,
        }
    }

    /// True when the router address came from the hard-coded fallback
    /// because discovery failed
    pub fn router_target_degraded(&self) -> bool {
        self.target_degraded
    }

    /// Decide whether a request may proceed
    pub async fn authorize(&self, headers: &HeaderMap) -> AuthDecision {
        match &self.backend {
            Backend::None => AuthDecision::Allowed(Identity::Anonymous),
            Backend::Local(expected) => match basic_credentials(headers) {
                Some(creds) if creds.matches(&expected.username, &expected.password) => {
                    AuthDecision::Allowed(Identity::User(creds.username))
                }
                _ => AuthDecision::Denied,
            },
            Backend::Router {
                trust: Trust::Sessions(store),
                ..
            } => {
                let Some(token) = cookie_value(headers, SESSION_COOKIE_NAME) else {
                    return AuthDecision::Denied;
                };
                match store.lookup(&token).await {
                    Some(session) => AuthDecision::Allowed(Identity::User(session.owner)),
                    None => AuthDecision::Denied,
                }
            }
            Backend::Router {
                verifier,
                trust: Trust::Forward(cache),
            } => authorize_forward(verifier, cache, headers).await,
        }
    }

    /// Verify credentials with the router.
    ///
    /// Session delegation returns a fresh token; forward delegation records
    /// the verdict in the verification cache and returns no token.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResult> {
        let Backend::Router { verifier, trust } = &self.backend else {
            return Err(ManagerError::config("router auth not configured"));
        };

        match trust {
            Trust::Sessions(store) => {
                let verified = verifier.login(username, password).await?;
                let token = store.create(&verified.username).await?;
                info!(username, method = ?verified.method, "Router login succeeded");
                Ok(LoginResult {
                    username: verified.username,
                    token: Some(token),
                })
            }
            Trust::Forward(cache) => {
                let key = credential_key(username, password);
                match verifier.login(username, password).await {
                    Ok(verified) => {
                        cache.put(key, true).await;
                        info!(username, method = ?verified.method, "Router login verified");
                        Ok(LoginResult {
                            username: verified.username,
                            token: None,
                        })
                    }
                    Err(ManagerError::InvalidCredentials) => {
                        cache.put(key, false).await;
                        Err(ManagerError::InvalidCredentials)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// End a gateway session. Unknown or absent tokens are ignored.
    pub async fn logout(&self, token: Option<&str>) {
        if let (
            Backend::Router {
                trust: Trust::Sessions(store),
                ..
            },
            Some(token),
        ) = (&self.backend, token)
        {
            store.destroy(token).await;
        }
    }

    /// Report authentication state without calling the router or mutating state
    pub async fn check(&self, headers: &HeaderMap) -> CheckStatus {
        let authenticated = match &self.backend {
            Backend::None => true,
            Backend::Local(expected) => basic_credentials(headers)
                .map(|creds| creds.matches(&expected.username, &expected.password))
                .unwrap_or(false),
            Backend::Router {
                trust: Trust::Sessions(store),
                ..
            } => match cookie_value(headers, SESSION_COOKIE_NAME) {
                Some(token) => store.validate(&token).await,
                None => false,
            },
            Backend::Router {
                trust: Trust::Forward(cache),
                ..
            } => match forward_cache_key(headers) {
                Some((key, _)) => cache.get(&key).await == Some(true),
                None => false,
            },
        };

        CheckStatus {
            authenticated,
            auth_mode: self.mode().as_str(),
        }
    }

    /// Stop background work (the session reaper)
    pub async fn shutdown(&self) {
        if let Backend::Router {
            trust: Trust::Sessions(store),
            ..
        } = &self.backend
        {
            store.shutdown().await;
        }
    }
}

/// What a forward-mode request presents to the router
enum Presented {
    Basic(Credentials),
    Cookies(String),
}

/// Cache key for a request's Basic credentials, or else its router cookies
fn forward_cache_key(headers: &HeaderMap) -> Option<(String, Presented)> {
    if let Some(creds) = basic_credentials(headers) {
        return Some((
            credential_key(&creds.username, &creds.password),
            Presented::Basic(creds),
        ));
    }

    let cookies: Vec<(String, String)> = request_cookies(headers)
        .into_iter()
        .filter(|(name, _)| name != SESSION_COOKIE_NAME)
        .collect();
    if cookies.is_empty() {
        return None;
    }

    let key = cookie_key(&cookies);
    let header = cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ");
    Some((key, Presented::Cookies(header)))
}

async fn authorize_forward(
    verifier: &ChallengeResponseVerifier,
    cache: &VerificationCache,
    headers: &HeaderMap,
) -> AuthDecision {
    let Some((key, presented)) = forward_cache_key(headers) else {
        return AuthDecision::Denied;
    };

    let identity = match &presented {
        Presented::Basic(creds) => Identity::User(creds.username.clone()),
        Presented::Cookies(_) => Identity::RouterSession,
    };

    let valid = match cache.get(&key).await {
        Some(valid) => {
            debug!(valid, "Verification cache hit");
            valid
        }
        None => {
            let verdict = match &presented {
                Presented::Basic(creds) => verifier.verify(&creds.username, &creds.password).await,
                Presented::Cookies(header) => verifier.verify_cookies(header).await,
            };
            match verdict {
                Ok(valid) => {
                    cache.put(key, valid).await;
                    valid
                }
                Err(e) => {
                    // Not cached: the next request retries the router
                    ErrorReporter::log_error(&e, "forward_verification");
                    warn!("Denying request, router verification unavailable");
                    false
                }
            }
        }
    };

    if valid {
        AuthDecision::Allowed(identity)
    } else {
        AuthDecision::Denied
    }
}
