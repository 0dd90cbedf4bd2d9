//! Router-delegated authentication gateway
//!
//! The manager never stores the router owner's real credentials. Depending on
//! the configured mode, a request is either let through, checked against a
//! static local username/password, or vouched for by the router firmware
//! itself through its challenge-response `/auth` endpoint.
//!
//! ```text
//!   request ──► AuthGateway ──┬─ None ──────────────► allow
//!                             ├─ Local ─────────────► constant-time compare
//!                             └─ RouterDelegated
//!                                  ├─ session ──────► SessionStore (tt_session cookie)
//!                                  └─ forward ──────► VerificationCache
//!                                                        └─ miss ─► ChallengeResponseVerifier
//! ```

pub mod credentials;
pub mod gateway;
pub mod session_store;
pub mod verification_cache;

pub use credentials::Credentials;
pub use gateway::{AuthGateway, CheckStatus, LoginResult};
pub use session_store::{Session, SessionStore, SESSION_COOKIE_NAME};
pub use verification_cache::VerificationCache;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How requests are authorized, fixed for the process lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Every request is authorized
    None,
    /// Static username/password from the manager config
    Local,
    /// Credentials are verified by the router firmware
    RouterDelegated,
}

impl AuthMode {
    /// Name reported by `/api/auth/check`
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::None => "none",
            AuthMode::Local => "local",
            AuthMode::RouterDelegated => "ndm",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a router-delegated deployment keeps trust between requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delegation {
    /// Verify once at login, then trust the gateway's own session cookie
    Session,
    /// Re-verify the caller's credentials or router cookies, with a short cache
    Forward,
}

/// Immutable auth settings, built once at startup
#[derive(Clone)]
pub struct AuthConfiguration {
    pub mode: AuthMode,
    pub username: String,
    pub password: String,
    /// Router RCI endpoint used to find the LAN address of `/auth`
    pub rci_url: String,
    pub delegation: Delegation,
    pub session_ttl: Duration,
    pub cache_ttl: Duration,
    pub reap_interval: Duration,
    pub router_timeout: Duration,
}

impl fmt::Debug for AuthConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfiguration")
            .field("mode", &self.mode)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("rci_url", &self.rci_url)
            .field("delegation", &self.delegation)
            .field("session_ttl", &self.session_ttl)
            .field("cache_ttl", &self.cache_ttl)
            .field("reap_interval", &self.reap_interval)
            .field("router_timeout", &self.router_timeout)
            .finish()
    }
}

/// Who an authorized request acts as
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Identity {
    /// Auth disabled
    Anonymous,
    /// A named user, verified locally or by the router
    User(String),
    /// Caller presented router cookies the router accepted
    RouterSession,
}

impl Identity {
    pub fn username(&self) -> Option<&str> {
        match self {
            Identity::User(name) => Some(name),
            _ => None,
        }
    }
}

/// Outcome of [`AuthGateway::authorize`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Allowed(Identity),
    Denied,
}

impl AuthDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthDecision::Allowed(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            AuthDecision::Allowed(identity) => Some(identity),
            AuthDecision::Denied => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_names() {
        assert_eq!(AuthMode::None.as_str(), "none");
        assert_eq!(AuthMode::Local.as_str(), "local");
        assert_eq!(AuthMode::RouterDelegated.to_string(), "ndm");
    }

    #[test]
    fn test_configuration_debug_redacts_password() {
        let config = AuthConfiguration {
            mode: AuthMode::Local,
            username: "admin".to_string(),
            password: "hunter2".to_string(),
            rci_url: "http://localhost:79".to_string(),
            delegation: Delegation::Session,
            session_ttl: Duration::from_secs(60),
            cache_ttl: Duration::from_secs(5),
            reap_interval: Duration::from_secs(10),
            router_timeout: Duration::from_secs(1),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("admin"));
    }

    #[test]
    fn test_decision_identity() {
        let allowed = AuthDecision::Allowed(Identity::User("alice".to_string()));
        assert!(allowed.is_allowed());
        assert_eq!(allowed.identity().and_then(Identity::username), Some("alice"));
        assert!(!AuthDecision::Denied.is_allowed());
        assert!(AuthDecision::Denied.identity().is_none());
    }
}
