//! Clients for the router firmware (NDM)
//!
//! - [`rci`]: the local management API, used to find the LAN address
//! - [`resolver`]: picks the base URL of the web-auth endpoint
//! - [`challenge`]: the realm/challenge hashing scheme
//! - [`verifier`]: the two-step `/auth` login protocol

pub mod challenge;
pub mod rci;
pub mod resolver;
pub mod verifier;

pub use challenge::Challenge;
pub use rci::{InterfaceInfo, RciClient};
pub use resolver::{ResolvedTarget, TargetResolver, TargetSource};
pub use verifier::{ChallengeResponseVerifier, LoginMethod, VerifiedLogin};

use crate::error::Result;
use std::time::Duration;

/// Default timeout for every router call
pub const DEFAULT_ROUTER_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for router calls.
///
/// Redirects are never followed automatically and idle connections are not
/// pooled, so each verification opens and closes its own connection.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .user_agent(concat!("trusttunnel-manager/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
