//! Locating the router's web-auth endpoint
//!
//! The firmware only accepts `/auth` from the LAN interface, not from
//! `localhost`, so the manager asks RCI for the LAN address once at startup.

use super::rci::RciClient;
use std::fmt;
use tracing::{debug, info, warn};

/// Interface probed first
pub const PRIMARY_INTERFACE: &str = "Bridge0";

/// Interfaces tried in order when the primary probe fails
pub const FALLBACK_INTERFACES: [&str; 3] = ["Bridge0", "Home", "ISP"];

/// Conventional gateway address used when every probe fails
pub const FALLBACK_TARGET: &str = "http://192.168.1.1";

/// Where a resolved address came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSource {
    PrimaryBridge,
    Interface(String),
    Fallback,
}

impl fmt::Display for TargetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSource::PrimaryBridge => write!(f, "auto-detected from {PRIMARY_INTERFACE}"),
            TargetSource::Interface(name) => write!(f, "from interface {name}"),
            TargetSource::Fallback => f.write_str("hardcoded fallback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub base_url: String,
    pub source: TargetSource,
}

impl ResolvedTarget {
    /// True when no probe succeeded and the address is a guess
    pub fn is_degraded(&self) -> bool {
        self.source == TargetSource::Fallback
    }
}

pub struct TargetResolver {
    rci: RciClient,
}

impl TargetResolver {
    pub fn new(rci: RciClient) -> Self {
        Self { rci }
    }

    /// Resolve the auth base URL. Never fails; falls back to [`FALLBACK_TARGET`].
    pub async fn resolve(&self) -> ResolvedTarget {
        let target = match self.probe(PRIMARY_INTERFACE).await {
            Some(address) => ResolvedTarget {
                base_url: format!("http://{address}"),
                source: TargetSource::PrimaryBridge,
            },
            None => self.probe_fallbacks().await,
        };

        if target.is_degraded() {
            warn!(
                target_url = %target.base_url,
                source = %target.source,
                "All interface detection failed, router logins may fail"
            );
        } else {
            info!(target_url = %target.base_url, source = %target.source, "NDM auth URL resolved");
        }
        target
    }

    async fn probe_fallbacks(&self) -> ResolvedTarget {
        for name in FALLBACK_INTERFACES {
            if let Some(address) = self.probe(name).await {
                return ResolvedTarget {
                    base_url: format!("http://{address}"),
                    source: TargetSource::Interface(name.to_string()),
                };
            }
        }
        ResolvedTarget {
            base_url: FALLBACK_TARGET.to_string(),
            source: TargetSource::Fallback,
        }
    }

    async fn probe(&self, name: &str) -> Option<String> {
        match self.rci.show_interface(name).await {
            Ok(info) => {
                let address = info.ipv4().map(str::to_string);
                if address.is_none() {
                    debug!(interface = name, "Interface has no IPv4 address");
                }
                address
            }
            Err(e) => {
                debug!(interface = name, "Interface probe failed: {e}");
                None
            }
        }
    }
}
