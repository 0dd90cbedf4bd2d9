//! Manager configuration
//!
//! The manager reads the same `KEY=VALUE` file the init scripts source
//! (`/opt/trusttunnel_client/manager.conf`), layered under `TT_`-prefixed
//! environment variables. Everything here is read once at startup; changing
//! the auth mode requires a restart.

pub mod format;

pub use format::ManagerConf;

use crate::auth::{AuthConfiguration, AuthMode, Delegation};
use crate::error::{ManagerError, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Default location of the manager config file
pub const DEFAULT_CONFIG_PATH: &str = "/opt/trusttunnel_client/manager.conf";

/// Default router local management (RCI) endpoint
pub const DEFAULT_RCI_URL: &str = "http://localhost:79";

/// Environment variable prefix (`TT_AUTH_MODE`, `TT_PASSWORD`, ...)
pub const ENV_PREFIX: &str = "TT";

/// Raw manager configuration as read from file and environment
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, either `host:port` or `:port`
    pub listen_addr: String,
    /// `ndm`, `local`, `none`/`off`, or empty for auto-detection
    pub auth_mode: String,
    /// Static username (local mode)
    pub username: String,
    /// Static password (local mode); empty disables local auth
    pub password: String,
    /// Router RCI endpoint used to discover the LAN address
    pub rci_url: String,
    /// Lifetime of gateway-issued sessions
    pub session_ttl_secs: u64,
    /// Lifetime of cached router verdicts (forward delegation)
    pub cache_ttl_secs: u64,
    /// How often expired sessions are swept
    pub reap_interval_secs: u64,
    /// Timeout for every outbound router call
    pub router_timeout_secs: u64,
    /// `session` (mint own cookies) or `forward` (re-verify caller credentials)
    pub delegation: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: ":8080".to_string(),
            auth_mode: String::new(),
            username: "admin".to_string(),
            password: String::new(),
            rci_url: DEFAULT_RCI_URL.to_string(),
            session_ttl_secs: 86_400,
            cache_ttl_secs: 30,
            reap_interval_secs: 600,
            router_timeout_secs: 5,
            delegation: "session".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `path` (missing file is fine) and the environment
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_string_lossy();
        let file = Config::builder()
            .add_source(File::new(&path, ManagerConf).required(false))
            .build()?;
        let env = Config::builder()
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?;

        // The file uses the init scripts' upper-case keys; fold everything to
        // lower case so file and environment merge on the same key.
        let mut builder = Config::builder();
        for layer in [file, env] {
            for (key, value) in layer.try_deserialize::<HashMap<String, String>>()? {
                builder = builder.set_override(key.to_ascii_lowercase(), value)?;
            }
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Resolve the listen address; `:8080` means all interfaces
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let addr = if self.listen_addr.starts_with(':') {
            format!("0.0.0.0{}", self.listen_addr)
        } else {
            self.listen_addr.clone()
        };
        addr.parse().map_err(|e| {
            ManagerError::config(format!("invalid listen address '{}': {e}", self.listen_addr))
        })
    }

    /// Decide the auth mode and build the immutable auth configuration
    pub fn auth_configuration(&self) -> Result<AuthConfiguration> {
        let delegation = match self.delegation.to_ascii_lowercase().as_str() {
            "" | "session" => Delegation::Session,
            "forward" => Delegation::Forward,
            other => {
                return Err(ManagerError::config(format!(
                    "unknown delegation '{other}', expected 'session' or 'forward'"
                )))
            }
        };

        let mode = match self.auth_mode.to_ascii_lowercase().as_str() {
            "ndm" => {
                info!("Auth mode: NDM (Keenetic router accounts)");
                AuthMode::RouterDelegated
            }
            "local" if self.password.is_empty() => {
                info!("Auth mode: none (AUTH_MODE=local but PASSWORD is empty)");
                AuthMode::None
            }
            "local" => {
                info!("Auth mode: local (static username/password)");
                AuthMode::Local
            }
            "none" | "off" => {
                info!("Auth mode: none (disabled)");
                AuthMode::None
            }
            _ if !self.password.is_empty() => {
                info!("Auth mode: local (auto, PASSWORD is set)");
                AuthMode::Local
            }
            _ => {
                info!("Auth mode: NDM (auto, no PASSWORD configured)");
                AuthMode::RouterDelegated
            }
        };

        Ok(AuthConfiguration {
            mode,
            username: self.username.clone(),
            password: self.password.clone(),
            rci_url: self.rci_url.trim_end_matches('/').to_string(),
            delegation,
            session_ttl: Duration::from_secs(self.session_ttl_secs),
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            reap_interval: Duration::from_secs(self.reap_interval_secs.max(1)),
            router_timeout: Duration::from_secs(self.router_timeout_secs.max(1)),
        })
    }
}
