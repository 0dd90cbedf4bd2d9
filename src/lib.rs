//! TrustTunnel manager: local management API for the TrustTunnel VPN client
//! on Keenetic routers
//!
//! The interesting part is the router-delegated authentication gateway: the
//! manager never stores the router owner's credentials and instead asks the
//! router firmware (NDM) to vouch for them.
//!
//! # Features
//!
//! - Three auth modes: none, static local credentials, router-delegated
//! - NDM challenge-response login (`X-NDM-Realm` / `X-NDM-Challenge`)
//! - Gateway-issued sessions with expiry and a background reaper
//! - Forward delegation with a short-lived verification cache
//! - LAN address discovery through the router's RCI API

// Core modules
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod ndm;
pub mod server;

// Re-export main types for convenience
pub use auth::{AuthGateway, AuthMode};
pub use config::ServerConfig;
pub use error::{ManagerError, Result};
pub use server::ApiServer;
