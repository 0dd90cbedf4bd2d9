//! TrustTunnel manager - main entry point
//!
//! Reads `manager.conf`, picks the auth mode, resolves the router's auth
//! endpoint if router-delegated auth is active, and serves the management API
//! until Ctrl+C or SIGTERM.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use trusttunnel_manager::{
    config::DEFAULT_CONFIG_PATH,
    logging::{init_logging, LogConfig},
    ApiServer, AuthGateway, Result, ServerConfig,
};

/// TrustTunnel manager configuration
#[derive(Parser, Debug)]
#[command(name = "trusttunnel-manager")]
#[command(about = "Local management API for the TrustTunnel VPN client")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Listen address (`host:port` or `:port`), overrides LISTEN_ADDR
    #[arg(long)]
    addr: Option<String>,

    /// Manager config file
    #[arg(long, env = "TT_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Also write logs to this file (rotated daily)
    #[arg(long, env = "TT_LOG_FILE")]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn log_config(&self) -> LogConfig {
        LogConfig {
            debug: self.debug,
            json: self.log_json,
            file_path: self.log_file.clone(),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.log_config())?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "Starting TrustTunnel manager"
    );

    let mut config = ServerConfig::load(&cli.config)?;
    if let Some(addr) = cli.addr {
        config.listen_addr = addr;
    }
    let addr = config.socket_addr()?;
    let auth = config.auth_configuration()?;

    let gateway = Arc::new(AuthGateway::from_config(&auth).await?);
    if gateway.router_target_degraded() {
        warn!(
            router = gateway.router_url().unwrap_or_default(),
            "Router address discovery failed, router logins may not work"
        );
    }
    ApiServer::new(addr, gateway.clone())
        .serve(shutdown_signal())
        .await?;

    gateway.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutting down...");
}
