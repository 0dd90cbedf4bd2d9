//! HTTP management API
//!
//! `/api/auth/*` is public. Everything else under `/api` sits behind
//! [`middleware::require_auth`], including any routes the embedding process
//! mounts with [`ApiServer::with_routes`].

pub mod handlers;
pub mod middleware;

use crate::auth::AuthGateway;
use crate::error::{ManagerError, Result};
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared state for every handler
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<AuthGateway>,
}

/// Build the API router.
///
/// `extra` routes are mounted as given (full paths) behind the auth middleware.
pub fn build_router(gateway: Arc<AuthGateway>, extra: Option<Router<AppState>>) -> Router {
    let state = AppState { gateway };

    let public_routes = Router::new()
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/auth/check", get(handlers::check));

    let mut protected_routes = Router::new().route("/api/system", get(handlers::system_info));
    if let Some(extra) = extra {
        protected_routes = protected_routes.merge(extra);
    }
    let protected_routes = protected_routes.route_layer(axum::middleware::from_fn_with_state(
        state.clone(),
        middleware::require_auth,
    ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(axum::middleware::from_fn(middleware::log_requests))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The manager's HTTP server
pub struct ApiServer {
    addr: SocketAddr,
    gateway: Arc<AuthGateway>,
    extra: Option<Router<AppState>>,
}

impl ApiServer {
    pub fn new(addr: SocketAddr, gateway: Arc<AuthGateway>) -> Self {
        Self {
            addr,
            gateway,
            extra: None,
        }
    }

    /// Mount additional management routes behind the auth middleware
    pub fn with_routes(mut self, routes: Router<AppState>) -> Self {
        self.extra = Some(match self.extra.take() {
            Some(existing) => existing.merge(routes),
            None => routes,
        });
        self
    }

    pub fn router(&self) -> Router {
        build_router(self.gateway.clone(), self.extra.clone())
    }

    /// Bind and serve until `shutdown` resolves
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await.map_err(|e| {
            ManagerError::config(format!("failed to bind {}: {e}", self.addr))
        })?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let local_addr = listener.local_addr()?;
        info!(
            addr = %local_addr,
            auth_mode = %self.gateway.mode(),
            "Management API listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Management API stopped");
        Ok(())
    }
}
