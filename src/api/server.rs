//! API server using Axum
//!
//! Serves the health endpoints and both WebSocket endpoints on one port.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::config::Config;
use crate::error::{FeedError, Result};
use crate::feed::ConnectionRegistry;

use super::middleware::{JwtAuth, RequestLogging};
use super::routes;

/// Shared state for handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub jwt_auth: JwtAuth,
    pub registry: Arc<ConnectionRegistry>,
}

/// API server
pub struct ApiServer {
    config: Config,
    state: AppState,
}

impl ApiServer {
    /// Create a new API server
    ///
    /// The registry is shared with the broadcaster, which must be started
    /// separately.
    pub fn new(config: Config, jwt_auth: JwtAuth, registry: Arc<ConnectionRegistry>) -> Self {
        let state = AppState {
            config: config.clone(),
            jwt_auth,
            registry,
        };

        Self { config, state }
    }

    /// Build the router
    pub fn build_router(&self) -> Router {
        routes::create_router(self.state.clone(), &self.config.server.static_dir)
            .layer(axum::middleware::from_fn(RequestLogging::log_request))
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr: SocketAddr = self.config.server_addr().parse().map_err(|_| {
            FeedError::InvalidConfig(format!(
                "Invalid listen address: {}",
                self.config.server_addr()
            ))
        })?;

        Ok(TcpListener::bind(addr).await?)
    }

    /// Run the API server on the configured address
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until shutdown is signalled
    pub async fn serve(
        &self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let router = self.build_router();

        info!("API server listening on {}", listener.local_addr()?);

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            })
            .await
            .map_err(|e| FeedError::Internal(e.to_string()))?;

        info!("API server shut down");
        Ok(())
    }
}
