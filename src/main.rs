//! Tickerfeed Server - Entry Point
//!
//! Starts the API server and the quote broadcaster with graceful shutdown
//! support.

use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tickerfeed::api::middleware::JwtAuth;
use tickerfeed::api::ApiServer;
use tickerfeed::config::{Config, LogConfig};
use tickerfeed::feed::{
    Broadcaster, BroadcasterConfig, BroadcasterHandle, ConnectionRegistry, RandomQuoteSource,
};

#[tokio::main]
async fn main() -> tickerfeed::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    init_tracing(&config.log);
    info!("Starting Tickerfeed server");

    if config.auth.jwt_secret.is_empty() {
        info!("JWT_SECRET not set, using a random per-process secret");
    }
    let jwt_auth = JwtAuth::from_config(&config.auth)?;

    // Registry shared by the streaming handler and the broadcaster
    let registry = Arc::new(ConnectionRegistry::new());

    // Start broadcaster
    let (broadcaster_handle, broadcaster_shutdown) = BroadcasterHandle::new();
    let broadcaster = Broadcaster::new(
        registry.clone(),
        Arc::new(RandomQuoteSource::from_config(&config.feed)),
        BroadcasterConfig::from(&config.feed),
    );
    let broadcaster_task = tokio::spawn(async move {
        broadcaster.run(broadcaster_shutdown).await;
    });

    // Start API server
    let (shutdown_tx, api_shutdown) = watch::channel(false);
    let api_server = ApiServer::new(config.clone(), jwt_auth, registry);
    let api_task = tokio::spawn(async move {
        if let Err(e) = api_server.run(api_shutdown).await {
            error!("API server error: {}", e);
        }
    });

    info!("Server started on {}", config.server_addr());

    // Wait for shutdown signal
    shutdown_signal().await;
    info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    broadcaster_handle.shutdown();

    let _ = tokio::join!(api_task, broadcaster_task);

    info!("Tickerfeed server stopped");
    Ok(())
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `LOG_LEVEL`.
fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("tickerfeed={},tower_http=debug", log.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    if log.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
}
