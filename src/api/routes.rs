//! Route definitions

use std::path::Path;

use axum::routing::get;
use axum::Router;
use tower_http::services::ServeDir;
use tracing::debug;

use super::handlers;
use super::server::AppState;
use super::websocket;

/// Create the router with all routes
///
/// `/static` is only mounted when `static_dir` exists.
pub fn create_router(state: AppState, static_dir: &Path) -> Router {
    let router = Router::new()
        .route("/", get(handlers::health::health_check))
        .route("/crash", get(handlers::health::crash))
        // WebSocket endpoints
        .route("/ws/auth", get(websocket::auth::auth_ws))
        .route("/ws/stocks", get(websocket::stocks::stocks_ws))
        .with_state(state);

    if static_dir.is_dir() {
        debug!("Serving static files from {}", static_dir.display());
        router.nest_service("/static", ServeDir::new(static_dir))
    } else {
        debug!("Static directory {} not found, /static disabled", static_dir.display());
        router
    }
}
