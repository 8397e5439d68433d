//! Health check and fault-injection endpoints

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::error::FeedError;

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Always fails with a 500, for exercising error paths
pub async fn crash() -> Result<(), FeedError> {
    error!("Crash endpoint invoked");
    Err(FeedError::SimulatedCrash)
}
