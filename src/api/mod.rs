//! HTTP and WebSocket API
//!
//! Health endpoints plus the token-verification and quote-stream sockets.

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod websocket;

pub use server::{ApiServer, AppState};
