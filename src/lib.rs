//! Tickerfeed - Real-time Quote Feed
//!
//! A small WebSocket server that pushes simulated stock quotes to
//! authenticated clients.
//!
//! ## Features
//!
//! - JWT (HS256) token verification as the first WebSocket frame
//! - `/ws/auth` one-shot token check and `/ws/stocks` quote stream
//! - Shared connection registry with per-connection failure isolation
//! - Periodic concurrent fan-out of one serialized snapshot per tick

pub mod api;
pub mod config;
pub mod error;
pub mod feed;
pub mod models;

pub use config::Config;
pub use error::{FeedError, Result};
