//! Real-time quote feed
//!
//! Registry of authenticated streaming connections plus the periodic
//! broadcaster that fans quote snapshots out to them.

pub mod broadcast;
pub mod registry;
pub mod source;

pub use broadcast::{Broadcaster, BroadcasterConfig, BroadcasterHandle, TickReport};
pub use registry::{ConnectionId, ConnectionRegistry, Subscriber};
pub use source::{QuoteSource, RandomQuoteSource};
