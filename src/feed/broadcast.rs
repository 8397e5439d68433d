//! Periodic quote broadcaster
//!
//! Every tick takes a registry snapshot, generates one payload, serializes
//! it once and sends it to every member concurrently. A recipient whose send
//! fails or times out is evicted after the tick; the others are unaffected.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use super::registry::{ConnectionId, ConnectionRegistry, Subscriber};
use super::source::QuoteSource;
use crate::config::FeedConfig;
use crate::error::{FeedError, Result};

/// Broadcaster configuration
#[derive(Debug, Clone)]
pub struct BroadcasterConfig {
    /// Time between ticks
    pub tick_interval: Duration,
    /// Upper bound on a single recipient's send
    pub send_timeout: Duration,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(2),
            send_timeout: Duration::from_secs(1),
        }
    }
}

impl From<&FeedConfig> for BroadcasterConfig {
    fn from(config: &FeedConfig) -> Self {
        Self {
            tick_interval: config.interval(),
            send_timeout: config.send_timeout(),
        }
    }
}

/// Outcome of one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Members in the snapshot
    pub attempted: usize,
    /// Sends that completed
    pub delivered: usize,
    /// Members removed because their send failed
    pub evicted: Vec<ConnectionId>,
}

/// Pushes quote snapshots to every registered connection
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
    source: Arc<dyn QuoteSource>,
    config: BroadcasterConfig,
}

impl Broadcaster {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        source: Arc<dyn QuoteSource>,
        config: BroadcasterConfig,
    ) -> Self {
        Self {
            registry,
            source,
            config,
        }
    }

    /// Run the broadcast loop (call in a spawned task)
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting broadcaster ({} source, {}ms interval)",
            self.source.source_name(),
            self.config.tick_interval.as_millis()
        );

        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // Skip immediate tick

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("Broadcast tick failed: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    // A dropped handle also stops the loop
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Broadcaster shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Perform one snapshot + fan-out cycle
    pub async fn tick(&self) -> Result<TickReport> {
        let members = self.registry.snapshot();
        if members.is_empty() {
            return Ok(TickReport::default());
        }

        let payload = self.source.snapshot().to_json()?;
        let report = self.fan_out(&members, &payload).await;

        debug!(
            attempted = report.attempted,
            delivered = report.delivered,
            evicted = report.evicted.len(),
            "Broadcast tick complete"
        );

        Ok(report)
    }

    /// Deliver `payload` to every member concurrently, then evict failures
    async fn fan_out(&self, members: &[Arc<dyn Subscriber>], payload: &str) -> TickReport {
        let send_timeout = self.config.send_timeout;

        let sends = members.iter().map(|member| async move {
            let result = match timeout(send_timeout, member.send(payload)).await {
                Ok(result) => result,
                Err(_) => Err(FeedError::SendTimeout),
            };
            (member, result)
        });

        let mut report = TickReport {
            attempted: members.len(),
            ..TickReport::default()
        };

        for (member, result) in join_all(sends).await {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    if matches!(e, FeedError::TransportDisconnect) {
                        // Closed by its handler after this snapshot was taken
                        debug!(
                            connection = %member.id(),
                            subject = member.subject(),
                            "Dropping departed connection"
                        );
                    } else {
                        warn!(
                            connection = %member.id(),
                            subject = member.subject(),
                            "Evicting connection after failed send: {}",
                            e
                        );
                    }
                    self.registry.unregister(member.id());
                    member.on_evicted();
                    report.evicted.push(member.id());
                }
            }
        }

        report
    }
}

/// Handle for stopping the broadcaster
pub struct BroadcasterHandle {
    shutdown_tx: watch::Sender<bool>,
}

impl BroadcasterHandle {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { shutdown_tx: tx }, rx)
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Default for BroadcasterHandle {
    fn default() -> Self {
        Self::new().0
    }
}
