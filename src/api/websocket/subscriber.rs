//! Registry member backed by a live WebSocket
//!
//! Owns the write half of the socket. The handler task keeps the read half
//! and waits on `closed()` so it wakes as soon as the broadcaster gives up
//! on this connection.

use axum::extract::ws::{Message, WebSocket};
use async_trait::async_trait;
use futures::stream::SplitSink;
use futures::SinkExt;
use tokio::sync::{watch, Mutex};
use tokio::time::timeout;
use tracing::debug;

use super::CLOSE_TIMEOUT;

use crate::error::{FeedError, Result};
use crate::feed::{ConnectionId, Subscriber};

/// Write half of an authenticated streaming connection
pub struct WsSubscriber<S = SplitSink<WebSocket, Message>> {
    id: ConnectionId,
    subject: String,
    sink: Mutex<S>,
    closed_tx: watch::Sender<bool>,
}

impl<S> WsSubscriber<S>
where
    S: futures::Sink<Message> + Unpin + Send,
    S::Error: std::fmt::Display,
{
    pub fn new(subject: impl Into<String>, sink: S) -> Self {
        let (closed_tx, _) = watch::channel(false);
        Self {
            id: ConnectionId::new(),
            subject: subject.into(),
            sink: Mutex::new(sink),
            closed_tx,
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.closed_tx.borrow()
    }

    /// Resolves once the connection has been marked closed
    pub async fn closed(&self) {
        let mut rx = self.closed_tx.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }

    fn mark_closed(&self) {
        self.closed_tx.send_replace(true);
    }

    /// Send a text frame outside the broadcast path
    pub async fn send_text(&self, text: String) -> Result<()> {
        if self.is_closed() {
            return Err(FeedError::TransportDisconnect);
        }

        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(text)).await.map_err(|e| {
            self.mark_closed();
            FeedError::SendFailure(e.to_string())
        })
    }

    /// Send a close frame and mark the connection closed
    ///
    /// Bounded by `CLOSE_TIMEOUT`, including the wait for an in-flight send
    /// to release the sink.
    pub async fn close(&self, code: u16, reason: &str) {
        self.mark_closed();
        let closing = async {
            let mut sink = self.sink.lock().await;
            super::close(&mut *sink, code, reason).await;
        };
        if timeout(CLOSE_TIMEOUT, closing).await.is_err() {
            debug!(connection = %self.id, "Sink busy, close frame dropped");
        }
    }
}

#[async_trait]
impl<S> Subscriber for WsSubscriber<S>
where
    S: futures::Sink<Message> + Unpin + Send,
    S::Error: std::fmt::Display,
{
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn subject(&self) -> &str {
        &self.subject
    }

    async fn send(&self, payload: &str) -> Result<()> {
        self.send_text(payload.to_string()).await
    }

    fn on_evicted(&self) {
        self.mark_closed();
    }
}
