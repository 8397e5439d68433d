//! Stock quote streaming endpoint
//!
//! After the token verifies, the connection joins the registry and the
//! broadcaster pushes quote snapshots to it. This task only waits for the
//! client to leave (or for the broadcaster to evict it) and then cleans up.

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::{close_code, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tracing::{debug, info, warn};

use super::{authenticate, reject, WsSubscriber};
use crate::api::server::AppState;
use crate::error::FeedError;
use crate::feed::{ConnectionRegistry, Subscriber};

/// Reply sent after a token verifies
pub fn welcome_message(subject: &str) -> String {
    format!("Welcome {}, connected to stock updates.", subject)
}

/// WebSocket handler for the quote stream
pub async fn stocks_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_stocks_ws(socket, state))
}

/// Handle WebSocket connection for the quote stream
async fn handle_stocks_ws(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let subject = match authenticate(&mut receiver, &state).await {
        Ok(subject) => subject,
        Err(FeedError::TransportDisconnect) => {
            debug!("Stocks WebSocket disconnected before sending a token");
            return;
        }
        Err(e) if e.is_credential_error() => {
            info!("Stocks WebSocket rejected: {}", e);
            reject(&mut sender, &e).await;
            return;
        }
        Err(e) => {
            warn!("Stocks WebSocket failed before verification: {}", e);
            reject(&mut sender, &e).await;
            return;
        }
    };

    if sender
        .send(Message::Text(welcome_message(&subject)))
        .await
        .is_err()
    {
        debug!(subject = %subject, "Stocks WebSocket closed before welcome was sent");
        return;
    }

    let conn = Arc::new(WsSubscriber::new(subject, sender));
    stream_quotes(&mut receiver, conn, &state.registry).await;
}

/// Keep `conn` registered until the client leaves or the broadcaster
/// evicts it, then unregister and close with 1008
async fn stream_quotes<R, S>(
    receiver: &mut R,
    conn: Arc<WsSubscriber<S>>,
    registry: &ConnectionRegistry,
) -> &'static str
where
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Display,
{
    registry.register(conn.clone());
    info!(
        connection = %conn.id(),
        subject = conn.subject(),
        clients = registry.len(),
        "Stocks WebSocket registered"
    );

    let reason = tokio::select! {
        reason = wait_for_disconnect(receiver) => reason,
        _ = conn.closed() => "evicted after failed send",
    };

    registry.unregister(conn.id());
    conn.close(close_code::POLICY, "Connection closed").await;

    info!(
        connection = %conn.id(),
        subject = conn.subject(),
        reason,
        "Stocks WebSocket disconnected"
    );
    reason
}

/// Drain inbound frames until the client goes away
async fn wait_for_disconnect<S>(receiver: &mut S) -> &'static str
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Close(_)) => return "client closed",
            Ok(_) => {
                // Inbound frames carry nothing once streaming
            }
            Err(e) => {
                debug!("Stocks WebSocket error: {}", e);
                return "transport error";
            }
        }
    }
    "stream ended"
}
