//! Token verification endpoint
//!
//! Verifies the token sent as the first frame, answers once and closes.

use axum::extract::ws::{close_code, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use super::{authenticate, close, reject};
use crate::api::server::AppState;
use crate::error::FeedError;

/// Reply sent after a token verifies
pub fn welcome_message(subject: &str) -> String {
    format!("Welcome {}, token verified successfully!", subject)
}

/// WebSocket handler for one-shot token verification
pub async fn auth_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_auth_ws(socket, state))
}

/// Handle WebSocket connection for token verification
async fn handle_auth_ws(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    match authenticate(&mut receiver, &state).await {
        Ok(subject) => {
            info!(subject = %subject, "Auth WebSocket token verified");
            if sender
                .send(Message::Text(welcome_message(&subject)))
                .await
                .is_err()
            {
                debug!("Auth WebSocket closed before welcome was sent");
                return;
            }
            close(&mut sender, close_code::NORMAL, "").await;
        }
        Err(FeedError::TransportDisconnect) => {
            debug!("Auth WebSocket disconnected before sending a token");
        }
        Err(e) if e.is_credential_error() => {
            info!("Auth WebSocket rejected: {}", e);
            reject(&mut sender, &e).await;
        }
        Err(e) => {
            warn!("Auth WebSocket failed before verification: {}", e);
            reject(&mut sender, &e).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welcome_message() {
        assert_eq!(
            welcome_message("u1"),
            "Welcome u1, token verified successfully!"
        );
    }
}
