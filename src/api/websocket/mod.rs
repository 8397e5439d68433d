//! WebSocket handlers
//!
//! Both endpoints share the same handshake: the first frame a client sends
//! is its token. A bad or expired token gets the error text back followed by
//! a policy-violation close.

pub mod auth;
pub mod stocks;
pub mod subscriber;

use std::borrow::Cow;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::time::timeout;
use tracing::debug;

use crate::api::server::AppState;
use crate::error::{FeedError, Result};

pub use subscriber::WsSubscriber;

/// Upper bound on writing a rejection or close frame to a peer
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Wait for the token frame
///
/// Pings and pongs are skipped. Binary frames are accepted if they hold
/// UTF-8. A close frame or end of stream is a transport disconnect.
pub async fn receive_token<S>(receiver: &mut S, wait: Option<Duration>) -> Result<String>
where
    S: Stream<Item = std::result::Result<Message, axum::Error>> + Unpin,
{
    let next_token = async {
        loop {
            match receiver.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Binary(bytes))) => {
                    return String::from_utf8(bytes).map_err(|_| FeedError::InvalidCredential)
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | None => return Err(FeedError::TransportDisconnect),
                Some(Err(e)) => {
                    debug!("WebSocket error before token: {}", e);
                    return Err(FeedError::TransportDisconnect);
                }
            }
        }
    };

    match wait {
        Some(limit) => timeout(limit, next_token)
            .await
            .map_err(|_| FeedError::TokenTimeout)?,
        None => next_token.await,
    }
}

/// Receive the token frame and verify it, returning the subject
pub async fn authenticate<S>(receiver: &mut S, state: &AppState) -> Result<String>
where
    S: Stream<Item = std::result::Result<Message, axum::Error>> + Unpin,
{
    let token = receive_token(receiver, state.config.auth.token_receive_timeout()).await?;
    state.jwt_auth.verify(&token)
}

/// Send the failure reason, then close with 1008
pub async fn reject<S>(sender: &mut S, err: &FeedError)
where
    S: Sink<Message> + Unpin,
{
    let reason = err.to_string();
    match timeout(CLOSE_TIMEOUT, sender.send(Message::Text(reason.clone()))).await {
        Ok(_) => close(sender, close_code::POLICY, reason).await,
        Err(_) => debug!("Peer stalled, rejection not delivered: {}", reason),
    }
}

/// Send a close frame, giving up after `CLOSE_TIMEOUT`
///
/// A peer that is already gone or never drains its socket is ignored.
pub async fn close<S>(sender: &mut S, code: u16, reason: impl Into<String>)
where
    S: Sink<Message> + Unpin,
{
    let frame = CloseFrame {
        code,
        reason: Cow::Owned(reason.into()),
    };
    if timeout(CLOSE_TIMEOUT, sender.send(Message::Close(Some(frame))))
        .await
        .is_err()
    {
        debug!("Peer stalled, close frame ({}) not delivered", code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use parking_lot::Mutex;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};

    /// Peer whose socket never drains
    pub(super) struct StalledSink;

    impl Sink<Message> for StalledSink {
        type Error = String;

        fn poll_ready(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<std::result::Result<(), String>> {
            Poll::Pending
        }

        fn start_send(self: Pin<&mut Self>, _item: Message) -> std::result::Result<(), String> {
            Ok(())
        }

        fn poll_flush(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<std::result::Result<(), String>> {
            Poll::Pending
        }

        fn poll_close(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<std::result::Result<(), String>> {
            Poll::Pending
        }
    }

    /// Records frames; optionally fails every text frame like a broken pipe
    pub(super) struct RecordingSink {
        frames: Arc<Mutex<Vec<Message>>>,
        reject_text: bool,
    }

    impl RecordingSink {
        pub(super) fn rejecting_text() -> Self {
            Self {
                frames: Arc::new(Mutex::new(Vec::new())),
                reject_text: true,
            }
        }

        pub(super) fn frames(&self) -> Arc<Mutex<Vec<Message>>> {
            self.frames.clone()
        }
    }

    impl Sink<Message> for RecordingSink {
        type Error = String;

        fn poll_ready(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<std::result::Result<(), String>> {
            Poll::Ready(Ok(()))
        }

        fn start_send(self: Pin<&mut Self>, item: Message) -> std::result::Result<(), String> {
            if self.reject_text && matches!(item, Message::Text(_)) {
                return Err("broken pipe".to_string());
            }
            self.frames.lock().push(item);
            Ok(())
        }

        fn poll_flush(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<std::result::Result<(), String>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<std::result::Result<(), String>> {
            Poll::Ready(Ok(()))
        }
    }

    fn frames(
        messages: Vec<Message>,
    ) -> impl Stream<Item = std::result::Result<Message, axum::Error>> + Unpin {
        stream::iter(messages.into_iter().map(Ok))
    }

    #[tokio::test]
    async fn test_receive_token_text() {
        let mut rx = frames(vec![Message::Text("abc".into())]);
        assert_eq!(receive_token(&mut rx, None).await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_receive_token_skips_pings() {
        let mut rx = frames(vec![
            Message::Ping(vec![1]),
            Message::Pong(vec![2]),
            Message::Binary(b"abc".to_vec()),
        ]);
        assert_eq!(receive_token(&mut rx, None).await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_receive_token_invalid_utf8() {
        let mut rx = frames(vec![Message::Binary(vec![0xff, 0xfe])]);
        let err = receive_token(&mut rx, None).await.unwrap_err();
        assert!(matches!(err, FeedError::InvalidCredential));
    }

    #[tokio::test]
    async fn test_receive_token_close_is_disconnect() {
        let mut rx = frames(vec![Message::Close(None)]);
        let err = receive_token(&mut rx, None).await.unwrap_err();
        assert!(matches!(err, FeedError::TransportDisconnect));

        let mut empty = frames(vec![]);
        let err = receive_token(&mut empty, None).await.unwrap_err();
        assert!(matches!(err, FeedError::TransportDisconnect));
    }

    #[tokio::test]
    async fn test_receive_token_timeout() {
        let mut rx = stream::pending::<std::result::Result<Message, axum::Error>>();
        let err = receive_token(&mut rx, Some(Duration::from_millis(20)))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::TokenTimeout));
    }

    #[tokio::test]
    async fn test_reject_sends_reason_then_policy_close() {
        let mut sent: Vec<Message> = Vec::new();
        reject(&mut sent, &FeedError::ExpiredCredential).await;

        assert_eq!(sent.len(), 2);
        assert!(matches!(&sent[0], Message::Text(t) if t == "Token has expired"));
        match &sent[1] {
            Message::Close(Some(frame)) => {
                assert_eq!(frame.code, close_code::POLICY);
                assert_eq!(frame.reason, "Token has expired");
            }
            other => panic!("expected close frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reject_gives_up_on_stalled_peer() {
        let mut sink = StalledSink;
        let rejected = tokio::time::timeout(
            CLOSE_TIMEOUT * 3,
            reject(&mut sink, &FeedError::InvalidCredential),
        )
        .await;
        assert!(rejected.is_ok(), "reject hung on a stalled peer");
    }

    #[tokio::test]
    async fn test_close_gives_up_on_stalled_peer() {
        let mut sink = StalledSink;
        let closed =
            tokio::time::timeout(CLOSE_TIMEOUT * 3, close(&mut sink, close_code::POLICY, "bye"))
                .await;
        assert!(closed.is_ok(), "close hung on a stalled peer");
    }
}
