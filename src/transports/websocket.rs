//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! Both `ws://` and `wss://` URLs are supported; TLS is handled by
//! [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream).
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), kalliope_relay::RelayError> {
//! use kalliope_relay::close_code::CloseCode;
//! use kalliope_relay::transport::{Transport, TransportEvent};
//! use kalliope_relay::WebSocketTransport;
//!
//! let mut transport = WebSocketTransport::connect("ws://localhost:8080").await?;
//! transport.send(r#"{"type":"clientData","guilds":[],"users":0}"#.to_string()).await?;
//!
//! if let TransportEvent::Message(text) = transport.recv().await? {
//!     println!("received: {text}");
//! }
//!
//! transport.close(CloseCode::Normal, "done").await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message};

use crate::close_code::CloseCode;
use crate::error::RelayError;
use crate::transport::{Connector, Transport, TransportEvent};

/// Type alias for the underlying WebSocket stream.
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`Transport`] backed by a WebSocket connection.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) is cancel-safe: dropping its future before it
/// completes does not consume a frame.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Open a WebSocket connection to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Io`] if the URL is invalid or the handshake
    /// fails. An underlying I/O error keeps its
    /// [`ErrorKind`](std::io::ErrorKind); everything else maps to
    /// [`ErrorKind::Other`](std::io::ErrorKind::Other).
    pub async fn connect(url: &str) -> Result<Self, RelayError> {
        tracing::debug!(url = %url, "connecting to dashboard");

        let (stream, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            let kind = match &e {
                tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
                _ => std::io::ErrorKind::Other,
            };
            RelayError::Io(std::io::Error::new(kind, e))
        })?;

        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-established WebSocket stream.
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), RelayError> {
        if self.closed {
            return Err(RelayError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| RelayError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Result<TransportEvent, RelayError> {
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => return Err(RelayError::TransportReceive(e.to_string())),
                None => {
                    return Ok(TransportEvent::Closed {
                        code: CloseCode::Abnormal,
                        reason: "stream ended without a close frame".into(),
                    })
                }
            };

            match msg {
                Message::Text(text) => return Ok(TransportEvent::Message(text.to_string())),
                Message::Close(Some(frame)) => {
                    tracing::debug!(?frame, "received close frame");
                    return Ok(TransportEvent::Closed {
                        code: CloseCode::from(u16::from(frame.code)),
                        reason: frame.reason.to_string(),
                    });
                }
                Message::Close(None) => {
                    return Ok(TransportEvent::Closed {
                        code: CloseCode::NoStatus,
                        reason: String::new(),
                    });
                }
                Message::Ping(_) | Message::Pong(_) => {
                    // tungstenite answers pings itself.
                }
                Message::Binary(_) => {
                    tracing::warn!("received binary frame, protocol is text-only; skipping");
                }
                Message::Frame(_) => {
                    tracing::debug!("received raw frame, skipping");
                }
            }
        }
    }

    async fn close(&mut self, code: CloseCode, reason: &str) -> Result<(), RelayError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let frame = CloseFrame {
            code: WsCloseCode::from(u16::from(code)),
            reason: reason.to_owned().into(),
        };
        self.stream
            .close(Some(frame))
            .await
            .map_err(|e| RelayError::TransportSend(e.to_string()))
    }
}

/// [`Connector`] that opens a [`WebSocketTransport`] per attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn connect(&self, url: &str) -> Result<WebSocketTransport, RelayError> {
        WebSocketTransport::connect(url).await
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;

    #[test]
    fn websocket_transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
    }

    #[tokio::test]
    async fn connect_fails_with_invalid_url() {
        let err = WebSocketTransport::connect("not-a-valid-url")
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Io(_)));
    }

    #[tokio::test]
    async fn connector_fails_with_unreachable_host() {
        let err = WebSocketConnector
            .connect("ws://127.0.0.1:1")
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Io(_)));
    }

    // ── Mock-server helpers ──────────────────────────────────────────────

    /// Start a local WebSocket server that runs `handler` on the accepted
    /// connection and returns the address to connect to.
    async fn start_mock_server<F, Fut>(handler: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        format!("ws://{addr}")
    }

    fn close_frame(code: u16, reason: &str) -> CloseFrame {
        CloseFrame {
            code: WsCloseCode::from(code),
            reason: reason.to_owned().into(),
        }
    }

    // ── Mock-server tests ────────────────────────────────────────────────

    #[tokio::test]
    async fn recv_receives_text_frames() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Text("hello".into())).await.unwrap();
            ws.send(Message::Text("world".into())).await.unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert_eq!(
            transport.recv().await.unwrap(),
            TransportEvent::Message("hello".into())
        );
        assert_eq!(
            transport.recv().await.unwrap(),
            TransportEvent::Message("world".into())
        );
    }

    #[tokio::test]
    async fn recv_reports_normal_closure_code() {
        let url = start_mock_server(|mut ws| async move {
            ws.close(Some(close_frame(1000, "bye"))).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        match transport.recv().await.unwrap() {
            TransportEvent::Closed { code, reason } => {
                assert_eq!(code, CloseCode::Normal);
                assert_eq!(reason, "bye");
            }
            other => panic!("expected Closed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn recv_reports_abnormal_closure_code() {
        let url = start_mock_server(|mut ws| async move {
            ws.close(Some(close_frame(1011, "oops"))).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        match transport.recv().await.unwrap() {
            TransportEvent::Closed { code, .. } => assert_eq!(code, CloseCode::Error),
            other => panic!("expected Closed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn recv_skips_binary_frames() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(Message::Text("after_binary".into())).await.unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert_eq!(
            transport.recv().await.unwrap(),
            TransportEvent::Message("after_binary".into())
        );
    }

    #[tokio::test]
    async fn close_sends_requested_code() {
        let (code_tx, code_rx) = tokio::sync::oneshot::channel();
        let url = start_mock_server(|mut ws| async move {
            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Close(frame) = msg {
                    let _ = code_tx.send(frame.map(|f| u16::from(f.code)));
                    break;
                }
            }
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport
            .close(CloseCode::Normal, "Socket closed by client.")
            .await
            .unwrap();
        assert_eq!(code_rx.await.unwrap(), Some(1000));
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let url = start_mock_server(|mut ws| async move {
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close(CloseCode::Normal, "").await.unwrap();
        // Closing twice is fine.
        transport.close(CloseCode::Normal, "").await.unwrap();

        let err = transport.send("oops".to_string()).await.unwrap_err();
        assert!(matches!(err, RelayError::TransportClosed));
    }

    #[tokio::test]
    async fn send_round_trip() {
        let url = start_mock_server(|mut ws| async move {
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                ws.send(Message::Text(text)).await.unwrap();
            }
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.send("echo".to_string()).await.unwrap();
        assert_eq!(
            transport.recv().await.unwrap(),
            TransportEvent::Message("echo".into())
        );
    }
}
