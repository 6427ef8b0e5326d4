//! Error types for the dashboard relay.

use thiserror::Error;

/// Errors that can occur inside the relay.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Failed to send a frame through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a frame from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed.
    #[error("transport connection closed")]
    TransportClosed,

    /// An outbound message could not be serialized.
    ///
    /// Well-formed snapshots never produce this; seeing it means a bug.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// An inbound frame was not a valid envelope.
    #[error("malformed message: {0}")]
    MalformedMessage(#[source] serde_json::Error),

    /// The relay loop has exited and no longer accepts outbound messages.
    #[error("not connected to dashboard")]
    NotConnected,

    /// The playback engine rejected an operation.
    #[error("player error: {0}")]
    Player(String),

    /// The chat platform rejected an operation.
    #[error("platform error: {0}")]
    Platform(String),

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
