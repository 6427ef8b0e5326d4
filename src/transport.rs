//! Transport abstraction for the dashboard connection.
//!
//! The [`Transport`] trait is a bidirectional text-frame channel. Unlike a
//! fire-and-forget client, the relay reconnects on its own, so connection
//! setup is a trait too: a [`Connector`] opens a fresh [`Transport`] for
//! every attempt, always against the same address.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use kalliope_relay::close_code::CloseCode;
//! use kalliope_relay::error::RelayError;
//! use kalliope_relay::transport::{Transport, TransportEvent};
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), RelayError> {
//!         // Send one JSON text frame
//!         todo!()
//!     }
//!
//!     async fn recv(&mut self) -> Result<TransportEvent, RelayError> {
//!         // Wait for the next text frame or the closure
//!         todo!()
//!     }
//!
//!     async fn close(&mut self, code: CloseCode, reason: &str) -> Result<(), RelayError> {
//!         // Send a close frame with `code`
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::close_code::CloseCode;
use crate::error::RelayError;

/// What [`Transport::recv`] observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One complete text frame.
    Message(String),
    /// The connection ended with the given code.
    Closed { code: CloseCode, reason: String },
}

/// A bidirectional text-frame transport to the dashboard.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) **MUST** be cancel-safe because the relay
/// polls it inside `tokio::select!`. Dropping an unfinished `recv` future
/// must not lose a frame.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::TransportSend`] if the frame could not be
    /// written, or [`RelayError::TransportClosed`] after [`close`](Transport::close).
    async fn send(&mut self, message: String) -> Result<(), RelayError>;

    /// Receive the next text frame.
    ///
    /// Non-text frames are skipped by the implementation. A connection that
    /// drops without a close frame reports [`CloseCode::Abnormal`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::TransportReceive`] on a read failure; the relay
    /// treats it as an abnormal closure.
    async fn recv(&mut self) -> Result<TransportEvent, RelayError>;

    /// Close the connection with `code`.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails. Implementations should
    /// still release resources in that case.
    async fn close(&mut self, code: CloseCode, reason: &str) -> Result<(), RelayError>;
}

/// Opens transports to the dashboard.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport;

    /// Perform the handshake with `url`.
    ///
    /// # Errors
    ///
    /// Any error counts as a failed handshake and schedules a retry.
    async fn connect(&self, url: &str) -> Result<Self::Transport, RelayError>;
}
