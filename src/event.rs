//! Lifecycle events emitted by the relay.

use std::time::Duration;

use crate::close_code::CloseCode;

/// Observable connection lifecycle changes.
///
/// Events are delivered on a bounded channel. When the consumer falls
/// behind, events are dropped with a warning, except for the final
/// [`Disconnected`](RelayEvent::Disconnected) which is always delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// Handshake succeeded and the identity announcement was queued.
    Connected,
    /// A handshake attempt failed.
    ConnectFailed { reason: String },
    /// An established connection was lost. A reconnect follows unless
    /// `code` is the normal closure.
    ConnectionLost { code: CloseCode, reason: String },
    /// A reconnect attempt was scheduled.
    ReconnectScheduled {
        /// 1-based count of consecutive failures.
        attempt: u32,
        /// Backoff delay without jitter.
        delay: Duration,
        jitter: Duration,
    },
    /// The relay stopped for good (shutdown or normal closure).
    Disconnected { reason: Option<String> },
}
