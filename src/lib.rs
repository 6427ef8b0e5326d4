//! # Kalliope Relay
//!
//! Keeps the Kalliope web dashboard in sync with the bot's music players.
//!
//! The relay holds one persistent connection to the dashboard. Over it the
//! bot pushes a `playerData` snapshot whenever a guild's playback changes,
//! and receives commands (pause, skip, play, …) that it applies to the
//! right player before pushing the result back. Lost connections are
//! re-established with exponential backoff.
//!
//! ## Features
//!
//! - **Transport-agnostic**: implement [`Transport`] and [`Connector`] for any backend
//! - **WebSocket built-in**: the default `transport-websocket` feature provides `WebSocketConnector`
//! - **Event-driven**: observe the connection lifecycle through [`RelayEvent`]s
//!
//! The playback engine and the chat platform stay outside the crate; the
//! relay reaches them only through the [`Player`], [`PlayerRegistry`] and
//! [`ChatPlatform`] traits.

pub mod backoff;
pub mod close_code;
pub mod codec;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod platform;
pub mod player;
pub mod protocol;
pub mod relay;
pub mod snapshot;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use close_code::CloseCode;
pub use codec::Codec;
pub use dispatch::{ActionDispatcher, Outcome};
pub use error::RelayError;
pub use event::RelayEvent;
pub use platform::{ChatPlatform, Notice};
pub use player::{Player, PlayerRegistry};
pub use protocol::{Command, Envelope, InboundMessage, OutboundMessage, PlayerSnapshot};
pub use relay::{Collaborators, ConnectionState, Outbox, Relay, RelayConfig};
pub use transport::{Connector, Transport, TransportEvent};

#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnector, WebSocketTransport};
