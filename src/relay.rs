//! Persistent connection to the dashboard.
//!
//! [`Relay`] is a thin handle over a background connection loop. The loop
//! owns the only transport, drives the `Disconnected → Connecting →
//! Connected` state machine, sleeps out the reconnect backoff, and hands
//! every inbound command to its own task so one slow engine call never
//! stalls the socket.
//!
//! Anything in the bot that changes playback pushes fresh state through an
//! [`Outbox`], which is cheap to clone and never touches the transport.
//!
//! # Example
//!
//! ```rust,ignore
//! let config = RelayConfig::new(bot_user_id);
//! let collaborators = Collaborators::new(players, platform);
//! let (mut relay, mut events) = Relay::start(WebSocketConnector, config, collaborators);
//!
//! // after a slash command changed the queue:
//! relay.update_player(player.as_ref())?;
//!
//! // on SIGTERM:
//! relay.shutdown().await;
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::backoff::{Backoff, BackoffConfig};
use crate::close_code::CloseCode;
use crate::codec::Codec;
use crate::dispatch::ActionDispatcher;
use crate::error::{RelayError, Result};
use crate::event::RelayEvent;
use crate::platform::ChatPlatform;
use crate::player::{GuildId, Player, PlayerRegistry};
use crate::protocol::{Command, InboundMessage, OutboundMessage};
use crate::snapshot::project;
use crate::transport::{Connector, Transport, TransportEvent};

/// Address of the public dashboard.
pub const DEFAULT_DASHBOARD_URL: &str = "wss://clients.kalliope.cc";

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Default timeout for one handshake attempt.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Close reason sent on an operator-initiated shutdown.
const SHUTDOWN_REASON: &str = "Socket closed by client.";

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`Relay`].
///
/// The only required field is `client_id`, the bot's own user id.
///
/// # Example
///
/// ```
/// use kalliope_relay::relay::RelayConfig;
/// use std::time::Duration;
///
/// let config = RelayConfig::new("1234567890")
///     .with_url("ws://localhost:8080")
///     .with_shutdown_timeout(Duration::from_secs(5));
/// assert_eq!(config.client_id, "1234567890");
/// ```
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Identity stamped on every outbound frame.
    pub client_id: String,
    /// Dashboard address. Every reconnect targets the same address.
    pub url: String,
    /// Capacity of the bounded [`RelayEvent`] channel.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// How long [`Relay::shutdown`] waits for the loop before aborting it.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
    /// Upper bound for one handshake attempt. Defaults to **30 seconds**.
    pub connect_timeout: Duration,
    /// Reconnect delay policy.
    pub backoff: BackoffConfig,
    /// Run inbound commands for the same guild one at a time, in arrival
    /// order. Defaults to `false`: commands run concurrently and ordering
    /// within a guild is left to the playback engine. When enabled, a
    /// guild holds a worker task only while it has commands in flight.
    pub serialize_guild_actions: bool,
}

impl RelayConfig {
    /// Create a configuration with default values.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            url: DEFAULT_DASHBOARD_URL.to_string(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            backoff: BackoffConfig::default(),
            serialize_guild_actions: false,
        }
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    #[must_use]
    pub fn with_guild_serialization(mut self, enabled: bool) -> Self {
        self.serialize_guild_actions = enabled;
        self
    }
}

// ── Collaborators ───────────────────────────────────────────────────

/// The parts of the bot the relay reads from and acts on.
#[derive(Clone)]
pub struct Collaborators {
    pub players: Arc<dyn PlayerRegistry>,
    pub platform: Arc<dyn ChatPlatform>,
}

impl Collaborators {
    pub fn new(players: Arc<dyn PlayerRegistry>, platform: Arc<dyn ChatPlatform>) -> Self {
        Self { players, platform }
    }
}

// ── State ───────────────────────────────────────────────────────────

/// Lifecycle state of the dashboard connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

// ── Outbox ──────────────────────────────────────────────────────────

/// Cloneable sender of outbound state.
///
/// Messages are queued to the connection loop and sent in order. While the
/// relay is between connections they are discarded; the dashboard resyncs
/// from the announcement sent after every handshake.
#[derive(Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<OutboundMessage>,
    collaborators: Collaborators,
}

impl Outbox {
    /// Push a snapshot of `player`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotConnected`] if the relay has stopped.
    pub fn update_player(&self, player: &dyn Player) -> Result<()> {
        self.send(OutboundMessage::PlayerData {
            guild_id: player.guild_id(),
            player: project(Some(player)),
        })
    }

    /// Push a snapshot of whatever player currently serves `guild_id`,
    /// or `null` if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotConnected`] if the relay has stopped.
    pub fn update_guild(&self, guild_id: &str) -> Result<()> {
        let player = self.collaborators.players.lookup(guild_id);
        self.send(OutboundMessage::PlayerData {
            guild_id: guild_id.to_string(),
            player: project(player.as_deref()),
        })
    }

    /// Re-announce the bot's guilds and user count.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotConnected`] if the relay has stopped.
    pub fn update_client_data(&self) -> Result<()> {
        self.send(self.client_data())
    }

    /// Queue an arbitrary outbound message.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotConnected`] if the relay has stopped.
    pub fn send(&self, message: OutboundMessage) -> Result<()> {
        self.tx.send(message).map_err(|_| RelayError::NotConnected)
    }

    fn client_data(&self) -> OutboundMessage {
        let platform = &self.collaborators.platform;
        OutboundMessage::ClientData {
            guilds: platform.guild_ids(),
            users: platform.user_count(),
        }
    }
}

impl std::fmt::Debug for Outbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbox")
            .field("closed", &self.tx.is_closed())
            .finish_non_exhaustive()
    }
}

// ── Relay handle ────────────────────────────────────────────────────

/// Handle to the dashboard connection.
///
/// Created with [`Relay::start`]; there is one per process.
pub struct Relay {
    outbox: Outbox,
    state: Arc<watch::Sender<ConnectionState>>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl Relay {
    /// Start the connection loop and return a handle plus event receiver.
    ///
    /// The first handshake is attempted immediately.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start<C: Connector>(
        connector: C,
        config: RelayConfig,
        collaborators: Collaborators,
    ) -> (Self, mpsc::Receiver<RelayEvent>) {
        let (tx, outbound_rx) = mpsc::unbounded_channel();
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel(capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let state = Arc::new(state_tx);

        let outbox = Outbox {
            tx,
            collaborators: collaborators.clone(),
        };
        let executor = CommandExecutor {
            dispatcher: ActionDispatcher::new(Arc::clone(&collaborators.platform)),
            players: Arc::clone(&collaborators.players),
            outbox: outbox.clone(),
        };

        let connection = ConnectionLoop {
            connector,
            url: config.url,
            connect_timeout: config.connect_timeout,
            codec: Codec::new(config.client_id),
            backoff: Backoff::new(config.backoff),
            outbox: outbox.clone(),
            executor,
            guild_queues: config.serialize_guild_actions.then(GuildQueues::new),
            outbound_rx,
            event_tx,
            state: Arc::clone(&state),
            shutdown_rx,
        };
        let task = tokio::spawn(connection.run());

        let relay = Self {
            outbox,
            state,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };
        (relay, event_rx)
    }

    /// A cloneable sender for other parts of the bot.
    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    /// Push a snapshot of `player` now.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotConnected`] if the relay has stopped.
    pub fn update_player(&self, player: &dyn Player) -> Result<()> {
        self.outbox.update_player(player)
    }

    /// Push a snapshot for `guild_id` now.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotConnected`] if the relay has stopped.
    pub fn update_guild(&self, guild_id: &str) -> Result<()> {
        self.outbox.update_guild(guild_id)
    }

    /// Re-announce the bot's guilds and user count.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotConnected`] if the relay has stopped.
    pub fn update_client_data(&self) -> Result<()> {
        self.outbox.update_client_data()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Subscribe to lifecycle state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Close the connection with the normal closure code and stop
    /// reconnecting.
    pub async fn shutdown(&mut self) {
        debug!("relay shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("connection loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("connection loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("connection loop aborted: {join_err}");
                    }
                }
            }
        }

        self.state.send_replace(ConnectionState::Disconnected);
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("state", &self.state())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        // No executor to drive a close handshake from here; just stop the loop.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Command execution ───────────────────────────────────────────────

/// Runs one inbound command and pushes the resulting state.
#[derive(Clone)]
struct CommandExecutor {
    dispatcher: ActionDispatcher,
    players: Arc<dyn PlayerRegistry>,
    outbox: Outbox,
}

impl CommandExecutor {
    async fn execute(&self, guild_id: GuildId, command: Command) {
        let kind = command.kind();
        let player = self.players.lookup(&guild_id);
        let dispatcher = self.dispatcher.clone();

        // A panicking handler takes down only its own task.
        let handler =
            tokio::spawn(async move { dispatcher.apply(player.as_deref(), &command).await });
        let push = match handler.await {
            Ok(Ok(outcome)) => {
                debug!(guild_id = %guild_id, command = kind, ?outcome, "command handled");
                outcome.pushes_snapshot()
            }
            Ok(Err(e)) => {
                warn!(guild_id = %guild_id, command = kind, "command failed: {e}");
                true
            }
            Err(join_err) => {
                error!(guild_id = %guild_id, command = kind, "command handler crashed: {join_err}");
                true
            }
        };

        if push {
            if let Err(e) = self.outbox.update_guild(&guild_id) {
                debug!(guild_id = %guild_id, "could not queue snapshot: {e}");
            }
        }
    }
}

/// One sequential worker per guild.
///
/// A guild's worker exits once every command submitted to it has finished;
/// its entry is reaped on the next submission, so only guilds with work in
/// flight keep a task alive.
struct GuildQueues {
    queues: HashMap<GuildId, GuildQueue>,
    done_tx: mpsc::UnboundedSender<GuildId>,
    done_rx: mpsc::UnboundedReceiver<GuildId>,
}

struct GuildQueue {
    tx: mpsc::UnboundedSender<Command>,
    /// Commands submitted but not yet reported done.
    pending: usize,
}

impl GuildQueues {
    fn new() -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Self {
            queues: HashMap::new(),
            done_tx,
            done_rx,
        }
    }

    fn submit(&mut self, executor: &CommandExecutor, guild_id: GuildId, mut command: Command) {
        self.reap();

        if let Some(queue) = self.queues.get_mut(&guild_id) {
            match queue.tx.send(command) {
                Ok(()) => {
                    queue.pending += 1;
                    return;
                }
                Err(mpsc::error::SendError(returned)) => command = returned,
            }
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _ = tx.send(command);
        let executor = executor.clone();
        let done_tx = self.done_tx.clone();
        let worker_guild = guild_id.clone();
        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                executor.execute(worker_guild.clone(), command).await;
                let _ = done_tx.send(worker_guild.clone());
            }
        });
        self.queues.insert(guild_id, GuildQueue { tx, pending: 1 });
    }

    /// Drop the senders of guilds whose workers have drained; each worker
    /// then sees its channel close and exits.
    fn reap(&mut self) {
        while let Ok(guild_id) = self.done_rx.try_recv() {
            let drained = match self.queues.get_mut(&guild_id) {
                Some(queue) => {
                    queue.pending = queue.pending.saturating_sub(1);
                    queue.pending == 0
                }
                None => false,
            };
            if drained {
                self.queues.remove(&guild_id);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.queues.len()
    }
}

// ── Connection loop ─────────────────────────────────────────────────

/// Why a connected session ended.
enum SessionEnd {
    Shutdown,
    Closed { code: CloseCode, reason: String },
}

struct ConnectionLoop<C: Connector> {
    connector: C,
    url: String,
    connect_timeout: Duration,
    codec: Codec,
    backoff: Backoff,
    outbox: Outbox,
    executor: CommandExecutor,
    guild_queues: Option<GuildQueues>,
    outbound_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    event_tx: mpsc::Sender<RelayEvent>,
    state: Arc<watch::Sender<ConnectionState>>,
    shutdown_rx: oneshot::Receiver<()>,
}

impl<C: Connector> ConnectionLoop<C> {
    /// Drive the state machine until shutdown or a normal closure.
    ///
    /// This is the only place that sleeps on the backoff, so at most one
    /// reconnect is ever pending.
    async fn run(mut self) {
        debug!(url = %self.url, "connection loop started");

        let reason = loop {
            self.set_state(ConnectionState::Connecting);

            let attempt = tokio::select! {
                _ = &mut self.shutdown_rx => break Some("relay shut down".to_string()),
                attempt = tokio::time::timeout(
                    self.connect_timeout,
                    self.connector.connect(&self.url),
                ) => attempt.unwrap_or(Err(RelayError::Timeout)),
            };

            match attempt {
                Ok(mut transport) => {
                    self.backoff.reset();
                    self.set_state(ConnectionState::Connected);
                    info!(url = %self.url, "opened dashboard connection");
                    emit_event(&self.event_tx, RelayEvent::Connected).await;

                    match self.run_session(&mut transport).await {
                        SessionEnd::Shutdown => {
                            info!("closing dashboard connection");
                            if let Err(e) = transport.close(CloseCode::Normal, SHUTDOWN_REASON).await
                            {
                                debug!("close handshake failed: {e}");
                            }
                            break Some("relay shut down".to_string());
                        }
                        SessionEnd::Closed { code, reason } if code.is_normal() => {
                            info!(%code, reason = %reason, "dashboard closed the connection normally");
                            emit_event(
                                &self.event_tx,
                                RelayEvent::ConnectionLost {
                                    code,
                                    reason: reason.clone(),
                                },
                            )
                            .await;
                            break Some(reason);
                        }
                        SessionEnd::Closed { code, reason } => {
                            error!(%code, reason = %reason, "dashboard connection lost");
                            emit_event(&self.event_tx, RelayEvent::ConnectionLost { code, reason })
                                .await;
                        }
                    }
                }
                Err(e) => {
                    error!(url = %self.url, "dashboard connection failed: {e}");
                    emit_event(
                        &self.event_tx,
                        RelayEvent::ConnectFailed {
                            reason: e.to_string(),
                        },
                    )
                    .await;
                }
            }

            if self.wait_for_retry().await {
                break Some("relay shut down".to_string());
            }
        };

        self.set_state(ConnectionState::Disconnected);
        emit_disconnected(&self.event_tx, reason).await;
        debug!("connection loop exited");
    }

    /// Exchange frames until the connection ends.
    async fn run_session(&mut self, transport: &mut C::Transport) -> SessionEnd {
        let stale = self.discard_outbound();
        if stale > 0 {
            debug!(count = stale, "discarded messages queued while offline");
        }

        let announcement = self.outbox.client_data();
        if let Err(end) = send_message(&self.codec, transport, &announcement).await {
            return end;
        }

        loop {
            tokio::select! {
                _ = &mut self.shutdown_rx => return SessionEnd::Shutdown,

                outbound = self.outbound_rx.recv() => {
                    if let Some(message) = outbound {
                        if let Err(end) = send_message(&self.codec, transport, &message).await {
                            return end;
                        }
                    }
                }

                incoming = transport.recv() => match incoming {
                    Ok(TransportEvent::Message(text)) => self.handle_frame(&text),
                    Ok(TransportEvent::Closed { code, reason }) => {
                        return SessionEnd::Closed { code, reason };
                    }
                    Err(e) => {
                        return SessionEnd::Closed {
                            code: CloseCode::Abnormal,
                            reason: e.to_string(),
                        };
                    }
                },
            }
        }
    }

    /// Decode one inbound frame and hand it off without waiting for it.
    fn handle_frame(&mut self, text: &str) {
        let envelope = match self.codec.decode::<InboundMessage>(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("dropping malformed frame: {e}; raw: {text}");
                return;
            }
        };
        let InboundMessage { guild_id, command } = envelope.message;
        if command == Command::Unknown {
            debug!(guild_id = %guild_id, "ignoring unknown command");
            return;
        }

        match self.guild_queues.as_mut() {
            Some(queues) => queues.submit(&self.executor, guild_id, command),
            None => {
                let executor = self.executor.clone();
                tokio::spawn(async move { executor.execute(guild_id, command).await });
            }
        }
    }

    /// Sleep out the next backoff delay. Returns `true` on shutdown.
    async fn wait_for_retry(&mut self) -> bool {
        // No socket while sleeping; the next attempt is already underway.
        self.set_state(ConnectionState::Connecting);
        let retry = self.backoff.next_retry();
        info!(
            attempt = retry.attempt,
            delay_ms = u64::try_from(retry.base.as_millis()).unwrap_or(u64::MAX),
            jitter_ms = u64::try_from(retry.jitter.as_millis()).unwrap_or(u64::MAX),
            "reconnecting to dashboard after backoff"
        );
        emit_event(
            &self.event_tx,
            RelayEvent::ReconnectScheduled {
                attempt: retry.attempt,
                delay: retry.base,
                jitter: retry.jitter,
            },
        )
        .await;

        let sleep = tokio::time::sleep(retry.delay());
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut self.shutdown_rx => return true,
                () = &mut sleep => return false,
                outbound = self.outbound_rx.recv() => {
                    if let Some(message) = outbound {
                        debug!(guild_id = ?message.guild_id(), "not connected, discarding outbound message");
                    }
                }
            }
        }
    }

    fn discard_outbound(&mut self) -> usize {
        let mut count = 0;
        while self.outbound_rx.try_recv().is_ok() {
            count += 1;
        }
        count
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }
}

/// Encode and send one message. A failed write ends the session.
async fn send_message<T: Transport>(
    codec: &Codec,
    transport: &mut T,
    message: &OutboundMessage,
) -> std::result::Result<(), SessionEnd> {
    let frame = match codec.encode(message) {
        Ok(frame) => frame,
        Err(e) => {
            // Snapshots always serialize; this is a bug, not a transport problem.
            error!(guild_id = ?message.guild_id(), "failed to encode outbound message: {e}");
            return Ok(());
        }
    };
    transport
        .send(frame)
        .await
        .map_err(|e| SessionEnd::Closed {
            code: CloseCode::Abnormal,
            reason: e.to_string(),
        })
}

/// Emit an event to the event channel. If the channel is full, log a warning
/// and drop the event so the connection loop never blocks on a slow consumer.
async fn emit_event(event_tx: &mpsc::Sender<RelayEvent>, event: RelayEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!("event channel full, dropping event: {dropped:?}");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Emit the final [`RelayEvent::Disconnected`], waiting for room if needed.
async fn emit_disconnected(event_tx: &mpsc::Sender<RelayEvent>, reason: Option<String>) {
    if event_tx
        .send(RelayEvent::Disconnected { reason })
        .await
        .is_err()
    {
        debug!("event channel closed, receiver dropped");
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::platform::{MessageHandle, Notice};
    use crate::player::Requester;

    struct NoPlayers;

    impl PlayerRegistry for NoPlayers {
        fn lookup(&self, _guild_id: &str) -> Option<Arc<dyn Player>> {
            None
        }
    }

    struct SilentPlatform;

    #[async_trait]
    impl ChatPlatform for SilentPlatform {
        fn guild_ids(&self) -> Vec<GuildId> {
            Vec::new()
        }
        fn user_count(&self) -> u64 {
            0
        }
        async fn resolve_member(&self, _: &str, _: &str) -> Result<Option<Requester>> {
            Ok(None)
        }
        async fn send_notice(&self, channel_id: &str, _: &Notice) -> Result<MessageHandle> {
            Ok(MessageHandle {
                channel_id: channel_id.to_string(),
                message_id: "0".into(),
            })
        }
        async fn attach_controls(&self, _: &MessageHandle, _: &str) -> Result<()> {
            Ok(())
        }
    }

    fn executor() -> (CommandExecutor, mpsc::UnboundedReceiver<OutboundMessage>) {
        let collaborators = Collaborators::new(Arc::new(NoPlayers), Arc::new(SilentPlatform));
        let (tx, rx) = mpsc::unbounded_channel();
        let outbox = Outbox {
            tx,
            collaborators: collaborators.clone(),
        };
        let executor = CommandExecutor {
            dispatcher: ActionDispatcher::new(Arc::clone(&collaborators.platform)),
            players: Arc::clone(&collaborators.players),
            outbox,
        };
        (executor, rx)
    }

    #[tokio::test]
    async fn drained_guild_workers_are_reaped() {
        let (executor, mut pushes) = executor();
        let mut queues = GuildQueues::new();

        queues.submit(&executor, "a".into(), Command::Pause);
        queues.submit(&executor, "a".into(), Command::Shuffle);
        queues.submit(&executor, "b".into(), Command::Clear);
        assert_eq!(queues.len(), 2);

        for _ in 0..3 {
            pushes.recv().await.unwrap();
        }
        // A push is queued before its worker reports done.
        tokio::time::timeout(Duration::from_secs(1), async {
            while !queues.queues.is_empty() {
                queues.reap();
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("workers should drain");

        // A later command for the same guild gets a fresh worker.
        queues.submit(&executor, "a".into(), Command::Repeat);
        assert_eq!(queues.len(), 1);
        assert!(matches!(
            pushes.recv().await,
            Some(OutboundMessage::PlayerData { ref guild_id, player: None }) if guild_id == "a"
        ));
    }

    #[tokio::test]
    async fn busy_guild_is_not_reaped() {
        let (executor, _pushes) = executor();
        let mut queues = GuildQueues::new();
        queues.submit(&executor, "a".into(), Command::Pause);
        queues.submit(&executor, "a".into(), Command::Pause);

        // One of two commands reported done; the worker has not run yet.
        queues.done_tx.send("a".into()).unwrap();
        queues.reap();
        assert_eq!(queues.len(), 1);
        assert_eq!(queues.queues["a"].pending, 1);
    }
}
