//! # Dashboard Relay Example
//!
//! Connects a toy in-memory music player to the dashboard:
//!
//! 1. Open a WebSocket to the dashboard and announce the bot
//! 2. Apply dashboard commands (pause, skip, volume, …) to the player
//! 3. Push a fresh `playerData` snapshot after every change
//! 4. Reconnect with backoff when the connection drops
//! 5. Shut down gracefully on Ctrl+C
//!
//! ## Running
//!
//! ```sh
//! cargo run --example dashboard_relay --features transport-websocket-tls
//!
//! # Point at a local dashboard (plain `ws://` needs no TLS):
//! KALLIOPE_DASHBOARD_URL=ws://localhost:8080 cargo run --example dashboard_relay
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use kalliope_relay::platform::{ChatPlatform, MessageHandle, Notice};
use kalliope_relay::player::{
    LoadType, Player, PlayerRegistry, RepeatMode, Requester, SearchResult, Timescale, Track,
    TrackInfo,
};
use kalliope_relay::relay::DEFAULT_DASHBOARD_URL;
use kalliope_relay::{
    Collaborators, Relay, RelayConfig, RelayError, RelayEvent, WebSocketConnector,
};

const GUILD_ID: &str = "100000000000000001";
const BOT_USER_ID: &str = "900000000000000009";

// ── A toy player ────────────────────────────────────────────────────

#[derive(Default)]
struct State {
    paused: bool,
    volume: u32,
    repeat_mode: RepeatMode,
    current: Option<Track>,
    queue: Vec<Track>,
    history: Vec<Track>,
    filter: Option<String>,
}

struct DemoPlayer {
    state: Mutex<State>,
}

impl DemoPlayer {
    fn new() -> Self {
        Self {
            state: Mutex::new(State {
                volume: 100,
                ..State::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn demo_track(title: &str, requester: &Requester) -> Track {
    Track {
        info: TrackInfo {
            identifier: title.to_lowercase().replace(' ', "-"),
            title: title.to_string(),
            author: "Demo Artist".into(),
            duration: 200_000,
            uri: None,
            artwork_url: None,
            is_stream: false,
        },
        requester: requester.clone(),
    }
}

#[async_trait]
impl Player for DemoPlayer {
    fn guild_id(&self) -> String {
        GUILD_ID.to_string()
    }
    fn voice_channel_id(&self) -> Option<String> {
        Some("200000000000000002".into())
    }
    fn text_channel_id(&self) -> Option<String> {
        Some("300000000000000003".into())
    }
    fn is_paused(&self) -> bool {
        self.state().paused
    }
    fn is_playing(&self) -> bool {
        self.state().current.is_some()
    }
    fn volume(&self) -> u32 {
        self.state().volume
    }
    fn position(&self) -> u64 {
        0
    }
    fn repeat_mode(&self) -> RepeatMode {
        self.state().repeat_mode
    }
    fn current(&self) -> Option<Track> {
        self.state().current.clone()
    }
    fn queue(&self) -> Vec<Track> {
        self.state().queue.clone()
    }
    fn filter(&self) -> Option<String> {
        self.state().filter.clone()
    }
    fn timescale(&self) -> Option<Timescale> {
        None
    }

    async fn pause(&self) -> Result<(), RelayError> {
        self.state().paused = true;
        Ok(())
    }
    async fn resume(&self) -> Result<(), RelayError> {
        self.state().paused = false;
        Ok(())
    }
    async fn skip(&self, index: Option<usize>) -> Result<(), RelayError> {
        let mut state = self.state();
        let drop_count = index.unwrap_or(1).saturating_sub(1).min(state.queue.len());
        state.queue.drain(..drop_count);
        let next = if state.queue.is_empty() {
            None
        } else {
            Some(state.queue.remove(0))
        };
        if let Some(previous) = std::mem::replace(&mut state.current, next) {
            state.history.push(previous);
        }
        Ok(())
    }
    async fn seek(&self, _position_ms: u64) -> Result<(), RelayError> {
        Ok(())
    }
    async fn destroy(&self) -> Result<(), RelayError> {
        let mut state = self.state();
        state.current = None;
        state.queue.clear();
        Ok(())
    }
    async fn set_volume(&self, volume: u32) -> Result<(), RelayError> {
        self.state().volume = volume;
        Ok(())
    }
    async fn set_repeat_mode(&self, mode: RepeatMode) -> Result<(), RelayError> {
        self.state().repeat_mode = mode;
        Ok(())
    }
    async fn shuffle(&self) -> Result<(), RelayError> {
        self.state().queue.reverse();
        Ok(())
    }
    async fn add(&self, track: Track, position: Option<usize>) -> Result<(), RelayError> {
        let mut state = self.state();
        let at = position.unwrap_or(state.queue.len()).min(state.queue.len());
        state.queue.insert(at, track);
        Ok(())
    }
    async fn splice(&self, start: usize, count: usize) -> Result<Vec<Track>, RelayError> {
        let mut state = self.state();
        let start = start.min(state.queue.len());
        let end = start.saturating_add(count).min(state.queue.len());
        Ok(state.queue.drain(start..end).collect())
    }
    async fn take_previous(&self) -> Result<Option<Track>, RelayError> {
        Ok(self.state().history.pop())
    }
    async fn play_track(&self, track: Track) -> Result<(), RelayError> {
        let mut state = self.state();
        if let Some(previous) = state.current.replace(track) {
            state.history.push(previous);
        }
        Ok(())
    }
    async fn play(&self) -> Result<(), RelayError> {
        let mut state = self.state();
        if state.current.is_none() && !state.queue.is_empty() {
            let next = state.queue.remove(0);
            state.current = Some(next);
        }
        Ok(())
    }
    async fn set_filter(&self, name: &str) -> Result<(), RelayError> {
        self.state().filter = Some(name.to_string());
        Ok(())
    }
    async fn search(&self, query: &str, requester: &Requester) -> Result<SearchResult, RelayError> {
        Ok(SearchResult {
            load_type: LoadType::Search,
            tracks: vec![demo_track(query, requester)],
            playlist_name: None,
        })
    }
}

struct DemoRegistry {
    player: Arc<DemoPlayer>,
}

impl PlayerRegistry for DemoRegistry {
    fn lookup(&self, guild_id: &str) -> Option<Arc<dyn Player>> {
        (guild_id == GUILD_ID).then(|| Arc::clone(&self.player) as Arc<dyn Player>)
    }
}

// ── A console "chat platform" ───────────────────────────────────────

struct ConsolePlatform;

#[async_trait]
impl ChatPlatform for ConsolePlatform {
    fn guild_ids(&self) -> Vec<String> {
        vec![GUILD_ID.to_string()]
    }

    fn user_count(&self) -> u64 {
        1
    }

    async fn resolve_member(
        &self,
        _guild_id: &str,
        user_id: &str,
    ) -> Result<Option<Requester>, RelayError> {
        Ok(Some(Requester {
            display_name: format!("user {user_id}"),
            display_avatar_url: None,
        }))
    }

    async fn send_notice(
        &self,
        channel_id: &str,
        notice: &Notice,
    ) -> Result<MessageHandle, RelayError> {
        tracing::info!("[#{channel_id}] {notice}");
        Ok(MessageHandle {
            channel_id: channel_id.to_string(),
            message_id: "0".into(),
        })
    }

    async fn attach_controls(
        &self,
        _message: &MessageHandle,
        _guild_id: &str,
    ) -> Result<(), RelayError> {
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Set `RUST_LOG=debug` for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let url = std::env::var("KALLIOPE_DASHBOARD_URL")
        .unwrap_or_else(|_| DEFAULT_DASHBOARD_URL.to_string());
    let config = RelayConfig::new(BOT_USER_ID).with_url(url);

    let player = Arc::new(DemoPlayer::new());
    let collaborators = Collaborators::new(
        Arc::new(DemoRegistry {
            player: Arc::clone(&player),
        }),
        Arc::new(ConsolePlatform),
    );

    // ── Start ───────────────────────────────────────────────────────
    let (mut relay, mut events) = Relay::start(WebSocketConnector, config, collaborators);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    tracing::info!("Event channel closed, exiting");
                    break;
                };
                match event {
                    RelayEvent::Connected => {
                        tracing::info!("Connected to the dashboard");
                        relay.update_player(player.as_ref())?;
                    }
                    RelayEvent::ReconnectScheduled { attempt, delay, jitter } => {
                        tracing::warn!(
                            "Reconnect #{attempt} in {}ms",
                            (delay + jitter).as_millis()
                        );
                    }
                    RelayEvent::Disconnected { reason } => {
                        tracing::warn!("Disconnected: {}", reason.as_deref().unwrap_or("unknown"));
                        break;
                    }
                    other => tracing::debug!("Event: {other:?}"),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down…");
                break;
            }
        }
    }

    // ── Cleanup ─────────────────────────────────────────────────────
    relay.shutdown().await;
    tracing::info!("Relay shut down. Goodbye!");
    Ok(())
}
