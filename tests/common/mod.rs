#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for the relay integration tests.
//!
//! Provides an in-memory playback engine ([`MockPlayer`], [`MockRegistry`]),
//! a recording chat platform ([`MockPlatform`]), and a channel-based
//! transport whose far end ([`MockServer`]) plays the dashboard.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use kalliope_relay::close_code::CloseCode;
use kalliope_relay::platform::{ChatPlatform, MessageHandle, Notice};
use kalliope_relay::player::{
    LoadType, Player, PlayerRegistry, RepeatMode, Requester, SearchResult, Timescale, Track,
    TrackInfo,
};
use kalliope_relay::transport::{Connector, Transport, TransportEvent};
use kalliope_relay::RelayError;
use tokio::sync::mpsc;

// ── Logging ─────────────────────────────────────────────────────────

/// Route relay logs to the test harness. Set `RUST_LOG` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

// ── Fixtures ────────────────────────────────────────────────────────

pub fn requester(name: &str) -> Requester {
    Requester {
        display_name: name.into(),
        display_avatar_url: Some(format!("https://cdn.example/{name}.png")),
    }
}

pub fn track(title: &str) -> Track {
    Track {
        info: TrackInfo {
            identifier: format!("id-{title}"),
            title: title.into(),
            author: "Artist".into(),
            duration: 180_000,
            uri: Some(format!("https://music.example/{title}")),
            artwork_url: None,
            is_stream: false,
        },
        requester: requester("Alice"),
    }
}

pub fn titles(tracks: &[Track]) -> Vec<String> {
    tracks.iter().map(|t| t.info.title.clone()).collect()
}

// ── MockPlayer ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PlayerState {
    pub paused: bool,
    pub playing: bool,
    pub volume: u32,
    pub position: u64,
    pub repeat_mode: RepeatMode,
    pub current: Option<Track>,
    pub queue: Vec<Track>,
    /// Most recently played track last.
    pub history: Vec<Track>,
    pub filter: Option<String>,
    pub timescale: Option<Timescale>,
    pub destroyed: bool,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            paused: false,
            playing: false,
            volume: 100,
            position: 0,
            repeat_mode: RepeatMode::Off,
            current: None,
            queue: Vec::new(),
            history: Vec::new(),
            filter: None,
            timescale: None,
            destroyed: false,
        }
    }
}

/// In-memory player that records every engine call.
pub struct MockPlayer {
    guild_id: String,
    text_channel_id: Option<String>,
    pub state: StdMutex<PlayerState>,
    pub calls: StdMutex<Vec<String>>,
    pub search_result: StdMutex<Option<SearchResult>>,
    /// Engine calls with this name fail with `RelayError::Player`.
    pub failing: StdMutex<Option<&'static str>>,
    /// Engine calls with this name panic.
    pub panicking: StdMutex<Option<&'static str>>,
    /// Delay applied inside `pause`/`resume`.
    pub pause_delay: StdMutex<Duration>,
}

impl MockPlayer {
    pub fn new(guild_id: &str) -> Self {
        Self {
            guild_id: guild_id.into(),
            text_channel_id: Some(format!("text-{guild_id}")),
            state: StdMutex::new(PlayerState::default()),
            calls: StdMutex::new(Vec::new()),
            search_result: StdMutex::new(None),
            failing: StdMutex::new(None),
            panicking: StdMutex::new(None),
            pause_delay: StdMutex::new(Duration::ZERO),
        }
    }

    pub fn without_text_channel(guild_id: &str) -> Self {
        Self {
            text_channel_id: None,
            ..Self::new(guild_id)
        }
    }

    /// A playing player with a current track and `queued` upcoming tracks.
    pub fn playing(guild_id: &str, queued: &[&str]) -> Self {
        let player = Self::new(guild_id);
        {
            let mut state = player.state.lock().unwrap();
            state.playing = true;
            state.current = Some(track("Now"));
            state.queue = queued.iter().map(|t| track(t)).collect();
        }
        player
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn snapshot_state(&self) -> PlayerState {
        self.state.lock().unwrap().clone()
    }

    pub fn with_state(&self, f: impl FnOnce(&mut PlayerState)) {
        f(&mut self.state.lock().unwrap());
    }

    fn record(&self, call: impl Into<String>) -> Result<(), RelayError> {
        let call = call.into();
        let name = call.split('(').next().unwrap_or_default().to_string();
        self.calls.lock().unwrap().push(call);
        if *self.panicking.lock().unwrap() == Some(name.as_str()) {
            panic!("engine blew up in {name}");
        }
        if *self.failing.lock().unwrap() == Some(name.as_str()) {
            return Err(RelayError::Player(format!("{name} failed")));
        }
        Ok(())
    }

    fn advance(state: &mut PlayerState) {
        if let Some(previous) = state.current.take() {
            state.history.push(previous);
        }
        if state.queue.is_empty() {
            state.playing = false;
        } else {
            state.current = Some(state.queue.remove(0));
        }
        state.position = 0;
    }
}

#[async_trait]
impl Player for MockPlayer {
    fn guild_id(&self) -> String {
        self.guild_id.clone()
    }
    fn voice_channel_id(&self) -> Option<String> {
        Some(format!("voice-{}", self.guild_id))
    }
    fn text_channel_id(&self) -> Option<String> {
        self.text_channel_id.clone()
    }
    fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }
    fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }
    fn volume(&self) -> u32 {
        self.state.lock().unwrap().volume
    }
    fn position(&self) -> u64 {
        self.state.lock().unwrap().position
    }
    fn repeat_mode(&self) -> RepeatMode {
        self.state.lock().unwrap().repeat_mode
    }
    fn current(&self) -> Option<Track> {
        self.state.lock().unwrap().current.clone()
    }
    fn queue(&self) -> Vec<Track> {
        self.state.lock().unwrap().queue.clone()
    }
    fn filter(&self) -> Option<String> {
        self.state.lock().unwrap().filter.clone()
    }
    fn timescale(&self) -> Option<Timescale> {
        self.state.lock().unwrap().timescale
    }

    async fn pause(&self) -> Result<(), RelayError> {
        let delay = *self.pause_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        self.record("pause")?;
        self.state.lock().unwrap().paused = true;
        Ok(())
    }

    async fn resume(&self) -> Result<(), RelayError> {
        let delay = *self.pause_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        self.record("resume")?;
        self.state.lock().unwrap().paused = false;
        Ok(())
    }

    async fn skip(&self, index: Option<usize>) -> Result<(), RelayError> {
        self.record(format!("skip({index:?})"))?;
        let mut state = self.state.lock().unwrap();
        let dropped = index.map_or(0, |i| i - 1);
        for _ in 0..dropped.min(state.queue.len()) {
            state.queue.remove(0);
        }
        Self::advance(&mut state);
        Ok(())
    }

    async fn seek(&self, position_ms: u64) -> Result<(), RelayError> {
        self.record(format!("seek({position_ms})"))?;
        self.state.lock().unwrap().position = position_ms;
        Ok(())
    }

    async fn destroy(&self) -> Result<(), RelayError> {
        self.record("destroy")?;
        let mut state = self.state.lock().unwrap();
        state.destroyed = true;
        state.playing = false;
        Ok(())
    }

    async fn set_volume(&self, volume: u32) -> Result<(), RelayError> {
        self.record(format!("set_volume({volume})"))?;
        self.state.lock().unwrap().volume = volume;
        Ok(())
    }

    async fn set_repeat_mode(&self, mode: RepeatMode) -> Result<(), RelayError> {
        self.record(format!("set_repeat_mode({mode:?})"))?;
        self.state.lock().unwrap().repeat_mode = mode;
        Ok(())
    }

    async fn shuffle(&self) -> Result<(), RelayError> {
        self.record("shuffle")?;
        self.state.lock().unwrap().queue.reverse();
        Ok(())
    }

    async fn add(&self, track: Track, position: Option<usize>) -> Result<(), RelayError> {
        self.record(format!("add({}, {position:?})", track.info.title))?;
        let mut state = self.state.lock().unwrap();
        match position {
            Some(at) => state.queue.insert(at, track),
            None => state.queue.push(track),
        }
        Ok(())
    }

    async fn splice(&self, start: usize, count: usize) -> Result<Vec<Track>, RelayError> {
        self.record(format!("splice({start}, {count})"))?;
        let mut state = self.state.lock().unwrap();
        let end = (start + count).min(state.queue.len());
        Ok(state.queue.drain(start..end).collect())
    }

    async fn take_previous(&self) -> Result<Option<Track>, RelayError> {
        self.record("take_previous")?;
        Ok(self.state.lock().unwrap().history.pop())
    }

    async fn play_track(&self, track: Track) -> Result<(), RelayError> {
        self.record(format!("play_track({})", track.info.title))?;
        let mut state = self.state.lock().unwrap();
        if let Some(previous) = state.current.replace(track) {
            state.history.push(previous);
        }
        state.playing = true;
        state.position = 0;
        Ok(())
    }

    async fn play(&self) -> Result<(), RelayError> {
        self.record("play")?;
        let mut state = self.state.lock().unwrap();
        if state.current.is_none() && !state.queue.is_empty() {
            let next = state.queue.remove(0);
            state.current = Some(next);
        }
        state.playing = state.current.is_some();
        Ok(())
    }

    async fn set_filter(&self, name: &str) -> Result<(), RelayError> {
        self.record(format!("set_filter({name})"))?;
        self.state.lock().unwrap().filter = Some(name.to_string());
        Ok(())
    }

    async fn search(&self, query: &str, requester: &Requester) -> Result<SearchResult, RelayError> {
        self.record(format!("search({query}, {})", requester.display_name))?;
        Ok(self
            .search_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(SearchResult {
                load_type: LoadType::Empty,
                tracks: Vec::new(),
                playlist_name: None,
            }))
    }
}

// ── MockRegistry ────────────────────────────────────────────────────

/// Registry that hides destroyed players.
#[derive(Default)]
pub struct MockRegistry {
    players: StdMutex<HashMap<String, Arc<MockPlayer>>>,
}

impl MockRegistry {
    pub fn with(players: Vec<Arc<MockPlayer>>) -> Self {
        let registry = Self::default();
        for player in players {
            registry.insert(player);
        }
        registry
    }

    pub fn insert(&self, player: Arc<MockPlayer>) {
        self.players
            .lock()
            .unwrap()
            .insert(player.guild_id(), player);
    }
}

impl PlayerRegistry for MockRegistry {
    fn lookup(&self, guild_id: &str) -> Option<Arc<dyn Player>> {
        let players = self.players.lock().unwrap();
        let player = players.get(guild_id)?;
        if player.snapshot_state().destroyed {
            return None;
        }
        Some(Arc::clone(player) as Arc<dyn Player>)
    }
}

// ── MockPlatform ────────────────────────────────────────────────────

/// Chat platform that records notices instead of posting them.
pub struct MockPlatform {
    pub guilds: Vec<String>,
    pub users: u64,
    pub members: HashMap<String, Requester>,
    pub notices: StdMutex<Vec<(String, String)>>,
    pub controls: StdMutex<Vec<(MessageHandle, String)>>,
    pub fail_notices: bool,
    next_message: AtomicUsize,
}

impl MockPlatform {
    pub fn new() -> Self {
        let mut members = HashMap::new();
        members.insert("user-1".to_string(), requester("Alice"));
        Self {
            guilds: vec!["guild-1".into(), "guild-2".into()],
            users: 1234,
            members,
            notices: StdMutex::new(Vec::new()),
            controls: StdMutex::new(Vec::new()),
            fail_notices: false,
            next_message: AtomicUsize::new(1),
        }
    }

    pub fn failing_notices() -> Self {
        Self {
            fail_notices: true,
            ..Self::new()
        }
    }

    /// Rendered notice texts, in posting order.
    pub fn notice_texts(&self) -> Vec<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl ChatPlatform for MockPlatform {
    fn guild_ids(&self) -> Vec<String> {
        self.guilds.clone()
    }

    fn user_count(&self) -> u64 {
        self.users
    }

    async fn resolve_member(
        &self,
        _guild_id: &str,
        user_id: &str,
    ) -> Result<Option<Requester>, RelayError> {
        Ok(self.members.get(user_id).cloned())
    }

    async fn send_notice(
        &self,
        channel_id: &str,
        notice: &Notice,
    ) -> Result<MessageHandle, RelayError> {
        if self.fail_notices {
            return Err(RelayError::Platform("missing permissions".into()));
        }
        self.notices
            .lock()
            .unwrap()
            .push((channel_id.to_string(), notice.to_string()));
        let id = self.next_message.fetch_add(1, Ordering::Relaxed);
        Ok(MessageHandle {
            channel_id: channel_id.to_string(),
            message_id: format!("msg-{id}"),
        })
    }

    async fn attach_controls(
        &self,
        message: &MessageHandle,
        guild_id: &str,
    ) -> Result<(), RelayError> {
        self.controls
            .lock()
            .unwrap()
            .push((message.clone(), guild_id.to_string()));
        Ok(())
    }
}

// ── MockTransport ───────────────────────────────────────────────────

/// Client half of an in-process connection.
pub struct MockTransport {
    incoming: mpsc::UnboundedReceiver<TransportEvent>,
    outgoing: mpsc::UnboundedSender<String>,
    closed_with: Arc<StdMutex<Option<(CloseCode, String)>>>,
}

/// Dashboard half of an in-process connection.
pub struct MockServer {
    to_client: mpsc::UnboundedSender<TransportEvent>,
    from_client: mpsc::UnboundedReceiver<String>,
    closed_with: Arc<StdMutex<Option<(CloseCode, String)>>>,
}

pub fn mock_connection() -> (MockTransport, MockServer) {
    let (to_client, incoming) = mpsc::unbounded_channel();
    let (outgoing, from_client) = mpsc::unbounded_channel();
    let closed_with = Arc::new(StdMutex::new(None));
    (
        MockTransport {
            incoming,
            outgoing,
            closed_with: Arc::clone(&closed_with),
        },
        MockServer {
            to_client,
            from_client,
            closed_with,
        },
    )
}

impl MockServer {
    /// Deliver a raw text frame to the relay.
    pub fn send_text(&self, frame: &str) {
        self.to_client
            .send(TransportEvent::Message(frame.to_string()))
            .unwrap();
    }

    /// Deliver a JSON value as a text frame.
    pub fn send_json(&self, value: serde_json::Value) {
        self.send_text(&value.to_string());
    }

    /// Close the connection from the dashboard side.
    pub fn close(&self, code: u16) {
        let _ = self.to_client.send(TransportEvent::Closed {
            code: CloseCode::from(code),
            reason: "test".into(),
        });
    }

    /// Next frame the relay sent, parsed as JSON.
    pub async fn next_json(&mut self) -> serde_json::Value {
        let frame = tokio::time::timeout(Duration::from_secs(5), self.from_client.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("relay dropped the connection");
        serde_json::from_str(&frame).expect("relay sent invalid JSON")
    }

    /// Next frame of the given `type`, skipping others.
    pub async fn next_of_type(&mut self, kind: &str) -> serde_json::Value {
        loop {
            let frame = self.next_json().await;
            if frame["type"] == kind {
                return frame;
            }
        }
    }

    /// Asserts nothing else arrives within `wait`.
    pub async fn assert_silent(&mut self, wait: Duration) {
        if let Ok(Some(frame)) = tokio::time::timeout(wait, self.from_client.recv()).await {
            panic!("expected no more frames, got {frame}");
        }
    }

    /// The code the relay closed the connection with, if it did.
    pub fn closed_with(&self) -> Option<(CloseCode, String)> {
        self.closed_with.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), RelayError> {
        self.outgoing
            .send(message)
            .map_err(|e| RelayError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Result<TransportEvent, RelayError> {
        match self.incoming.recv().await {
            Some(event) => Ok(event),
            None => Ok(TransportEvent::Closed {
                code: CloseCode::Abnormal,
                reason: "server dropped".into(),
            }),
        }
    }

    async fn close(&mut self, code: CloseCode, reason: &str) -> Result<(), RelayError> {
        *self.closed_with.lock().unwrap() = Some((code, reason.to_string()));
        Ok(())
    }
}

// ── ScriptedConnector ───────────────────────────────────────────────

/// Connector that replays scripted handshake outcomes, then hangs.
pub struct ScriptedConnector {
    script: StdMutex<VecDeque<Result<MockTransport, RelayError>>>,
    pub attempts: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub fn new(script: Vec<Result<MockTransport, RelayError>>) -> (Self, Arc<AtomicUsize>) {
        let attempts = Arc::new(AtomicUsize::new(0));
        let connector = Self {
            script: StdMutex::new(VecDeque::from(script)),
            attempts: Arc::clone(&attempts),
        };
        (connector, attempts)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Transport = MockTransport;

    async fn connect(&self, _url: &str) -> Result<MockTransport, RelayError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(outcome) => outcome,
            None => std::future::pending().await,
        }
    }
}

/// A failed handshake as the connector reports it.
pub fn handshake_failure() -> RelayError {
    RelayError::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "closed with 1006 during handshake",
    ))
}
