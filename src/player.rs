//! Boundary to the external playback engine.
//!
//! The relay never owns a player. A [`PlayerRegistry`] hands out a shared
//! handle for the duration of one inbound command and the relay drops it
//! once the command and its snapshot push are done.
//!
//! All mutating methods are async because every engine call may suspend.
//! Accessors are synchronous reads of the engine's cached state.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ── Type aliases ────────────────────────────────────────────────────

/// Discord guild snowflake, kept as the string the wire protocol uses.
pub type GuildId = String;

/// Discord channel snowflake.
pub type ChannelId = String;

/// Discord user snowflake.
pub type UserId = String;

// ── Enums ───────────────────────────────────────────────────────────

/// Queue repeat mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    Track,
    Queue,
}

impl RepeatMode {
    /// The next mode in the `off → track → queue → off` cycle.
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::Track,
            Self::Track => Self::Queue,
            Self::Queue => Self::Off,
        }
    }
}

/// Outcome category of a search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoadType {
    /// A single track was resolved directly.
    Track,
    /// A playlist was resolved; every track belongs to it.
    Playlist,
    /// A free-text search; the first track is the best match.
    Search,
    /// Nothing matched.
    Empty,
    /// The engine failed to load the query.
    Error,
}

impl LoadType {
    /// Returns `true` if a result of this type carries nothing playable.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Empty | Self::Error)
    }
}

// ── Records ─────────────────────────────────────────────────────────

/// Display identity of whoever queued a track.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Requester {
    pub display_name: String,
    #[serde(rename = "displayAvatarURL")]
    pub display_avatar_url: Option<String>,
}

/// Track metadata as reported by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub identifier: String,
    pub title: String,
    pub author: String,
    /// Track length in milliseconds.
    pub duration: u64,
    pub uri: Option<String>,
    /// Link to the artwork, never the image itself.
    pub artwork_url: Option<String>,
    pub is_stream: bool,
}

/// A playable track together with its requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub info: TrackInfo,
    pub requester: Requester,
}

/// Timescale filter parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Timescale {
    pub speed: f64,
    pub pitch: f64,
    pub rate: f64,
}

impl Default for Timescale {
    fn default() -> Self {
        Self {
            speed: 1.0,
            pitch: 1.0,
            rate: 1.0,
        }
    }
}

/// Result of [`Player::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub load_type: LoadType,
    pub tracks: Vec<Track>,
    /// Playlist name when `load_type` is [`LoadType::Playlist`].
    pub playlist_name: Option<String>,
}

// ── Traits ──────────────────────────────────────────────────────────

/// One guild's playback session.
///
/// Queue positions passed to and returned from this trait are 0-based and
/// refer to the upcoming tracks only; the current track is separate.
#[async_trait]
pub trait Player: Send + Sync {
    fn guild_id(&self) -> GuildId;
    fn voice_channel_id(&self) -> Option<ChannelId>;
    fn text_channel_id(&self) -> Option<ChannelId>;
    fn is_paused(&self) -> bool;
    /// Returns `true` while a track is loaded and audio is being sent.
    fn is_playing(&self) -> bool;
    fn volume(&self) -> u32;
    /// Position inside the current track, in milliseconds.
    fn position(&self) -> u64;
    fn repeat_mode(&self) -> RepeatMode;
    fn current(&self) -> Option<Track>;
    /// Upcoming tracks in play order.
    fn queue(&self) -> Vec<Track>;
    /// Name of the active audio filter, if any.
    fn filter(&self) -> Option<String>;
    fn timescale(&self) -> Option<Timescale>;

    async fn pause(&self) -> Result<()>;
    async fn resume(&self) -> Result<()>;
    /// Skip to the given 1-based queue index, or to the next track.
    async fn skip(&self, index: Option<usize>) -> Result<()>;
    async fn seek(&self, position_ms: u64) -> Result<()>;
    /// Tear down the session. Later calls on this handle may fail.
    async fn destroy(&self) -> Result<()>;
    /// Set the output level verbatim. Rejecting levels the engine does not
    /// support is up to the implementation.
    async fn set_volume(&self, volume: u32) -> Result<()>;
    async fn set_repeat_mode(&self, mode: RepeatMode) -> Result<()>;
    async fn shuffle(&self) -> Result<()>;
    /// Insert a track into the queue, appending when `position` is `None`.
    async fn add(&self, track: Track, position: Option<usize>) -> Result<()>;
    /// Remove `count` tracks starting at `start`, returning what was removed.
    async fn splice(&self, start: usize, count: usize) -> Result<Vec<Track>>;
    /// Pop the most recently played track off the history.
    async fn take_previous(&self) -> Result<Option<Track>>;
    /// Replace the current track and start playing it immediately.
    async fn play_track(&self, track: Track) -> Result<()>;
    /// Start playing the head of the queue if idle.
    async fn play(&self) -> Result<()>;
    async fn set_filter(&self, name: &str) -> Result<()>;
    async fn search(&self, query: &str, requester: &Requester) -> Result<SearchResult>;
}

/// Lookup of live playback sessions by guild.
pub trait PlayerRegistry: Send + Sync {
    /// Returns the session for `guild_id`, or `None` if nothing is playing there.
    fn lookup(&self, guild_id: &str) -> Option<Arc<dyn Player>>;
}
