//! Wire types for the dashboard protocol.
//!
//! Every frame is one JSON object carrying a `type` tag and the `clientId`
//! of the bot process. Field names are camelCase to match the dashboard's
//! parser. Snapshot fields are never skipped: an absent value goes out as
//! `null` so the shape of a `playerData` frame never changes.

use serde::{Deserialize, Serialize};

use crate::player::{ChannelId, GuildId, Requester, RepeatMode, Timescale, TrackInfo, UserId};

// ── Envelope ────────────────────────────────────────────────────────

/// A message of type `M` together with the identity of the bot process.
///
/// The message's own fields, including its `type` tag, are flattened into
/// the same JSON object as `clientId`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<M> {
    /// Identity of this bot process. Inbound frames may omit it.
    #[serde(default)]
    pub client_id: String,
    #[serde(flatten)]
    pub message: M,
}

// ── Outbound ────────────────────────────────────────────────────────

/// Message types sent from the bot to the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundMessage {
    /// Identity announcement sent right after every successful handshake.
    ClientData {
        /// Ids of every guild the bot is a member of.
        guilds: Vec<GuildId>,
        /// Sum of member counts across those guilds.
        users: u64,
    },
    /// Current state of one guild's player.
    #[serde(rename_all = "camelCase")]
    PlayerData {
        guild_id: GuildId,
        /// `None` when the guild has no active player.
        player: Option<PlayerSnapshot>,
    },
}

impl OutboundMessage {
    /// Guild this message refers to, if any.
    pub fn guild_id(&self) -> Option<&str> {
        match self {
            Self::ClientData { .. } => None,
            Self::PlayerData { guild_id, .. } => Some(guild_id),
        }
    }
}

// ── Inbound ─────────────────────────────────────────────────────────

/// A dashboard command addressed to one guild.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub guild_id: GuildId,
    #[serde(flatten)]
    pub command: Command,
}

/// Commands the dashboard can issue.
///
/// Unrecognized `type` tags decode to [`Command::Unknown`] so the relay
/// keeps working when the dashboard learns new commands first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    /// Toggle between paused and playing.
    Pause,
    /// Skip to a 1-based queue index, or to the next track when unset.
    Skip {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    /// Restart the current track, or go back one track in history.
    Previous,
    Shuffle,
    /// Advance the repeat mode one step.
    Repeat,
    /// Set the output level in percent. Any non-negative integer is
    /// passed through; the engine decides what it accepts. Negative or
    /// fractional levels do not decode.
    Volume {
        volume: u32,
    },
    /// Search for `query` and queue the result on behalf of `user_id`.
    #[serde(rename_all = "camelCase")]
    Play {
        query: String,
        user_id: UserId,
    },
    Filter {
        filter: String,
    },
    Clear,
    /// Remove the track at a 1-based queue index.
    Remove {
        index: usize,
    },
    /// Ask for a `playerData` frame without changing anything.
    RequestPlayerData,
    #[serde(other)]
    Unknown,
}

impl Command {
    /// Wire name of this command.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Skip { .. } => "skip",
            Self::Previous => "previous",
            Self::Shuffle => "shuffle",
            Self::Repeat => "repeat",
            Self::Volume { .. } => "volume",
            Self::Play { .. } => "play",
            Self::Filter { .. } => "filter",
            Self::Clear => "clear",
            Self::Remove { .. } => "remove",
            Self::RequestPlayerData => "requestPlayerData",
            Self::Unknown => "unknown",
        }
    }
}

// ── Snapshot ────────────────────────────────────────────────────────

/// Transfer-safe projection of one player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub guild_id: GuildId,
    pub voice_channel_id: Option<ChannelId>,
    pub text_channel_id: Option<ChannelId>,
    pub paused: bool,
    pub volume: u32,
    /// Position inside the current track, in milliseconds.
    pub position: u64,
    pub repeat_mode: RepeatMode,
    pub queue: QueueSnapshot,
    pub filters: FilterSnapshot,
}

/// The current track and everything queued after it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueSnapshot {
    pub tracks: Vec<TrackSummary>,
    pub current: Option<TrackSummary>,
}

/// Active filter state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterSnapshot {
    pub current: Option<String>,
    pub timescale: Option<Timescale>,
}

/// One track as the dashboard shows it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackSummary {
    pub info: TrackInfo,
    pub requester: Requester,
}
