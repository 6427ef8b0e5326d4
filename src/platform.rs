//! Boundary to the chat platform.
//!
//! The relay only needs a handful of things from the chat side: who the bot
//! is (for the `clientData` announcement), who issued a dashboard `play`,
//! and somewhere to post a short confirmation after each command.

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;
use crate::player::{ChannelId, GuildId, RepeatMode, Requester};

/// Handle to a posted message, usable for later edits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub channel_id: ChannelId,
    pub message_id: String,
}

/// Confirmation posted to a guild's text channel after a dashboard command.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Paused,
    Resumed,
    Skipped,
    SkippedTo { index: usize, title: String },
    Stopped,
    PlayingPrevious { title: String },
    Shuffled,
    RepeatMode(RepeatMode),
    Volume(u32),
    TrackAdded { title: String, author: String },
    PlaylistAdded { name: String, count: usize },
    Filter(String),
    Cleared,
    Removed { index: usize, title: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paused => write!(f, "⏸️ Paused."),
            Self::Resumed => write!(f, "▶️ Resumed."),
            Self::Skipped => write!(f, "⏭️ Skipped."),
            Self::SkippedTo { index, title } => {
                write!(f, "⏭️ Skipped to `#{index}`: **{title}**.")
            }
            Self::Stopped => write!(f, "⏹️ Stopped."),
            Self::PlayingPrevious { title } => {
                write!(f, "⏮️ Playing previous track `#0`: **{title}**.")
            }
            Self::Shuffled => write!(f, "🔀 Shuffled the queue."),
            Self::RepeatMode(mode) => {
                let label = match mode {
                    RepeatMode::Off => "Off ▶️",
                    RepeatMode::Track => "Track 🔂",
                    RepeatMode::Queue => "Queue 🔁",
                };
                write!(f, "Set repeat mode to {label}")
            }
            Self::Volume(volume) => write!(f, "🔊 Set volume to {volume}%."),
            Self::TrackAdded { title, author } => {
                write!(f, "➕ Added to queue: **{title}** by {author}.")
            }
            Self::PlaylistAdded { name, count } => {
                write!(f, "➕ Added {count} tracks from **{name}** to the queue.")
            }
            Self::Filter(name) => write!(f, "Set filter to {name}."),
            Self::Cleared => write!(f, "🗑️ Cleared the queue."),
            Self::Removed { index, title } => {
                write!(f, "🗑️ Removed track `#{index}`: **{title}**")
            }
        }
    }
}

/// Chat-platform capabilities the relay depends on.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Ids of every guild the bot is in.
    fn guild_ids(&self) -> Vec<GuildId>;

    /// Sum of member counts across all guilds.
    fn user_count(&self) -> u64;

    /// Resolve a guild member's display identity.
    ///
    /// Returns `Ok(None)` if the user is not a member of the guild.
    async fn resolve_member(&self, guild_id: &str, user_id: &str) -> Result<Option<Requester>>;

    /// Post `notice` to a text channel.
    async fn send_notice(&self, channel_id: &str, notice: &Notice) -> Result<MessageHandle>;

    /// Attach playback control buttons to a posted message.
    async fn attach_controls(&self, message: &MessageHandle, guild_id: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_render_like_chat_confirmations() {
        assert_eq!(Notice::Paused.to_string(), "⏸️ Paused.");
        assert_eq!(Notice::Volume(150).to_string(), "🔊 Set volume to 150%.");
        assert_eq!(
            Notice::SkippedTo {
                index: 3,
                title: "Song".into()
            }
            .to_string(),
            "⏭️ Skipped to `#3`: **Song**."
        );
        assert_eq!(
            Notice::RepeatMode(RepeatMode::Queue).to_string(),
            "Set repeat mode to Queue 🔁"
        );
    }
}
