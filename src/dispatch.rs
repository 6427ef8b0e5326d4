//! Execution of dashboard commands against a player.
//!
//! [`ActionDispatcher::apply`] performs one command and reports what it did.
//! It never pushes state itself: the caller decides, from the returned
//! [`Outcome`], whether a fresh `playerData` frame goes out.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::platform::{ChatPlatform, MessageHandle, Notice};
use crate::player::{LoadType, Player, SearchResult};
use crate::protocol::Command;

/// Playing further than this into a track makes `previous` restart it.
const PREVIOUS_RESTART_THRESHOLD_MS: u64 = 5000;

/// What [`ActionDispatcher::apply`] did with a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The command ran against the player.
    Applied,
    /// The command's precondition did not hold; the player was not touched.
    Ignored,
    /// No player exists for the guild.
    NoPlayer,
    /// Read-only request for the current state.
    SnapshotRequested,
    /// The command kind is not known to this build.
    Unrecognized,
}

impl Outcome {
    /// Returns `true` if the dashboard should receive a fresh snapshot.
    pub fn pushes_snapshot(self) -> bool {
        !matches!(self, Self::Unrecognized)
    }
}

/// Runs [`Command`]s against players and posts confirmations.
#[derive(Clone)]
pub struct ActionDispatcher {
    platform: Arc<dyn ChatPlatform>,
}

impl ActionDispatcher {
    pub fn new(platform: Arc<dyn ChatPlatform>) -> Self {
        Self { platform }
    }

    /// Apply `command` to `player`.
    ///
    /// A missing player is a no-op reported as [`Outcome::NoPlayer`].
    ///
    /// # Errors
    ///
    /// Propagates the first playback-engine or member-lookup failure. The
    /// command's remaining steps are skipped; failures to post a notice
    /// are only logged.
    pub async fn apply(&self, player: Option<&dyn Player>, command: &Command) -> Result<Outcome> {
        match command {
            Command::Unknown => return Ok(Outcome::Unrecognized),
            Command::RequestPlayerData => return Ok(Outcome::SnapshotRequested),
            _ => {}
        }
        let Some(player) = player else {
            debug!(command = command.kind(), "no player for guild, ignoring command");
            return Ok(Outcome::NoPlayer);
        };

        match command {
            Command::Pause => {
                if player.is_paused() {
                    player.resume().await?;
                    self.notify(player, Notice::Resumed).await;
                } else {
                    player.pause().await?;
                    self.notify(player, Notice::Paused).await;
                }
            }
            Command::Skip { index } => return self.skip(player, *index).await,
            Command::Previous => return self.previous(player).await,
            Command::Shuffle => {
                player.shuffle().await?;
                self.notify(player, Notice::Shuffled).await;
            }
            Command::Repeat => {
                let mode = player.repeat_mode().next();
                player.set_repeat_mode(mode).await?;
                self.notify(player, Notice::RepeatMode(mode)).await;
            }
            Command::Volume { volume } => {
                player.set_volume(*volume).await?;
                self.notify(player, Notice::Volume(*volume)).await;
            }
            Command::Play { query, user_id } => return self.play(player, query, user_id).await,
            Command::Filter { filter } => {
                player.set_filter(filter).await?;
                self.notify(player, Notice::Filter(filter.clone())).await;
            }
            Command::Clear => {
                let len = player.queue().len();
                player.splice(0, len).await?;
                self.notify(player, Notice::Cleared).await;
            }
            Command::Remove { index } => return self.remove(player, *index).await,
            Command::RequestPlayerData | Command::Unknown => {}
        }
        Ok(Outcome::Applied)
    }

    async fn skip(&self, player: &dyn Player, index: Option<usize>) -> Result<Outcome> {
        let queue = player.queue();
        match index.filter(|&i| i > 0) {
            Some(index) => {
                let Some(track) = queue.get(index - 1) else {
                    debug!(index, len = queue.len(), "skip index out of range");
                    return Ok(Outcome::Ignored);
                };
                let title = track.info.title.clone();
                player.skip(Some(index)).await?;
                self.notify(player, Notice::SkippedTo { index, title }).await;
            }
            None if queue.is_empty() => {
                player.destroy().await?;
                self.notify(player, Notice::Stopped).await;
            }
            None => {
                player.skip(None).await?;
                self.notify(player, Notice::Skipped).await;
            }
        }
        Ok(Outcome::Applied)
    }

    async fn previous(&self, player: &dyn Player) -> Result<Outcome> {
        if player.position() > PREVIOUS_RESTART_THRESHOLD_MS {
            player.seek(0).await?;
            return Ok(Outcome::Applied);
        }
        let Some(track) = player.take_previous().await? else {
            debug!("history is empty, nothing to go back to");
            return Ok(Outcome::Ignored);
        };
        let title = track.info.title.clone();
        player.play_track(track).await?;
        // The track that was just replaced now heads the history.
        if let Some(replaced) = player.take_previous().await? {
            player.add(replaced, Some(0)).await?;
        }
        self.notify(player, Notice::PlayingPrevious { title }).await;
        Ok(Outcome::Applied)
    }

    async fn play(&self, player: &dyn Player, query: &str, user_id: &str) -> Result<Outcome> {
        let guild_id = player.guild_id();
        let Some(requester) = self.platform.resolve_member(&guild_id, user_id).await? else {
            debug!(guild_id = %guild_id, user_id, "requesting user is not a guild member");
            return Ok(Outcome::Ignored);
        };
        let result = player.search(query, &requester).await?;
        if result.load_type.is_failure() || result.tracks.is_empty() {
            debug!(query, load_type = ?result.load_type, "search produced nothing playable");
            return Ok(Outcome::Ignored);
        }

        let notice = enqueue(player, result).await?;
        if !player.is_playing() {
            player.play().await?;
        }
        if let Some(message) = self.post(player, &notice).await {
            if let Err(e) = self.platform.attach_controls(&message, &guild_id).await {
                warn!(guild_id = %guild_id, "failed to attach music controls: {e}");
            }
        }
        Ok(Outcome::Applied)
    }

    async fn remove(&self, player: &dyn Player, index: usize) -> Result<Outcome> {
        let len = player.queue().len();
        if index == 0 || index > len {
            debug!(index, len, "remove index out of range");
            return Ok(Outcome::Ignored);
        }
        let removed = player.splice(index - 1, 1).await?;
        if let Some(track) = removed.into_iter().next() {
            let title = track.info.title;
            self.notify(player, Notice::Removed { index, title }).await;
        }
        Ok(Outcome::Applied)
    }

    async fn notify(&self, player: &dyn Player, notice: Notice) {
        let _ = self.post(player, &notice).await;
    }

    /// Post `notice` to the player's text channel, logging any failure.
    async fn post(&self, player: &dyn Player, notice: &Notice) -> Option<MessageHandle> {
        let channel_id = player.text_channel_id()?;
        match self.platform.send_notice(&channel_id, notice).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(channel_id = %channel_id, "failed to post notice: {e}");
                None
            }
        }
    }
}

impl std::fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDispatcher").finish_non_exhaustive()
    }
}

/// Queue a search result and describe what was added.
async fn enqueue(player: &dyn Player, result: SearchResult) -> Result<Notice> {
    if result.load_type == LoadType::Playlist {
        let count = result.tracks.len();
        for track in result.tracks {
            player.add(track, None).await?;
        }
        let name = result.playlist_name.unwrap_or_else(|| "playlist".into());
        return Ok(Notice::PlaylistAdded { name, count });
    }

    let mut tracks = result.tracks.into_iter();
    let Some(track) = tracks.next() else {
        return Err(crate::error::RelayError::Player(
            "search result has no tracks".into(),
        ));
    };
    let notice = Notice::TrackAdded {
        title: track.info.title.clone(),
        author: track.info.author.clone(),
    };
    player.add(track, None).await?;
    Ok(notice)
}
