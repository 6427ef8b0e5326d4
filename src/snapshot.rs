//! Projection of a live player into a [`PlayerSnapshot`].

use crate::player::{Player, Track};
use crate::protocol::{FilterSnapshot, PlayerSnapshot, QueueSnapshot, TrackSummary};

/// Project `player` into a snapshot, or `None` if there is no player.
///
/// Always recomputed from the live handle; nothing is cached between calls.
pub fn project(player: Option<&dyn Player>) -> Option<PlayerSnapshot> {
    let player = player?;
    Some(PlayerSnapshot {
        guild_id: player.guild_id(),
        voice_channel_id: player.voice_channel_id(),
        text_channel_id: player.text_channel_id(),
        paused: player.is_paused(),
        volume: player.volume(),
        position: player.position(),
        repeat_mode: player.repeat_mode(),
        queue: QueueSnapshot {
            tracks: player.queue().into_iter().map(summarize).collect(),
            current: player.current().map(summarize),
        },
        filters: FilterSnapshot {
            current: player.filter(),
            timescale: player.timescale(),
        },
    })
}

fn summarize(track: Track) -> TrackSummary {
    TrackSummary {
        info: track.info,
        requester: track.requester,
    }
}
