use serde::Serialize;

use crate::{common::types::GuildId, player::track::Track};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackState {
    /// Nothing loaded. The idle deadline is armed while in this state.
    Idle,
    /// A play instruction is in flight, or the session is backing off after
    /// the backend refused one.
    Loading,
    Playing,
    Paused,
    /// Terminal. The session is gone from the registry.
    Destroyed,
}

impl PlaybackState {
    pub fn has_track(self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }
}

/// Observable state of a guild session, as handed to the dashboard and to
/// `queue` callers. Owned copy; never aliases the live session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub guild_id: GuildId,
    pub state: PlaybackState,
    pub current: Option<Track>,
    pub queue: Vec<Track>,
    pub loop_enabled: bool,
    pub idle: bool,
}
