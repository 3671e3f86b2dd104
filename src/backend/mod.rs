pub mod lavalink;
pub mod voice;

use async_trait::async_trait;

pub use self::{lavalink::LavalinkNode, voice::VoiceRelay};
pub use crate::protocol::events::TrackEndReason;
use crate::{
    common::{
        errors::BackendError,
        types::{ChannelId, GuildId},
    },
    player::Track,
};

/// Proof that a guild's voice connection is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceConnection {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub session_id: String,
}

/// Whatever actually produces audio into a voice channel.
///
/// One backend serves every guild, so each call names the guild it acts on.
#[async_trait]
pub trait PlaybackBackend: Send + Sync {
    async fn join_voice_channel(
        &self,
        guild_id: &GuildId,
        channel_id: ChannelId,
    ) -> Result<VoiceConnection, BackendError>;

    async fn leave_voice_channel(&self, guild_id: &GuildId) -> Result<(), BackendError>;

    /// Start `track`, replacing whatever is playing.
    async fn play(&self, guild_id: &GuildId, track: &Track) -> Result<(), BackendError>;

    async fn pause(&self, guild_id: &GuildId) -> Result<(), BackendError>;

    async fn resume(&self, guild_id: &GuildId) -> Result<(), BackendError>;

    async fn stop(&self, guild_id: &GuildId) -> Result<(), BackendError>;
}

/// Lifecycle signals a backend emits. Each one names its guild so the
/// dispatcher can route it without holding onto the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    TrackStarted {
        guild_id: GuildId,
        playback_ref: String,
    },
    TrackEnded {
        guild_id: GuildId,
        /// The track that ended, when the backend says which.
        playback_ref: Option<String>,
        reason: TrackEndReason,
    },
    ConnectionClosed {
        guild_id: GuildId,
        code: u16,
        by_remote: bool,
    },
}

impl BackendEvent {
    pub fn guild_id(&self) -> &GuildId {
        match self {
            Self::TrackStarted { guild_id, .. }
            | Self::TrackEnded { guild_id, .. }
            | Self::ConnectionClosed { guild_id, .. } => guild_id,
        }
    }
}
