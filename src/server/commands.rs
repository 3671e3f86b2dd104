use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    common::{
        errors::{CommandError, SessionError},
        types::{ChannelId, GuildId, UserId},
    },
    dashboard::{DashboardRenderer, DashboardSink},
    player::{Enqueued, GuildSession, PlaybackState, SessionRegistry, SessionSnapshot, Track},
    sources::TrackResolver,
};

/// How many candidates a search offers.
pub const SEARCH_CANDIDATES: usize = 5;

/// What a play command did, for the reply to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    Started(Track),
    Queued { track: Track, position: usize },
    QueuedPlaylist { count: usize },
}

/// Entry points for whatever takes user input. Each call names its guild.
pub struct Commands {
    registry: Arc<SessionRegistry>,
    resolver: Arc<dyn TrackResolver>,
    renderer: Arc<dyn DashboardRenderer>,
    sink: Arc<dyn DashboardSink>,
}

impl Commands {
    pub fn new(
        registry: Arc<SessionRegistry>,
        resolver: Arc<dyn TrackResolver>,
        renderer: Arc<dyn DashboardRenderer>,
        sink: Arc<dyn DashboardSink>,
    ) -> Self {
        Self {
            registry,
            resolver,
            renderer,
            sink,
        }
    }

    /// Resolve `query`, then queue the result on the guild's session, creating
    /// and connecting one if needed. Nothing is touched when resolution fails.
    /// A single track gets a "queued by" card on the dashboard sink.
    pub async fn handle_play(
        &self,
        guild_id: &GuildId,
        channel_id: ChannelId,
        requester: UserId,
        query: &str,
    ) -> Result<PlayOutcome, CommandError> {
        let tracks = match self.resolver.resolve(query).await {
            Ok(result) => result
                .into_tracks()
                .into_iter()
                .map(|track| track.with_requester(requester))
                .collect::<Vec<_>>(),
            Err(e) => {
                warn!("[{}] could not resolve {:?}: {}", guild_id, query, e);
                return Err(CommandError::NoResults);
            }
        };
        let Some(first) = tracks.first().cloned() else {
            return Err(CommandError::NoResults);
        };
        let count = tracks.len();

        let enqueued = match self.enqueue(guild_id, channel_id, tracks.clone()).await {
            // Torn down between lookup and enqueue; a fresh session takes it.
            Err(SessionError::Destroyed(_)) => {
                debug!("[{}] session went away, retrying", guild_id);
                self.enqueue(guild_id, channel_id, tracks).await?
            }
            other => other?,
        };

        let outcome = match enqueued {
            Enqueued::Rejected => return Err(CommandError::Unplayable),
            _ if count > 1 => return Ok(PlayOutcome::QueuedPlaylist { count }),
            Enqueued::Started => PlayOutcome::Started(first.clone()),
            Enqueued::Queued { position } => PlayOutcome::Queued {
                track: first.clone(),
                position,
            },
        };

        let card = self.renderer.render_queued(&first, requester);
        if let Err(e) = self.sink.publish(guild_id, card).await {
            warn!("[{}] could not announce {}: {}", guild_id, first, e);
        }
        Ok(outcome)
    }

    /// Candidates for `query` without queueing anything, best match first.
    pub async fn handle_search(&self, query: &str) -> Result<Vec<Track>, CommandError> {
        match self.resolver.search(query, SEARCH_CANDIDATES).await {
            Ok(tracks) => Ok(tracks),
            Err(e) => {
                warn!("could not search {:?}: {}", query, e);
                Err(CommandError::NoResults)
            }
        }
    }

    /// Returns the track that was skipped, if one was loaded.
    pub async fn handle_skip(&self, guild_id: &GuildId) -> Result<Option<Track>, CommandError> {
        Ok(self.session(guild_id)?.skip().await?)
    }

    pub async fn handle_pause_toggle(
        &self,
        guild_id: &GuildId,
    ) -> Result<PlaybackState, CommandError> {
        self.session(guild_id)?
            .toggle_pause()
            .await?
            .ok_or(CommandError::NothingPlaying)
    }

    pub async fn handle_pause(&self, guild_id: &GuildId) -> Result<PlaybackState, CommandError> {
        self.session(guild_id)?
            .set_paused(true)
            .await?
            .ok_or(CommandError::NothingPlaying)
    }

    pub async fn handle_resume(&self, guild_id: &GuildId) -> Result<PlaybackState, CommandError> {
        self.session(guild_id)?
            .set_paused(false)
            .await?
            .ok_or(CommandError::NothingPlaying)
    }

    /// Tear the session down and leave voice.
    pub async fn handle_stop(&self, guild_id: &GuildId) -> Result<(), CommandError> {
        self.session(guild_id)?.destroy().await;
        Ok(())
    }

    /// Returns whether loop mode is now on.
    pub async fn handle_loop_toggle(&self, guild_id: &GuildId) -> Result<bool, CommandError> {
        Ok(self.session(guild_id)?.toggle_loop().await?)
    }

    pub async fn handle_queue(&self, guild_id: &GuildId) -> Result<SessionSnapshot, CommandError> {
        Ok(self.session(guild_id)?.snapshot().await?)
    }

    async fn enqueue(
        &self,
        guild_id: &GuildId,
        channel_id: ChannelId,
        tracks: Vec<Track>,
    ) -> Result<Enqueued, SessionError> {
        let session = self.registry.ensure_session(guild_id, channel_id).await?;
        session.enqueue(tracks).await
    }

    fn session(&self, guild_id: &GuildId) -> Result<Arc<GuildSession>, CommandError> {
        self.registry.get(guild_id).ok_or(CommandError::NoSession)
    }
}
