use std::sync::{Arc, Weak};

use dashmap::{DashMap, mapref::entry::Entry};
use tracing::{debug, info};

use crate::{
    backend::PlaybackBackend,
    common::{
        errors::SessionError,
        types::{ChannelId, GuildId},
    },
    configs::PlayerConfig,
    dashboard::{self, DashboardRenderer, DashboardSink},
    player::session::GuildSession,
};

/// Guild id to live session. At most one non-destroyed session per guild.
pub struct SessionRegistry {
    sessions: DashMap<GuildId, Arc<GuildSession>>,
    backend: Arc<dyn PlaybackBackend>,
    renderer: Arc<dyn DashboardRenderer>,
    sink: Arc<dyn DashboardSink>,
    config: PlayerConfig,
    this: Weak<SessionRegistry>,
}

impl SessionRegistry {
    pub fn new(
        backend: Arc<dyn PlaybackBackend>,
        renderer: Arc<dyn DashboardRenderer>,
        sink: Arc<dyn DashboardSink>,
        config: PlayerConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            sessions: DashMap::new(),
            backend,
            renderer,
            sink,
            config,
            this: this.clone(),
        })
    }

    /// Return the guild's live session, creating and connecting one if needed.
    ///
    /// Creation happens inside the map entry, so two callers racing for the
    /// same guild end up sharing one session and one voice join. A destroyed
    /// session keeps its entry until teardown has left voice; the replacement
    /// is only created after that, so it never shares the guild's connection
    /// with its predecessor.
    pub async fn ensure_session(
        &self,
        guild_id: &GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<GuildSession>, SessionError> {
        let session = loop {
            match self.sessions.entry(guild_id.clone()) {
                Entry::Occupied(entry) if entry.get().is_destroyed() => {
                    let stale = entry.get().clone();
                    drop(entry);
                    debug!("[{}] waiting for previous session to leave", guild_id);
                    stale.released().await;
                    self.remove(guild_id, &stale);
                }
                Entry::Occupied(entry) => break entry.get().clone(),
                Entry::Vacant(entry) => {
                    break entry
                        .insert(self.create(guild_id.clone(), channel_id))
                        .clone();
                }
            }
        };

        session.connect().await?;
        Ok(session)
    }

    /// Live session for `guild_id`, if any.
    pub fn get(&self, guild_id: &GuildId) -> Option<Arc<GuildSession>> {
        self.sessions
            .get(guild_id)
            .map(|entry| entry.value().clone())
            .filter(|session| !session.is_destroyed())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Remove `session` if it is still the one registered for the guild. A
    /// replacement created after it was destroyed stays put.
    pub(crate) fn remove(&self, guild_id: &GuildId, session: &GuildSession) {
        let removed = self
            .sessions
            .remove_if(guild_id, |_, registered| {
                std::ptr::eq(Arc::as_ptr(registered), session)
            })
            .is_some();
        if removed {
            debug!("[{}] removed from registry", guild_id);
        }
    }

    /// Destroy every session. Used on process shutdown.
    pub async fn shutdown(&self) {
        let sessions: Vec<_> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        info!("Destroying {} session(s)", sessions.len());
        for session in sessions {
            session.destroy().await;
        }
    }

    fn create(&self, guild_id: GuildId, channel_id: ChannelId) -> Arc<GuildSession> {
        info!("[{}] creating session for channel {}", guild_id, channel_id);
        let (tx, rx) = flume::unbounded();
        dashboard::spawn_worker(
            guild_id.clone(),
            rx,
            self.renderer.clone(),
            self.sink.clone(),
        );
        GuildSession::new(
            guild_id,
            channel_id,
            self.backend.clone(),
            self.config.clone(),
            self.this.clone(),
            tx,
        )
    }
}
