use std::sync::{
    Arc, Weak,
    atomic::{AtomicBool, Ordering},
};

use futures::future::BoxFuture;
use tokio::sync::{Mutex, MutexGuard, OnceCell};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    backend::{PlaybackBackend, TrackEndReason, VoiceConnection},
    common::{
        errors::SessionError,
        types::{ChannelId, GuildId},
    },
    configs::PlayerConfig,
    player::{
        queue::TrackQueue,
        registry::SessionRegistry,
        state::{PlaybackState, SessionSnapshot},
        timer::DeadlineTimer,
        track::Track,
    },
};

/// Why the queue is being moved forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Advance {
    /// Nothing is audible: session start, natural end, or a back-off retry.
    Settle,
    /// The backend may still be playing the track being left behind.
    Interrupt,
}

/// What `enqueue` did with the first of the submitted tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// The session was idle and playback started.
    Started,
    /// 1-based position among the upcoming tracks.
    Queued { position: usize },
    /// The session was idle and the backend refused every submitted track.
    Rejected,
}

struct SessionInner {
    queue: TrackQueue,
    current: Option<Track>,
    state: PlaybackState,
    loop_enabled: bool,
    idle: DeadlineTimer,
    retry: DeadlineTimer,
}

/// Per-guild playback state machine.
///
/// All queue and playback mutation happens under `inner`, a FIFO-fair async
/// mutex held across backend calls, so overlapping commands for one guild are
/// applied in the order they acquired it.
pub struct GuildSession {
    guild_id: GuildId,
    channel_id: ChannelId,
    backend: Arc<dyn PlaybackBackend>,
    config: PlayerConfig,
    inner: Mutex<SessionInner>,
    connection: OnceCell<VoiceConnection>,
    destroyed: AtomicBool,
    released: CancellationToken,
    registry: Weak<SessionRegistry>,
    updates: flume::Sender<SessionSnapshot>,
    this: Weak<GuildSession>,
}

impl GuildSession {
    pub(crate) fn new(
        guild_id: GuildId,
        channel_id: ChannelId,
        backend: Arc<dyn PlaybackBackend>,
        config: PlayerConfig,
        registry: Weak<SessionRegistry>,
        updates: flume::Sender<SessionSnapshot>,
    ) -> Arc<Self> {
        let loop_enabled = config.loop_by_default;
        Arc::new_cyclic(|this| Self {
            guild_id,
            channel_id,
            backend,
            config,
            inner: Mutex::new(SessionInner {
                queue: TrackQueue::new(),
                current: None,
                state: PlaybackState::Idle,
                loop_enabled,
                idle: DeadlineTimer::new(),
                retry: DeadlineTimer::new(),
            }),
            connection: OnceCell::new(),
            destroyed: AtomicBool::new(false),
            released: CancellationToken::new(),
            registry,
            updates,
            this: this.clone(),
        })
    }

    pub fn guild_id(&self) -> &GuildId {
        &self.guild_id
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Join voice once; concurrent callers share the same attempt. Runs the
    /// construction-completion advance, which arms the idle deadline.
    ///
    /// The join happens under the session lock, so a `destroy` racing it
    /// tears down only after the join settled and leaves exactly once.
    pub(crate) async fn connect(&self) -> Result<&VoiceConnection, SessionError> {
        self.connection
            .get_or_try_init(|| async {
                let mut inner = self.inner.lock().await;
                if self.is_destroyed() {
                    return Err(self.destroyed_error());
                }

                let connection = match self
                    .backend
                    .join_voice_channel(&self.guild_id, self.channel_id)
                    .await
                {
                    Ok(connection) => connection,
                    Err(source) => {
                        warn!("[{}] voice join failed: {}", self.guild_id, source);
                        if !self.destroyed.swap(true, Ordering::SeqCst) {
                            self.teardown(&mut inner).await;
                        }
                        return Err(SessionError::Connect {
                            guild_id: self.guild_id.clone(),
                            source,
                        });
                    }
                };

                // Stopped while the join was in flight. The pending teardown
                // is queued on the lock and leaves once we release it.
                if self.is_destroyed() {
                    return Err(self.destroyed_error());
                }

                info!(
                    "[{}] joined voice channel {}",
                    self.guild_id, self.channel_id
                );
                self.advance_locked(&mut inner, Advance::Settle).await;
                self.publish(&inner);
                Ok(connection)
            })
            .await
    }

    /// Resolves once teardown has left voice and dropped out of the registry.
    pub(crate) async fn released(&self) {
        self.released.cancelled().await
    }

    /// Append `tracks` in order. Starts playback if the session was idle.
    pub async fn enqueue(&self, tracks: Vec<Track>) -> Result<Enqueued, SessionError> {
        let mut inner = self.lock().await?;
        inner.idle.cancel();

        let position = inner.queue.len() + 1;
        debug!("[{}] enqueue {} track(s)", self.guild_id, tracks.len());
        inner.queue.extend(tracks);

        let outcome = if inner.state == PlaybackState::Idle {
            self.advance_locked(&mut inner, Advance::Settle).await;
            match (&inner.current, inner.queue.is_empty()) {
                (Some(_), _) => Enqueued::Started,
                (None, false) => Enqueued::Queued { position: 1 },
                (None, true) => Enqueued::Rejected,
            }
        } else {
            Enqueued::Queued { position }
        };

        self.publish(&inner);
        Ok(outcome)
    }

    /// Move to the next track, or go idle when there is none.
    pub async fn advance(&self) -> Result<(), SessionError> {
        let mut inner = self.lock().await?;
        self.advance_locked(&mut inner, Advance::Settle).await;
        self.publish(&inner);
        Ok(())
    }

    /// Force the next track regardless of state. Returns the track left behind.
    pub async fn skip(&self) -> Result<Option<Track>, SessionError> {
        let mut inner = self.lock().await?;
        let skipped = inner.current.clone();
        if let Some(track) = &skipped {
            info!("[{}] skipping {}", self.guild_id, track);
        }
        self.advance_locked(&mut inner, Advance::Interrupt).await;
        self.publish(&inner);
        Ok(skipped)
    }

    /// Flip between playing and paused. `None` when nothing is loaded.
    pub async fn toggle_pause(&self) -> Result<Option<PlaybackState>, SessionError> {
        let mut inner = self.lock().await?;
        let pause = match inner.state {
            PlaybackState::Playing => true,
            PlaybackState::Paused => false,
            _ => return Ok(None),
        };
        Ok(Some(self.set_paused_locked(&mut inner, pause).await))
    }

    /// Pause or resume explicitly. Already being in the requested state is fine.
    pub async fn set_paused(&self, pause: bool) -> Result<Option<PlaybackState>, SessionError> {
        let mut inner = self.lock().await?;
        if !inner.state.has_track() {
            return Ok(None);
        }
        Ok(Some(self.set_paused_locked(&mut inner, pause).await))
    }

    pub async fn set_loop(&self, enabled: bool) -> Result<bool, SessionError> {
        let mut inner = self.lock().await?;
        inner.loop_enabled = enabled;
        self.publish(&inner);
        Ok(enabled)
    }

    pub async fn toggle_loop(&self) -> Result<bool, SessionError> {
        let mut inner = self.lock().await?;
        inner.loop_enabled = !inner.loop_enabled;
        self.publish(&inner);
        Ok(inner.loop_enabled)
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let inner = self.lock().await?;
        Ok(self.snapshot_of(&inner))
    }

    #[cfg(test)]
    pub(crate) async fn idle_deadline(&self) -> Option<tokio::time::Instant> {
        self.inner.lock().await.idle.deadline()
    }

    /// Backend reported the end of a track. Only a natural end moves the queue.
    pub async fn on_playback_ended(
        &self,
        reason: TrackEndReason,
        playback_ref: Option<&str>,
    ) -> Result<(), SessionError> {
        if !reason.is_natural() {
            debug!("[{}] track end ({:?}) already handled", self.guild_id, reason);
            return Ok(());
        }

        let mut inner = self.lock().await?;
        let Some(current) = &inner.current else {
            debug!("[{}] track end with nothing loaded", self.guild_id);
            return Ok(());
        };
        if playback_ref.is_some_and(|r| r != current.playback_ref()) {
            debug!("[{}] stale track end for {}", self.guild_id, current);
            return Ok(());
        }

        self.advance_locked(&mut inner, Advance::Settle).await;
        self.publish(&inner);
        Ok(())
    }

    /// Backend accepted a track but could not load it. Same recovery as a
    /// refused play instruction.
    pub async fn on_load_failed(&self, playback_ref: Option<&str>) -> Result<(), SessionError> {
        let mut inner = self.lock().await?;
        match &inner.current {
            Some(current) if playback_ref.is_none_or(|r| r == current.playback_ref()) => {
                warn!("[{}] {} failed to load", self.guild_id, current);
            }
            _ => return Ok(()),
        }

        self.recover_start_failure(&mut inner, Advance::Settle).await;
        self.publish(&inner);
        Ok(())
    }

    pub async fn on_connection_closed(&self) {
        warn!("[{}] voice connection closed", self.guild_id);
        self.destroy().await;
    }

    /// Clear everything, leave voice, drop out of the registry. Idempotent.
    pub async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut inner = self.inner.lock().await;
        self.teardown(&mut inner).await;
    }

    async fn teardown(&self, inner: &mut SessionInner) {
        inner.idle.cancel();
        inner.retry.cancel();
        inner.queue.clear();
        inner.current = None;
        inner.state = PlaybackState::Destroyed;

        if let Err(e) = self.backend.leave_voice_channel(&self.guild_id).await {
            warn!("[{}] failed to leave voice: {}", self.guild_id, e);
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.guild_id, self);
        }

        self.publish(inner);
        self.released.cancel();
        info!("[{}] session destroyed", self.guild_id);
    }

    async fn lock(&self) -> Result<MutexGuard<'_, SessionInner>, SessionError> {
        let inner = self.inner.lock().await;
        if self.is_destroyed() {
            return Err(self.destroyed_error());
        }
        Ok(inner)
    }

    async fn advance_locked(&self, inner: &mut SessionInner, mode: Advance) {
        inner.retry.cancel();

        let previous = inner.current.take();
        let had_track = previous.is_some();
        if inner.loop_enabled {
            if let Some(track) = previous {
                inner.queue.push_back(track);
            }
        }

        let Some(next) = inner.queue.pop_front() else {
            if had_track && mode == Advance::Interrupt {
                self.stop_backend().await;
            }
            self.enter_idle(inner);
            return;
        };

        inner.idle.cancel();
        inner.state = PlaybackState::Loading;

        match self.backend.play(&self.guild_id, &next).await {
            Ok(()) => {
                info!("[{}] now playing {}", self.guild_id, next);
                inner.current = Some(next);
                inner.state = PlaybackState::Playing;
            }
            Err(e) => {
                warn!("[{}] backend refused {}: {}", self.guild_id, next, e);
                self.recover_start_failure(inner, mode).await;
            }
        }
    }

    /// Drop the failed track and retry after a fixed back-off. The queue is
    /// finite, so retries stop once it drains.
    async fn recover_start_failure(&self, inner: &mut SessionInner, mode: Advance) {
        inner.current = None;
        if mode == Advance::Interrupt {
            self.stop_backend().await;
        }

        if inner.queue.is_empty() {
            self.enter_idle(inner);
            return;
        }

        inner.state = PlaybackState::Loading;
        let backoff = self.config.retry_backoff();
        debug!("[{}] next attempt in {:?}", self.guild_id, backoff);
        let session = self.this.clone();
        inner
            .retry
            .arm(backoff, move |generation| Self::retry_elapsed(session, generation));
    }

    fn enter_idle(&self, inner: &mut SessionInner) {
        inner.current = None;
        inner.state = PlaybackState::Idle;
        if inner.idle.is_armed() {
            return;
        }

        debug!(
            "[{}] idle, leaving in {:?}",
            self.guild_id,
            self.config.idle_timeout()
        );
        let session = self.this.clone();
        inner.idle.arm(self.config.idle_timeout(), move |generation| {
            Self::idle_elapsed(session, generation)
        });
    }

    fn retry_elapsed(session: Weak<Self>, generation: u64) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            let Some(session) = session.upgrade() else {
                return;
            };
            let Ok(mut inner) = session.lock().await else {
                return;
            };
            if !inner.retry.claim(generation) {
                return;
            }
            session.advance_locked(&mut inner, Advance::Settle).await;
            session.publish(&inner);
        })
    }

    fn idle_elapsed(session: Weak<Self>, generation: u64) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            let Some(session) = session.upgrade() else {
                return;
            };
            let mut inner = session.inner.lock().await;
            if !inner.idle.claim(generation) {
                return;
            }
            if session.destroyed.swap(true, Ordering::SeqCst) {
                return;
            }
            info!("[{}] idle deadline elapsed", session.guild_id);
            session.teardown(&mut inner).await;
        })
    }

    async fn set_paused_locked(&self, inner: &mut SessionInner, pause: bool) -> PlaybackState {
        let target = if pause {
            PlaybackState::Paused
        } else {
            PlaybackState::Playing
        };
        if inner.state == target {
            return target;
        }

        let result = if pause {
            self.backend.pause(&self.guild_id).await
        } else {
            self.backend.resume(&self.guild_id).await
        };
        match result {
            Ok(()) => {
                inner.state = target;
                self.publish(inner);
            }
            Err(e) => warn!("[{}] pause toggle failed: {}", self.guild_id, e),
        }
        inner.state
    }

    async fn stop_backend(&self) {
        if let Err(e) = self.backend.stop(&self.guild_id).await {
            warn!("[{}] failed to stop playback: {}", self.guild_id, e);
        }
    }

    fn snapshot_of(&self, inner: &SessionInner) -> SessionSnapshot {
        SessionSnapshot {
            guild_id: self.guild_id.clone(),
            state: inner.state,
            current: inner.current.clone(),
            queue: inner.queue.to_vec(),
            loop_enabled: inner.loop_enabled,
            idle: inner.idle.is_armed(),
        }
    }

    /// Push state outward. The dashboard worker may be gone; that is not
    /// the session's problem.
    fn publish(&self, inner: &SessionInner) {
        let _ = self.updates.send(self.snapshot_of(inner));
    }

    fn destroyed_error(&self) -> SessionError {
        SessionError::Destroyed(self.guild_id.clone())
    }
}
