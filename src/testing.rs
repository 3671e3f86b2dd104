//! Test doubles shared across module tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    backend::{PlaybackBackend, VoiceConnection},
    common::{
        errors::{BackendError, DisplayError, ResolveError},
        types::{ChannelId, GuildId},
    },
    configs::PlayerConfig,
    dashboard::{DashboardSink, DisplayPayload, EmbedRenderer},
    player::{SessionRegistry, Track},
    sources::{ResolveResult, TrackResolver},
};

pub fn track(id: &str) -> Track {
    Track::new(id, format!("title {id}"), "artist", None, format!("ref-{id}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Join(GuildId),
    Leave(GuildId),
    /// Track id.
    Play(String),
    Pause,
    Resume,
    Stop,
}

/// Records every call. Yields before answering so concurrent callers really
/// interleave.
#[derive(Default)]
pub struct MockBackend {
    calls: Mutex<Vec<Call>>,
    refused: Mutex<HashSet<String>>,
    refuse_joins: AtomicBool,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Reject `play` for the track with this id.
    pub fn refuse(&self, id: &str) {
        self.refused.lock().insert(format!("ref-{id}"));
    }

    pub fn refuse_joins(&self) {
        self.refuse_joins.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn plays(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::Play(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &Call) -> usize {
        self.calls.lock().iter().filter(|call| *call == wanted).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl PlaybackBackend for MockBackend {
    async fn join_voice_channel(
        &self,
        guild_id: &GuildId,
        channel_id: ChannelId,
    ) -> Result<VoiceConnection, BackendError> {
        tokio::task::yield_now().await;
        self.record(Call::Join(guild_id.clone()));
        if self.refuse_joins.load(Ordering::SeqCst) {
            return Err(BackendError::VoiceTimeout(guild_id.clone()));
        }
        Ok(VoiceConnection {
            guild_id: guild_id.clone(),
            channel_id,
            session_id: "voice".into(),
        })
    }

    async fn leave_voice_channel(&self, guild_id: &GuildId) -> Result<(), BackendError> {
        tokio::task::yield_now().await;
        self.record(Call::Leave(guild_id.clone()));
        Ok(())
    }

    async fn play(&self, _guild_id: &GuildId, track: &Track) -> Result<(), BackendError> {
        tokio::task::yield_now().await;
        self.record(Call::Play(track.id().to_string()));
        if self.refused.lock().contains(track.playback_ref()) {
            return Err(BackendError::Rejected {
                status: 500,
                message: "refused".into(),
            });
        }
        Ok(())
    }

    async fn pause(&self, _guild_id: &GuildId) -> Result<(), BackendError> {
        tokio::task::yield_now().await;
        self.record(Call::Pause);
        Ok(())
    }

    async fn resume(&self, _guild_id: &GuildId) -> Result<(), BackendError> {
        tokio::task::yield_now().await;
        self.record(Call::Resume);
        Ok(())
    }

    async fn stop(&self, _guild_id: &GuildId) -> Result<(), BackendError> {
        tokio::task::yield_now().await;
        self.record(Call::Stop);
        Ok(())
    }
}

/// Answers from a fixed table. Unknown queries match nothing; `"broken"`
/// fails.
#[derive(Default)]
pub struct StaticResolver {
    results: HashMap<String, ResolveResult>,
}

impl StaticResolver {
    pub fn with(mut self, query: &str, result: ResolveResult) -> Self {
        self.results.insert(query.to_string(), result);
        self
    }
}

#[async_trait]
impl TrackResolver for StaticResolver {
    async fn resolve(&self, query: &str) -> Result<ResolveResult, ResolveError> {
        if query == "broken" {
            return Err(ResolveError::Load("broken".into()));
        }
        Ok(self
            .results
            .get(query)
            .cloned()
            .unwrap_or(ResolveResult::NoMatch))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    published: Mutex<Vec<DisplayPayload>>,
}

impl RecordingSink {
    pub fn published(&self) -> Vec<DisplayPayload> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl DashboardSink for RecordingSink {
    async fn publish(
        &self,
        _guild_id: &GuildId,
        payload: DisplayPayload,
    ) -> Result<(), DisplayError> {
        self.published.lock().push(payload);
        Ok(())
    }
}

pub struct FailingSink;

#[async_trait]
impl DashboardSink for FailingSink {
    async fn publish(
        &self,
        guild_id: &GuildId,
        _payload: DisplayPayload,
    ) -> Result<(), DisplayError> {
        Err(DisplayError::MessageGone(guild_id.clone()))
    }
}

pub fn registry(backend: Arc<MockBackend>) -> Arc<SessionRegistry> {
    registry_with(backend, PlayerConfig::default())
}

pub fn registry_with(backend: Arc<MockBackend>, config: PlayerConfig) -> Arc<SessionRegistry> {
    SessionRegistry::new(
        backend,
        Arc::new(EmbedRenderer),
        Arc::new(FailingSink),
        config,
    )
}
