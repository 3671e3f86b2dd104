use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashSet;
use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio_tungstenite::tungstenite::{
    client::IntoClientRequest, http::HeaderValue, protocol::Message,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::{
    backend::{BackendEvent, PlaybackBackend, VoiceConnection, voice::VoiceRelay},
    common::{
        errors::BackendError,
        http::node_client,
        types::{ChannelId, GuildId, SessionId},
    },
    configs::LavalinkConfig,
    player::Track,
    protocol::{
        events::{IncomingMessage, NodeEvent},
        models::PlayerUpdate,
    },
};

mod backoff;
mod rest;

use self::backoff::Backoff;

/// Close code reported for guilds whose players went away with the link.
const LINK_LOST_CODE: u16 = 1006;

enum LinkOutcome {
    Shutdown,
    Lost,
}

/// Client for a single Lavalink v4 node.
///
/// The websocket link delivers player events; REST drives the players. Node
/// players die with the link, so every guild that had one gets a
/// `ConnectionClosed` when the link drops.
pub struct LavalinkNode {
    config: LavalinkConfig,
    http: reqwest::Client,
    session_id: RwLock<Option<SessionId>>,
    events: flume::Sender<BackendEvent>,
    voice: Arc<VoiceRelay>,
    active: DashSet<GuildId>,
    cancel: CancellationToken,
}

impl LavalinkNode {
    pub fn new(
        config: LavalinkConfig,
        voice: Arc<VoiceRelay>,
    ) -> Result<(Arc<Self>, flume::Receiver<BackendEvent>), BackendError> {
        let http = node_client(&config.password, &config.client_name)?;
        let (events, rx) = flume::unbounded();
        let node = Arc::new(Self {
            config,
            http,
            session_id: RwLock::new(None),
            events,
            voice,
            active: DashSet::new(),
            cancel: CancellationToken::new(),
        });
        Ok((node, rx))
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id.read().clone()
    }

    pub fn search_prefix(&self) -> &str {
        &self.config.search_prefix
    }

    pub fn is_ready(&self) -> bool {
        self.session_id.read().is_some()
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Keep the websocket link up until shutdown or until reconnects run out.
    pub async fn run(self: Arc<Self>) -> Result<(), BackendError> {
        let mut backoff = Backoff::new(self.config.reconnect_attempts);

        loop {
            if self.cancel.is_cancelled() {
                return Ok(());
            }

            let outcome = self.connect(&mut backoff).await;
            self.link_lost();

            match outcome {
                Ok(LinkOutcome::Shutdown) => {
                    debug!("Node link shutting down cleanly");
                    return Ok(());
                }
                Ok(LinkOutcome::Lost) => {
                    if backoff.is_exhausted() {
                        warn!("Max node reconnect attempts reached");
                        return Ok(());
                    }
                    let delay = backoff.next();
                    warn!("Node link closed. Reconnecting in {:?}", delay);
                    self.sleep(delay).await;
                }
                Err(e) => {
                    if backoff.is_exhausted() {
                        error!("Node link error after max attempts: {}", e);
                        return Err(e);
                    }
                    let delay = backoff.next();
                    warn!("Node link error: {}. Retrying in {:?}", e, delay);
                    self.sleep(delay).await;
                }
            }
        }
    }

    async fn connect(&self, backoff: &mut Backoff) -> Result<LinkOutcome, BackendError> {
        let url = self.config.websocket_url();
        let mut request = url.as_str().into_client_request()?;
        let headers = request.headers_mut();
        headers.insert("Authorization", HeaderValue::from_str(&self.config.password)?);
        headers.insert(
            "User-Id",
            HeaderValue::from_str(&self.config.user_id.to_string())?,
        );
        headers.insert("Client-Name", HeaderValue::from_str(&self.config.client_name)?);

        debug!("Connecting to node: {}", url);
        let (ws_stream, _) = tokio_tungstenite::connect_async(request).await?;
        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(LinkOutcome::Shutdown);
                }
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => self.handle_message(text.as_str(), backoff),
                    Some(Ok(Message::Close(frame))) => {
                        info!("Node closed the link: {:?}", frame);
                        return Ok(LinkOutcome::Lost);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(LinkOutcome::Lost),
                }
            }
        }
    }

    fn handle_message(&self, text: &str, backoff: &mut Backoff) {
        let message = match serde_json::from_str::<IncomingMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Unparseable node message: {}", e);
                return;
            }
        };

        match message {
            IncomingMessage::Ready {
                resumed,
                session_id,
            } => {
                info!("Node ready (session {}, resumed: {})", session_id, resumed);
                *self.session_id.write() = Some(session_id);
                backoff.reset();
            }
            IncomingMessage::PlayerUpdate { guild_id, state } => {
                trace!(
                    "[{}] position {}ms, connected: {}",
                    guild_id, state.position, state.connected
                );
            }
            IncomingMessage::Stats => {}
            IncomingMessage::Event(event) => {
                if let Some(event) = translate(event) {
                    if let BackendEvent::ConnectionClosed { guild_id, .. } = &event {
                        self.active.remove(guild_id);
                    }
                    self.emit(event);
                }
            }
            IncomingMessage::Unknown => debug!("Ignoring unknown node op"),
        }
    }

    fn link_lost(&self) {
        self.session_id.write().take();

        let guilds: Vec<GuildId> = self.active.iter().map(|g| g.key().clone()).collect();
        self.active.clear();
        for guild_id in guilds {
            self.emit(BackendEvent::ConnectionClosed {
                guild_id,
                code: LINK_LOST_CODE,
                by_remote: true,
            });
        }
    }

    fn emit(&self, event: BackendEvent) {
        if self.events.send(event).is_err() {
            debug!("Backend event dropped: dispatcher is gone");
        }
    }

    async fn sleep(&self, delay: std::time::Duration) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Map a node event onto the backend's lifecycle vocabulary.
fn translate(event: NodeEvent) -> Option<BackendEvent> {
    match event {
        NodeEvent::TrackStart { guild_id, track } => Some(BackendEvent::TrackStarted {
            guild_id,
            playback_ref: track.encoded,
        }),
        NodeEvent::TrackEnd {
            guild_id,
            track,
            reason,
        } => Some(BackendEvent::TrackEnded {
            guild_id,
            playback_ref: Some(track.encoded),
            reason,
        }),
        // Followed by a TrackEnd carrying the outcome.
        NodeEvent::TrackException {
            guild_id,
            track,
            exception,
        } => {
            warn!(
                "[{}] {} threw: {}",
                guild_id,
                track.info.title,
                exception.message.as_deref().unwrap_or(&exception.cause)
            );
            None
        }
        NodeEvent::TrackStuck {
            guild_id,
            track,
            threshold_ms,
        } => {
            warn!(
                "[{}] {} stuck for {}ms",
                guild_id, track.info.title, threshold_ms
            );
            None
        }
        NodeEvent::WebSocketClosed {
            guild_id,
            code,
            reason,
            by_remote,
        } => {
            info!("[{}] voice websocket closed ({}): {}", guild_id, code, reason);
            Some(BackendEvent::ConnectionClosed {
                guild_id,
                code,
                by_remote,
            })
        }
        NodeEvent::Unknown => None,
    }
}

#[async_trait]
impl PlaybackBackend for LavalinkNode {
    async fn join_voice_channel(
        &self,
        guild_id: &GuildId,
        channel_id: ChannelId,
    ) -> Result<VoiceConnection, BackendError> {
        let voice = self.voice.connect(guild_id, channel_id).await?;
        let session_id = voice.session_id.clone();

        if let Err(e) = self.update_player(guild_id, &PlayerUpdate::voice(voice)).await {
            self.voice.disconnect(guild_id);
            return Err(e);
        }
        self.active.insert(guild_id.clone());

        Ok(VoiceConnection {
            guild_id: guild_id.clone(),
            channel_id,
            session_id,
        })
    }

    async fn leave_voice_channel(&self, guild_id: &GuildId) -> Result<(), BackendError> {
        self.active.remove(guild_id);
        let result = match self.destroy_player(guild_id).await {
            // No node session means no player left to destroy.
            Err(BackendError::NotReady) => Ok(()),
            other => other,
        };
        self.voice.disconnect(guild_id);
        result
    }

    async fn play(&self, guild_id: &GuildId, track: &Track) -> Result<(), BackendError> {
        self.update_player(guild_id, &PlayerUpdate::play(track.playback_ref()))
            .await
    }

    async fn pause(&self, guild_id: &GuildId) -> Result<(), BackendError> {
        self.update_player(guild_id, &PlayerUpdate::paused(true)).await
    }

    async fn resume(&self, guild_id: &GuildId) -> Result<(), BackendError> {
        self.update_player(guild_id, &PlayerUpdate::paused(false)).await
    }

    async fn stop(&self, guild_id: &GuildId) -> Result<(), BackendError> {
        self.update_player(guild_id, &PlayerUpdate::stop()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TrackEndReason;

    fn event(json: &str) -> NodeEvent {
        serde_json::from_str(json).unwrap()
    }

    const TRACK: &str = r#"{"encoded":"QAAB","info":{"identifier":"id","isSeekable":true,"author":"a","length":1,"isStream":false,"position":0,"title":"t","uri":null,"artworkUrl":null,"isrc":null,"sourceName":"http"}}"#;

    #[test]
    fn test_track_end_carries_ref_and_reason() {
        let json = format!(
            r#"{{"type":"TrackEndEvent","guildId":"9","track":{},"reason":"loadFailed"}}"#,
            TRACK
        );
        assert_eq!(
            translate(event(&json)),
            Some(BackendEvent::TrackEnded {
                guild_id: GuildId::from("9"),
                playback_ref: Some("QAAB".into()),
                reason: TrackEndReason::LoadFailed,
            })
        );
    }

    #[test]
    fn test_voice_close_becomes_connection_closed() {
        let json = r#"{"type":"WebSocketClosedEvent","guildId":"9","code":4014,"reason":"Disconnected","byRemote":true}"#;
        assert_eq!(
            translate(event(json)),
            Some(BackendEvent::ConnectionClosed {
                guild_id: GuildId::from("9"),
                code: 4014,
                by_remote: true,
            })
        );
    }

    #[test]
    fn test_exception_and_stuck_are_not_forwarded() {
        let exception = format!(
            r#"{{"type":"TrackExceptionEvent","guildId":"9","track":{},"exception":{{"message":"boom","severity":"fault","cause":"x"}}}}"#,
            TRACK
        );
        let stuck = format!(
            r#"{{"type":"TrackStuckEvent","guildId":"9","track":{},"thresholdMs":10000}}"#,
            TRACK
        );
        assert_eq!(translate(event(&exception)), None);
        assert_eq!(translate(event(&stuck)), None);
    }

    #[tokio::test]
    async fn test_link_loss_closes_active_guilds() {
        let (relay, _requests) = VoiceRelay::new(std::time::Duration::from_secs(1));
        let (node, events) = LavalinkNode::new(LavalinkConfig::default(), relay).unwrap();
        *node.session_id.write() = Some(SessionId::from("s".to_string()));
        node.active.insert(GuildId::from("1"));

        node.link_lost();

        assert!(!node.is_ready());
        assert_eq!(
            events.try_recv().unwrap(),
            BackendEvent::ConnectionClosed {
                guild_id: GuildId::from("1"),
                code: LINK_LOST_CODE,
                by_remote: true,
            }
        );
        assert!(events.try_recv().is_err());
    }
}
