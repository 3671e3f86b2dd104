use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::debug;

use crate::{
    common::{
        errors::BackendError,
        types::{ChannelId, GuildId},
    },
    protocol::models::VoiceState,
};

/// Asks the chat gateway to move the bot. Whoever owns the gateway
/// connection drains these and answers joins through [`VoiceRelay::provide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceRequest {
    Join {
        guild_id: GuildId,
        channel_id: ChannelId,
    },
    Leave {
        guild_id: GuildId,
    },
}

/// Bridges voice-state handshakes between the chat gateway and the node.
pub struct VoiceRelay {
    requests: flume::Sender<VoiceRequest>,
    pending: DashMap<GuildId, oneshot::Sender<VoiceState>>,
    timeout: Duration,
}

impl VoiceRelay {
    pub fn new(timeout: Duration) -> (Arc<Self>, flume::Receiver<VoiceRequest>) {
        let (requests, rx) = flume::unbounded();
        let relay = Arc::new(Self {
            requests,
            pending: DashMap::new(),
            timeout,
        });
        (relay, rx)
    }

    /// Request a join and wait for the gateway to hand back credentials.
    pub async fn connect(
        &self,
        guild_id: &GuildId,
        channel_id: ChannelId,
    ) -> Result<VoiceState, BackendError> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(guild_id.clone(), tx);

        let request = VoiceRequest::Join {
            guild_id: guild_id.clone(),
            channel_id,
        };
        if self.requests.send(request).is_err() {
            self.pending.remove(guild_id);
            return Err(BackendError::RelayClosed);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(mut state)) => {
                state
                    .channel_id
                    .get_or_insert_with(|| channel_id.to_string());
                Ok(state)
            }
            // Superseded by a newer join or by a leave.
            Ok(Err(_)) => Err(BackendError::RelayClosed),
            Err(_) => {
                self.pending.remove_if(guild_id, |_, tx| tx.is_closed());
                Err(BackendError::VoiceTimeout(guild_id.clone()))
            }
        }
    }

    pub fn disconnect(&self, guild_id: &GuildId) {
        self.pending.remove(guild_id);
        let _ = self.requests.send(VoiceRequest::Leave {
            guild_id: guild_id.clone(),
        });
    }

    /// Deliver credentials for a pending join. False if nobody was waiting.
    pub fn provide(&self, guild_id: &GuildId, state: VoiceState) -> bool {
        match self.pending.remove(guild_id) {
            Some((_, tx)) => tx.send(state).is_ok(),
            None => {
                debug!("[{}] voice state with no pending join", guild_id);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> VoiceState {
        VoiceState {
            token: "tok".into(),
            endpoint: "eu.discord.media".into(),
            session_id: "sess".into(),
            channel_id: None,
        }
    }

    #[tokio::test]
    async fn test_provide_completes_connect() {
        let (relay, requests) = VoiceRelay::new(Duration::from_secs(5));
        let guild = GuildId::from("1");

        let pending = tokio::spawn({
            let relay = relay.clone();
            let guild = guild.clone();
            async move { relay.connect(&guild, ChannelId(7)).await }
        });

        let request = requests.recv_async().await.unwrap();
        assert_eq!(
            request,
            VoiceRequest::Join {
                guild_id: guild.clone(),
                channel_id: ChannelId(7),
            }
        );
        assert!(relay.provide(&guild, state()));

        let voice = pending.await.unwrap().unwrap();
        assert_eq!(voice.session_id, "sess");
        assert_eq!(voice.channel_id.as_deref(), Some("7"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_times_out() {
        let (relay, _requests) = VoiceRelay::new(Duration::from_secs(2));
        let guild = GuildId::from("1");

        let err = relay.connect(&guild, ChannelId(7)).await.unwrap_err();
        assert!(matches!(err, BackendError::VoiceTimeout(_)));
        assert!(!relay.provide(&guild, state()));
    }

    #[tokio::test]
    async fn test_closed_relay() {
        let (relay, requests) = VoiceRelay::new(Duration::from_secs(2));
        drop(requests);

        let err = relay.connect(&GuildId::from("1"), ChannelId(7)).await.unwrap_err();
        assert!(matches!(err, BackendError::RelayClosed));
    }
}
