use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::{
    backend::{BackendEvent, TrackEndReason},
    player::{GuildSession, SessionRegistry},
};

/// Route backend events to their sessions until cancelled or the backend
/// hangs up.
pub async fn run(
    registry: Arc<SessionRegistry>,
    events: flume::Receiver<BackendEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv_async() => match event {
                Ok(event) => dispatch(&registry, event),
                Err(_) => break,
            }
        }
    }
    debug!("Event dispatcher stopped");
}

/// Hand one event to its session on a task of its own, so a session busy
/// talking to the backend never stalls events for other guilds.
pub fn dispatch(registry: &SessionRegistry, event: BackendEvent) {
    let Some(session) = registry.get(event.guild_id()) else {
        trace!("[{}] no session for {:?}", event.guild_id(), event);
        return;
    };
    tokio::spawn(route(session, event));
}

async fn route(session: Arc<GuildSession>, event: BackendEvent) {
    let result = match event {
        BackendEvent::TrackStarted { playback_ref, .. } => {
            debug!("[{}] backend started {}", session.guild_id(), playback_ref);
            Ok(())
        }
        BackendEvent::TrackEnded {
            reason: TrackEndReason::LoadFailed,
            playback_ref,
            ..
        } => session.on_load_failed(playback_ref.as_deref()).await,
        BackendEvent::TrackEnded {
            reason,
            playback_ref,
            ..
        } => {
            session
                .on_playback_ended(reason, playback_ref.as_deref())
                .await
        }
        BackendEvent::ConnectionClosed {
            code, by_remote, ..
        } => {
            info!(
                "[{}] connection closed (code {}, remote: {})",
                session.guild_id(),
                code,
                by_remote
            );
            session.on_connection_closed().await;
            Ok(())
        }
    };

    if let Err(e) = result {
        debug!("[{}] event dropped: {}", session.guild_id(), e);
    }
}
