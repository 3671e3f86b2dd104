pub mod render;
pub mod sink;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub use self::{
    render::{Button, ButtonStyle, DashboardRenderer, DisplayPayload, EmbedRenderer},
    sink::{DashboardSink, LogSink},
};
use crate::{
    common::types::GuildId,
    player::{PlaybackState, SessionSnapshot},
};

/// Render and publish snapshots for one session until it is destroyed.
///
/// Runs apart from the session so a slow or failing sink never holds the
/// session lock. Snapshots that pile up while a publish is in flight are
/// collapsed to the newest.
pub fn spawn_worker(
    guild_id: GuildId,
    updates: flume::Receiver<SessionSnapshot>,
    renderer: Arc<dyn DashboardRenderer>,
    sink: Arc<dyn DashboardSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Ok(mut snapshot) = updates.recv_async().await {
            while let Ok(newer) = updates.try_recv() {
                snapshot = newer;
            }

            let payload = renderer.render(&snapshot);
            if let Err(e) = sink.publish(&guild_id, payload).await {
                warn!("[{}] dashboard update failed: {}", guild_id, e);
            }

            if snapshot.state == PlaybackState::Destroyed {
                break;
            }
        }
        debug!("[{}] dashboard worker stopped", guild_id);
    })
}
