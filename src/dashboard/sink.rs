use async_trait::async_trait;
use tracing::info;

use super::render::DisplayPayload;
use crate::common::{errors::DisplayError, types::GuildId};

/// Delivers a rendered dashboard to wherever users see it.
#[async_trait]
pub trait DashboardSink: Send + Sync {
    async fn publish(&self, guild_id: &GuildId, payload: DisplayPayload)
    -> Result<(), DisplayError>;
}

/// Writes dashboards to the log. Used when no chat surface is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl DashboardSink for LogSink {
    async fn publish(
        &self,
        guild_id: &GuildId,
        payload: DisplayPayload,
    ) -> Result<(), DisplayError> {
        let title = payload
            .title
            .map(|title| format!(" | {}", title))
            .unwrap_or_default();
        info!(
            "[{}] {}{} | {}",
            guild_id,
            payload.author,
            title,
            payload.description.replace('\n', " ")
        );
        Ok(())
    }
}
