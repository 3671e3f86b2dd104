use thiserror::Error;

use crate::common::types::GuildId;

/// Failures talking to the playback backend (Lavalink node + voice relay).
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("node rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("node session is not ready")]
    NotReady,
    #[error("[{0}] timed out waiting for voice credentials")]
    VoiceTimeout(GuildId),
    #[error("voice relay is closed")]
    RelayClosed,
}

/// Failures turning a user query into tracks.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("load failed: {0}")]
    Load(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("[{0}] session was destroyed")]
    Destroyed(GuildId),
    #[error("[{guild_id}] could not join voice: {source}")]
    Connect {
        guild_id: GuildId,
        #[source]
        source: BackendError,
    },
}

/// Outcomes surfaced to whoever issued a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Nothing matched, or the resolver failed.
    #[error("no results")]
    NoResults,
    #[error("nothing is playing in this guild")]
    NoSession,
    #[error("no track is loaded")]
    NothingPlaying,
    #[error("the player could not start anything that was submitted")]
    Unplayable,
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Failures pushing a rendered dashboard to the chat surface.
#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("[{0}] dashboard message is gone")]
    MessageGone(GuildId),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config.toml or config.default.toml not found")]
    NotFound,
    #[error("{0} is empty")]
    Empty(String),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
