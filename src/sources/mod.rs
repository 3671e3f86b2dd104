pub mod lavalink;

use async_trait::async_trait;

use crate::{common::errors::ResolveError, player::Track};

/// Outcome of turning a query into something playable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveResult {
    NoMatch,
    SingleTrack(Track),
    /// A playlist or album, in source order.
    TrackList(Vec<Track>),
}

impl ResolveResult {
    pub fn into_tracks(self) -> Vec<Track> {
        match self {
            Self::NoMatch => Vec::new(),
            Self::SingleTrack(track) => vec![track],
            Self::TrackList(tracks) => tracks,
        }
    }
}

/// Turns free text or a direct URL into tracks.
///
/// Implementations decide how to tell the two apart; callers pass the raw
/// query through.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<ResolveResult, ResolveError>;

    /// Up to `limit` candidates for `query`, best match first. Used to offer
    /// choices before anything is queued.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Track>, ResolveError> {
        let mut tracks = self.resolve(query).await?.into_tracks();
        tracks.truncate(limit);
        Ok(tracks)
    }
}

/// Whether `query` is a direct reference rather than search text.
pub fn is_url(query: &str) -> bool {
    let query = query.trim_start();
    query.starts_with("http://") || query.starts_with("https://")
}
