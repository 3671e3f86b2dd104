use serde::Serialize;

use crate::{common::types::UserId, protocol::tracks::RemoteTrack};

/// A playable item. Immutable once built; clones are cheap enough to hand out
/// in snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    id: String,
    title: String,
    artist: String,
    artwork_url: Option<String>,
    /// Who asked for it. Unset for tracks that come straight from a resolver.
    requester: Option<UserId>,
    #[serde(skip)]
    playback_ref: String,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        artwork_url: Option<String>,
        playback_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            artwork_url,
            requester: None,
            playback_ref: playback_ref.into(),
        }
    }

    pub fn with_requester(self, requester: UserId) -> Self {
        Self {
            requester: Some(requester),
            ..self
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn artwork_url(&self) -> Option<&str> {
        self.artwork_url.as_deref()
    }

    pub fn requester(&self) -> Option<UserId> {
        self.requester
    }

    /// Opaque handle only the playback backend understands.
    pub fn playback_ref(&self) -> &str {
        &self.playback_ref
    }
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.title, self.artist)
    }
}

impl From<RemoteTrack> for Track {
    fn from(remote: RemoteTrack) -> Self {
        Self {
            id: remote.info.identifier,
            title: remote.info.title,
            artist: remote.info.author,
            artwork_url: remote.info.artwork_url,
            requester: None,
            playback_ref: remote.encoded,
        }
    }
}
