use async_trait::async_trait;
use tracing::debug;

use super::{ResolveResult, TrackResolver, is_url};
use crate::{
    backend::LavalinkNode,
    common::errors::ResolveError,
    player::Track,
    protocol::tracks::LoadResult,
};

#[async_trait]
impl TrackResolver for LavalinkNode {
    async fn resolve(&self, query: &str) -> Result<ResolveResult, ResolveError> {
        let identifier = search_identifier(self.search_prefix(), query);
        debug!("Loading tracks for {}", identifier);
        let result = self.load_tracks(&identifier).await?;
        into_resolve_result(result)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Track>, ResolveError> {
        let identifier = search_identifier(self.search_prefix(), query);
        debug!("Searching candidates for {}", identifier);
        let result = self.load_tracks(&identifier).await?;
        into_candidates(result, limit)
    }
}

/// Direct URLs go to the node verbatim; anything else becomes a search.
fn search_identifier(prefix: &str, query: &str) -> String {
    let query = query.trim();
    if is_url(query) {
        query.to_string()
    } else {
        format!("{}:{}", prefix, query)
    }
}

fn into_resolve_result(result: LoadResult) -> Result<ResolveResult, ResolveError> {
    match result {
        LoadResult::Track(track) => Ok(ResolveResult::SingleTrack(track.into())),
        LoadResult::Playlist(playlist) => {
            debug!(
                "Loaded playlist {} ({} tracks)",
                playlist.info.name,
                playlist.tracks.len()
            );
            Ok(ResolveResult::TrackList(
                playlist.tracks.into_iter().map(Into::into).collect(),
            ))
        }
        LoadResult::Search(results) => Ok(results
            .into_iter()
            .next()
            .map_or(ResolveResult::NoMatch, |track| {
                ResolveResult::SingleTrack(track.into())
            })),
        LoadResult::Empty {} => Ok(ResolveResult::NoMatch),
        LoadResult::Error(error) => Err(ResolveError::Load(
            error.message.unwrap_or(error.cause),
        )),
    }
}

/// Every search hit rather than just the first. Other load types contribute
/// what `resolve` would have queued.
fn into_candidates(result: LoadResult, limit: usize) -> Result<Vec<Track>, ResolveError> {
    let mut tracks = match result {
        LoadResult::Search(results) => results.into_iter().take(limit).map(Into::into).collect(),
        other => into_resolve_result(other)?.into_tracks(),
    };
    tracks.truncate(limit);
    Ok(tracks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(id: &str) -> String {
        format!(
            r#"{{"encoded":"enc-{id}","info":{{"identifier":"{id}","isSeekable":true,"author":"artist","length":1000,"isStream":false,"position":0,"title":"title {id}","uri":null,"artworkUrl":"https://img/{id}.jpg","isrc":null,"sourceName":"youtube"}}}}"#
        )
    }

    fn load(json: &str) -> LoadResult {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_search_identifier() {
        assert_eq!(search_identifier("ytsearch", " lofi beats "), "ytsearch:lofi beats");
        assert_eq!(
            search_identifier("ytsearch", "https://youtu.be/abc"),
            "https://youtu.be/abc"
        );
    }

    #[test]
    fn test_search_takes_first_hit() {
        let json = format!(
            r#"{{"loadType":"search","data":[{},{}]}}"#,
            remote("a"),
            remote("b")
        );
        let ResolveResult::SingleTrack(track) = into_resolve_result(load(&json)).unwrap() else {
            panic!("expected a single track");
        };
        assert_eq!(track.id(), "a");
        assert_eq!(track.playback_ref(), "enc-a");
        assert_eq!(track.artwork_url(), Some("https://img/a.jpg"));
    }

    #[test]
    fn test_playlist_keeps_order() {
        let json = format!(
            r#"{{"loadType":"playlist","data":{{"info":{{"name":"mix","selectedTrack":-1}},"pluginInfo":{{}},"tracks":[{},{}]}}}}"#,
            remote("a"),
            remote("b")
        );
        let ResolveResult::TrackList(tracks) = into_resolve_result(load(&json)).unwrap() else {
            panic!("expected a track list");
        };
        let ids: Vec<_> = tracks.iter().map(|t| t.id()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_empty_and_error() {
        let empty = load(r#"{"loadType":"empty","data":{}}"#);
        assert_eq!(into_resolve_result(empty).unwrap(), ResolveResult::NoMatch);

        let empty_search = load(r#"{"loadType":"search","data":[]}"#);
        assert_eq!(into_resolve_result(empty_search).unwrap(), ResolveResult::NoMatch);

        let error = load(
            r#"{"loadType":"error","data":{"message":"unavailable","severity":"common","cause":"x"}}"#,
        );
        assert!(matches!(
            into_resolve_result(error),
            Err(ResolveError::Load(message)) if message == "unavailable"
        ));
    }

    #[test]
    fn test_candidates_keep_every_hit_up_to_limit() {
        let json = format!(
            r#"{{"loadType":"search","data":[{},{},{}]}}"#,
            remote("a"),
            remote("b"),
            remote("c")
        );
        let ids = |tracks: Vec<Track>| -> Vec<String> {
            tracks.iter().map(|t| t.id().to_string()).collect()
        };
        assert_eq!(ids(into_candidates(load(&json), 5).unwrap()), ["a", "b", "c"]);
        assert_eq!(ids(into_candidates(load(&json), 2).unwrap()), ["a", "b"]);

        let single = load(&format!(r#"{{"loadType":"track","data":{}}}"#, remote("x")));
        assert_eq!(ids(into_candidates(single, 5).unwrap()), ["x"]);

        let empty = load(r#"{"loadType":"empty","data":{}}"#);
        assert!(into_candidates(empty, 5).unwrap().is_empty());
    }
}
