use serde::{Deserialize, Serialize};

use crate::protocol::models::Severity;

/// A track as the node hands it out: opaque encoded blob plus metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTrack {
    /// Base64-encoded track data, only meaningful to the node.
    pub encoded: String,
    pub info: TrackInfo,
    #[serde(default = "default_json_object")]
    pub plugin_info: serde_json::Value,
    #[serde(default = "default_json_object")]
    pub user_data: serde_json::Value,
}

fn default_json_object() -> serde_json::Value {
    serde_json::json!({})
}

/// Metadata for an audio track.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub identifier: String,
    pub is_seekable: bool,
    pub author: String,
    /// Duration in milliseconds. 0 for live streams.
    pub length: u64,
    pub is_stream: bool,
    pub position: u64,
    pub title: String,
    pub uri: Option<String>,
    pub artwork_url: Option<String>,
    pub isrc: Option<String>,
    pub source_name: String,
}

/// Response of `GET /v4/loadtracks`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "loadType", content = "data", rename_all = "camelCase")]
pub enum LoadResult {
    Track(RemoteTrack),
    Playlist(PlaylistData),
    Search(Vec<RemoteTrack>),
    Empty {},
    Error(LoadError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistData {
    pub info: PlaylistInfo,
    #[serde(default = "default_json_object")]
    pub plugin_info: serde_json::Value,
    pub tracks: Vec<RemoteTrack>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistInfo {
    pub name: String,
    /// Index of the selected track, or -1 if none.
    pub selected_track: i32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadError {
    pub message: Option<String>,
    pub severity: Severity,
    pub cause: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause_stack_trace: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACK_JSON: &str = r#"{
        "encoded": "QAAAjQIAJVJpY2sgQXN0bGV5",
        "info": {
            "identifier": "dQw4w9WgXcQ",
            "isSeekable": true,
            "author": "Rick Astley",
            "length": 212000,
            "isStream": false,
            "position": 0,
            "title": "Never Gonna Give You Up",
            "uri": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "artworkUrl": "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg",
            "isrc": null,
            "sourceName": "youtube"
        },
        "pluginInfo": {}
    }"#;

    #[test]
    fn test_track_load_result() {
        let json = format!(r#"{{"loadType":"track","data":{}}}"#, TRACK_JSON);
        let result: LoadResult = serde_json::from_str(&json).expect("valid load result");

        let LoadResult::Track(track) = result else {
            panic!("expected track result");
        };
        assert_eq!(track.encoded, "QAAAjQIAJVJpY2sgQXN0bGV5");
        assert_eq!(track.info.author, "Rick Astley");
        assert_eq!(track.info.length, 212000);
        assert_eq!(track.info.isrc, None);
        assert_eq!(track.user_data, serde_json::json!({}));
    }

    #[test]
    fn test_search_and_playlist_results() {
        let json = format!(r#"{{"loadType":"search","data":[{0},{0}]}}"#, TRACK_JSON);
        let result: LoadResult = serde_json::from_str(&json).expect("valid search result");
        assert!(matches!(result, LoadResult::Search(ref hits) if hits.len() == 2));

        let json = format!(
            r#"{{"loadType":"playlist","data":{{"info":{{"name":"Mix","selectedTrack":-1}},"pluginInfo":{{}},"tracks":[{}]}}}}"#,
            TRACK_JSON
        );
        let result: LoadResult = serde_json::from_str(&json).expect("valid playlist result");
        let LoadResult::Playlist(playlist) = result else {
            panic!("expected playlist result");
        };
        assert_eq!(playlist.info.name, "Mix");
        assert_eq!(playlist.info.selected_track, -1);
        assert_eq!(playlist.tracks.len(), 1);
    }

    #[test]
    fn test_empty_and_error_results() {
        let result: LoadResult =
            serde_json::from_str(r#"{"loadType":"empty","data":{}}"#).expect("valid empty");
        assert!(matches!(result, LoadResult::Empty {}));

        let result: LoadResult = serde_json::from_str(
            r#"{"loadType":"error","data":{"message":"Video unavailable","severity":"common","cause":"FriendlyException"}}"#,
        )
        .expect("valid error");
        let LoadResult::Error(err) = result else {
            panic!("expected error result");
        };
        assert_eq!(err.message.as_deref(), Some("Video unavailable"));
        assert!(matches!(err.severity, Severity::Common));
    }
}
