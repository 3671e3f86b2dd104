use std::fmt::Write;

use serde::Serialize;

use crate::{
    common::types::UserId,
    player::{PlaybackState, SessionSnapshot, Track},
};

pub const STOP_ID: &str = "dashboard_stop";
pub const PAUSE_PLAY_ID: &str = "dashboard_pause_play";
pub const SKIP_ID: &str = "dashboard_skip";

const SPACER_LABEL: &str = "\u{200b}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Button {
    pub custom_id: String,
    pub label: String,
    pub style: ButtonStyle,
    pub disabled: bool,
}

impl Button {
    fn new(custom_id: &str, label: &str, style: ButtonStyle) -> Self {
        Self {
            custom_id: custom_id.to_string(),
            label: label.to_string(),
            style,
            disabled: false,
        }
    }

    fn spacer(custom_id: &str) -> Self {
        Self {
            disabled: true,
            ..Self::new(custom_id, SPACER_LABEL, ButtonStyle::Secondary)
        }
    }
}

/// Chat-surface agnostic description of the dashboard message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayPayload {
    pub author: String,
    pub title: Option<String>,
    pub description: String,
    pub image: Option<String>,
    pub thumbnail: Option<String>,
    pub buttons: Vec<Button>,
}

/// Pure projections. Never feed back into the session.
pub trait DashboardRenderer: Send + Sync {
    fn render(&self, snapshot: &SessionSnapshot) -> DisplayPayload;

    /// Small card announcing that `requester` queued `track`.
    fn render_queued(&self, track: &Track, requester: UserId) -> DisplayPayload;
}

/// Embed-style "now playing" card with a single control row.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbedRenderer;

impl DashboardRenderer for EmbedRenderer {
    fn render(&self, snapshot: &SessionSnapshot) -> DisplayPayload {
        let author = match &snapshot.current {
            Some(track) => format!("Now Playing: {}", track),
            None => "Now Playing: Nothing".to_string(),
        };

        let description = if snapshot.queue.is_empty() {
            "**Queue:** Empty".to_string()
        } else {
            let mut description = String::from("**Queue:**\n```\n");
            for (index, track) in snapshot.queue.iter().enumerate() {
                let _ = writeln!(description, "{}. {}", index + 1, track);
            }
            description.push_str("```");
            description
        };

        let pause_label = if snapshot.state == PlaybackState::Playing {
            "PAUSE"
        } else {
            "PLAY"
        };

        DisplayPayload {
            author,
            title: None,
            description,
            image: snapshot
                .current
                .as_ref()
                .and_then(|track| track.artwork_url().map(str::to_string)),
            buttons: vec![
                Button::spacer("dashboard_spacer_left"),
                Button::new(STOP_ID, "STOP", ButtonStyle::Danger),
                Button::new(PAUSE_PLAY_ID, pause_label, ButtonStyle::Primary),
                Button::new(SKIP_ID, "SKIP", ButtonStyle::Primary),
                Button::spacer("dashboard_spacer_right"),
            ],
            thumbnail: None,
        }
    }

    fn render_queued(&self, track: &Track, requester: UserId) -> DisplayPayload {
        DisplayPayload {
            author: format!("<@{}> queued this song", requester),
            title: Some(track.title().to_string()),
            description: format!("**Artist:** {}", track.artist()),
            image: None,
            thumbnail: track.artwork_url().map(str::to_string),
            buttons: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{common::types::GuildId, player::Track};

    fn snapshot(
        state: PlaybackState,
        current: Option<Track>,
        queue: Vec<Track>,
    ) -> SessionSnapshot {
        SessionSnapshot {
            guild_id: GuildId::from("1"),
            state,
            current,
            queue,
            loop_enabled: false,
            idle: false,
        }
    }

    fn song(title: &str, artwork: Option<&str>) -> Track {
        Track::new(title, title, "Band", artwork.map(str::to_string), title)
    }

    #[test]
    fn test_idle_dashboard() {
        let payload = EmbedRenderer.render(&snapshot(PlaybackState::Idle, None, vec![]));
        assert_eq!(payload.author, "Now Playing: Nothing");
        assert_eq!(payload.description, "**Queue:** Empty");
        assert_eq!(payload.image, None);
        assert_eq!(payload.buttons[2].label, "PLAY");
    }

    #[test]
    fn test_playing_dashboard_lists_queue() {
        let payload = EmbedRenderer.render(&snapshot(
            PlaybackState::Playing,
            Some(song("Intro", Some("https://img/intro.jpg"))),
            vec![song("Second", None), song("Third", None)],
        ));
        assert_eq!(payload.author, "Now Playing: Intro - Band");
        assert_eq!(payload.image.as_deref(), Some("https://img/intro.jpg"));
        assert_eq!(
            payload.description,
            "**Queue:**\n```\n1. Second - Band\n2. Third - Band\n```"
        );

        let ids: Vec<_> = payload.buttons.iter().map(|b| b.custom_id.as_str()).collect();
        assert_eq!(
            ids,
            [
                "dashboard_spacer_left",
                STOP_ID,
                PAUSE_PLAY_ID,
                SKIP_ID,
                "dashboard_spacer_right"
            ]
        );
        assert_eq!(payload.buttons[2].label, "PAUSE");
        assert!(payload.buttons[0].disabled && payload.buttons[4].disabled);
        assert!(!payload.buttons[1].disabled);
    }

    #[test]
    fn test_paused_shows_play() {
        let payload = EmbedRenderer.render(&snapshot(
            PlaybackState::Paused,
            Some(song("Intro", None)),
            vec![],
        ));
        assert_eq!(payload.buttons[2].label, "PLAY");
        assert_eq!(payload.buttons[2].style, ButtonStyle::Primary);
    }

    #[test]
    fn test_queued_card() {
        let payload =
            EmbedRenderer.render_queued(&song("Intro", Some("https://img/intro.jpg")), UserId(7));
        assert_eq!(payload.author, "<@7> queued this song");
        assert_eq!(payload.title.as_deref(), Some("Intro"));
        assert_eq!(payload.description, "**Artist:** Band");
        assert_eq!(payload.thumbnail.as_deref(), Some("https://img/intro.jpg"));
        assert_eq!(payload.image, None);
        assert!(payload.buttons.is_empty());
    }
}
