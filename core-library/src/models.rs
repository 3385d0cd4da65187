//! Domain models for playable content

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{LibraryError, Result};

/// Kind of content a [`Track`] carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Song,
    Podcast,
    Audiobook,
    Video,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Song => "song",
            TrackKind::Podcast => "podcast",
            TrackKind::Audiobook => "audiobook",
            TrackKind::Video => "video",
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, TrackKind::Video)
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of playable content.
///
/// Serialized with camelCase keys (`audioUrl`, `videoUrl`, `localUri`) and the
/// kind under `type`, matching the catalog payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    /// Artwork uri
    #[serde(default)]
    pub artwork: String,
    /// Duration in seconds (fractional allowed), 0 when unknown
    #[serde(default)]
    pub duration: f64,
    #[serde(rename = "type")]
    pub kind: TrackKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_uri: Option<String>,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        kind: TrackKind,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            artwork: String::new(),
            duration: 0.0,
            kind,
            audio_url: None,
            video_url: None,
            local_uri: None,
        }
    }

    pub fn with_duration_secs(mut self, secs: u64) -> Self {
        self.duration = secs as f64;
        self
    }

    pub fn with_duration_secs_f64(mut self, secs: f64) -> Self {
        self.duration = secs;
        self
    }

    pub fn with_artwork(mut self, uri: impl Into<String>) -> Self {
        self.artwork = uri.into();
        self
    }

    pub fn with_audio_url(mut self, url: impl Into<String>) -> Self {
        self.audio_url = Some(url.into());
        self
    }

    pub fn with_video_url(mut self, url: impl Into<String>) -> Self {
        self.video_url = Some(url.into());
        self
    }

    pub fn with_local_uri(mut self, uri: impl Into<String>) -> Self {
        self.local_uri = Some(uri.into());
        self
    }

    /// Validate track data
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "id".to_string(),
                message: "Track id cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    /// URI to hand to a media session. A downloaded local copy wins over the
    /// remote audio stream, which wins over the video stream.
    pub fn media_uri(&self) -> Option<&str> {
        non_blank(self.local_uri.as_deref()).or_else(|| self.remote_uri())
    }

    /// Remote URI a download fetches from.
    pub fn remote_uri(&self) -> Option<&str> {
        non_blank(self.audio_url.as_deref()).or_else(|| non_blank(self.video_url.as_deref()))
    }

    pub fn require_media_uri(&self) -> Result<&str> {
        self.media_uri().ok_or_else(|| LibraryError::MissingMediaUri {
            track_id: self.id.clone(),
        })
    }

    pub fn require_remote_uri(&self) -> Result<&str> {
        self.remote_uri().ok_or_else(|| LibraryError::MissingMediaUri {
            track_id: self.id.clone(),
        })
    }

    /// Whether the resolved media is a video stream.
    pub fn plays_video(&self) -> bool {
        if self.kind.is_video() {
            return true;
        }
        non_blank(self.local_uri.as_deref()).is_none()
            && non_blank(self.audio_url.as_deref()).is_none()
            && non_blank(self.video_url.as_deref()).is_some()
    }

    /// `None` for unknown, negative or non-finite durations.
    pub fn duration(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.duration)
            .ok()
            .filter(|duration| !duration.is_zero())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song() -> Track {
        Track::new("t1", "Intro", "Artist", TrackKind::Song).with_duration_secs(180)
    }

    #[test]
    fn media_uri_prefers_local_copy() {
        let track = song()
            .with_audio_url("https://cdn.test/t1.mp3")
            .with_local_uri("file:///downloads/t1.mp3");
        assert_eq!(track.media_uri(), Some("file:///downloads/t1.mp3"));
        assert_eq!(track.remote_uri(), Some("https://cdn.test/t1.mp3"));
    }

    #[test]
    fn media_uri_falls_back_to_video() {
        let track = song().with_video_url("https://cdn.test/t1.mp4");
        assert_eq!(track.media_uri(), Some("https://cdn.test/t1.mp4"));
        assert!(track.plays_video());
    }

    #[test]
    fn blank_urls_are_ignored() {
        let track = song().with_audio_url("  ");
        assert_eq!(track.media_uri(), None);
        assert_eq!(
            track.require_media_uri(),
            Err(LibraryError::MissingMediaUri {
                track_id: "t1".to_string()
            })
        );
    }

    #[test]
    fn validate_rejects_empty_id() {
        let track = Track::new(" ", "Intro", "Artist", TrackKind::Song);
        assert!(matches!(
            track.validate(),
            Err(LibraryError::InvalidInput { .. })
        ));
        assert!(song().validate().is_ok());
    }

    #[test]
    fn serializes_with_catalog_field_names() {
        let track = song().with_audio_url("https://cdn.test/t1.mp3");
        let json = serde_json::to_value(&track).unwrap();

        assert_eq!(json["type"], "song");
        assert_eq!(json["audioUrl"], "https://cdn.test/t1.mp3");
        assert!(json.get("localUri").is_none());

        let parsed: Track = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, track);
    }

    #[test]
    fn unknown_duration_is_none() {
        let track = Track::new("t2", "Live", "Artist", TrackKind::Podcast);
        assert_eq!(track.duration(), None);
        assert_eq!(song().duration(), Some(Duration::from_secs(180)));
        assert_eq!(track.with_duration_secs_f64(f64::NAN).duration(), None);
    }

    #[test]
    fn fractional_catalog_duration_is_accepted() {
        let json = serde_json::json!({
            "id": "t3",
            "title": "Outro",
            "artist": "Artist",
            "duration": 212.5,
            "type": "song",
            "audioUrl": "https://cdn.test/t3.mp3"
        });
        let track: Track = serde_json::from_value(json).unwrap();

        assert_eq!(track.duration(), Some(Duration::from_millis(212_500)));

        let whole: Track = serde_json::from_value(serde_json::json!({
            "id": "t4",
            "title": "Intro",
            "artist": "Artist",
            "duration": 180,
            "type": "song"
        }))
        .unwrap();
        assert_eq!(whole.duration(), Some(Duration::from_secs(180)));
    }
}
