//! Engine state and progress values.

use bridge_traits::playback::MediaStatus;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of the playback engine.
///
/// ```text
/// idle ──load──> loading ──ok──> playing <──> paused
///                   │               │            │
///                   └──error──> stopped <──end/stop/fault
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// No session has been loaded (or it was unloaded).
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    /// Natural end, explicit stop, or fatal error.
    Stopped,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Stopped => "stopped",
        }
    }

    /// States from which `play()` resumes an existing session.
    pub fn can_resume(&self) -> bool {
        matches!(self, PlaybackState::Paused | PlaybackState::Stopped)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlaybackState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "idle" => Ok(PlaybackState::Idle),
            "loading" => Ok(PlaybackState::Loading),
            "playing" => Ok(PlaybackState::Playing),
            "paused" => Ok(PlaybackState::Paused),
            "stopped" => Ok(PlaybackState::Stopped),
            other => Err(format!("unknown playback state: {}", other)),
        }
    }
}

/// One progress sample. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    /// Milliseconds elapsed
    pub position_ms: u64,
    /// Total milliseconds, 0 when unknown
    pub duration_ms: u64,
}

impl Progress {
    pub fn new(position_ms: u64, duration_ms: u64) -> Self {
        Self {
            position_ms,
            duration_ms,
        }
    }

    /// Fraction played in `0.0..=1.0`, `None` when the duration is unknown.
    pub fn fraction(&self) -> Option<f64> {
        (self.duration_ms > 0)
            .then(|| (self.position_ms as f64 / self.duration_ms as f64).clamp(0.0, 1.0))
    }
}

impl From<&MediaStatus> for Progress {
    fn from(status: &MediaStatus) -> Self {
        Self {
            position_ms: status.position.as_millis() as u64,
            duration_ms: status.duration.map_or(0, |d| d.as_millis() as u64),
        }
    }
}
