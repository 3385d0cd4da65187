//! Download records as stored in the persisted map.

use core_library::Track;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of one download attempt.
///
/// `queued → downloading → (paused | completed | error | canceled)`. A paused
/// item may be resumed; the last three are terminal for the attempt and
/// only a new `request_download` restarts them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Queued,
    Downloading,
    Paused,
    Completed,
    Error,
    Canceled,
}

impl DownloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStatus::Queued => "queued",
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Paused => "paused",
            DownloadStatus::Completed => "completed",
            DownloadStatus::Error => "error",
            DownloadStatus::Canceled => "canceled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DownloadStatus::Completed | DownloadStatus::Error | DownloadStatus::Canceled
        )
    }

    /// Statuses that keep an id in the queue across restarts.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            DownloadStatus::Queued | DownloadStatus::Downloading | DownloadStatus::Paused
        )
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DownloadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(DownloadStatus::Queued),
            "downloading" => Ok(DownloadStatus::Downloading),
            "paused" => Ok(DownloadStatus::Paused),
            "completed" => Ok(DownloadStatus::Completed),
            "error" => Ok(DownloadStatus::Error),
            "canceled" => Ok(DownloadStatus::Canceled),
            other => Err(format!("unknown download status: {}", other)),
        }
    }
}

/// One entry of the download map, keyed by track id.
///
/// `progress == 1.0` holds exactly when `status` is `Completed`, which is
/// exactly when `local_uri` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadItem {
    pub id: String,
    /// Snapshot of the track taken at request time
    pub track: Track,
    /// Fraction transferred, `0.0..=1.0`
    pub progress: f64,
    pub status: DownloadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Epoch milliseconds
    pub created_at: i64,
    /// Epoch milliseconds
    pub updated_at: i64,
}

impl DownloadItem {
    /// Fresh queued item with zero progress.
    pub fn queued(track: Track, created_at: i64, now: i64) -> Self {
        Self {
            id: track.id.clone(),
            track,
            progress: 0.0,
            status: DownloadStatus::Queued,
            local_uri: None,
            error: None,
            created_at,
            updated_at: now,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == DownloadStatus::Completed
    }

    pub(crate) fn set_status(&mut self, status: DownloadStatus, now: i64) {
        self.status = status;
        self.updated_at = now;
    }

    pub(crate) fn complete(&mut self, local_uri: String, now: i64) {
        self.progress = 1.0;
        self.local_uri = Some(local_uri);
        self.error = None;
        self.set_status(DownloadStatus::Completed, now);
    }

    pub(crate) fn fail(&mut self, message: String, now: i64) {
        self.progress = self.progress.min(MAX_PARTIAL_PROGRESS);
        self.local_uri = None;
        self.error = Some(message);
        self.set_status(DownloadStatus::Error, now);
    }

    pub(crate) fn cancel(&mut self, now: i64) {
        self.progress = 0.0;
        self.local_uri = None;
        self.error = None;
        self.set_status(DownloadStatus::Canceled, now);
    }
}

/// Largest progress an unfinished item may carry.
pub(crate) const MAX_PARTIAL_PROGRESS: f64 = 0.999_999;
