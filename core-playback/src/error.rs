//! # Playback Error Types

use bridge_traits::error::BridgeError;
use core_library::error::LibraryError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    // ========================================================================
    // Source Errors
    // ========================================================================
    /// Track carries no resolvable media uri.
    #[error("Media source unavailable: {0}")]
    SourceUnavailable(String),

    /// The media backend refused the uri (unknown scheme, malformed).
    #[error("Media source rejected: {0}")]
    SourceRejected(String),

    /// Track data failed validation.
    #[error("Invalid track: {0}")]
    InvalidTrack(String),

    // ========================================================================
    // Backend Errors
    // ========================================================================
    /// One-time platform setup failed; `configure()` may be retried.
    #[error("Media backend configuration failed: {0}")]
    ConfigurationFailed(String),

    /// The backend capability is missing on this platform.
    #[error("Media backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A session command (play, pause, seek, volume) failed.
    #[error("Playback operation failed: {0}")]
    PlaybackFailed(String),

    /// Sampling the session failed; the session is released.
    #[error("Media fault: {0}")]
    MediaFault(String),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if retrying the same track may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::ConfigurationFailed(_)
                | PlaybackError::PlaybackFailed(_)
                | PlaybackError::MediaFault(_)
        )
    }

    /// Returns `true` if the track itself cannot be played as given.
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::SourceUnavailable(_)
                | PlaybackError::SourceRejected(_)
                | PlaybackError::InvalidTrack(_)
        )
    }
}

impl From<BridgeError> for PlaybackError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::InvalidSource(msg) => PlaybackError::SourceRejected(msg),
            BridgeError::NotAvailable(msg) => PlaybackError::BackendUnavailable(msg),
            other => PlaybackError::PlaybackFailed(other.to_string()),
        }
    }
}

impl From<LibraryError> for PlaybackError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::MissingMediaUri { .. } => PlaybackError::SourceUnavailable(err.to_string()),
            LibraryError::InvalidInput { .. } => PlaybackError::InvalidTrack(err.to_string()),
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_errors_map_to_playback_errors() {
        assert!(matches!(
            PlaybackError::from(BridgeError::InvalidSource("ftp".into())),
            PlaybackError::SourceRejected(_)
        ));
        assert!(matches!(
            PlaybackError::from(BridgeError::NotAvailable("no audio".into())),
            PlaybackError::BackendUnavailable(_)
        ));
        assert!(matches!(
            PlaybackError::from(BridgeError::OperationFailed("device lost".into())),
            PlaybackError::PlaybackFailed(_)
        ));
    }

    #[test]
    fn missing_uri_is_a_source_error() {
        let err = PlaybackError::from(LibraryError::MissingMediaUri {
            track_id: "t1".into(),
        });
        assert!(err.is_source_error());
        assert!(!err.is_transient());
        assert!(err.to_string().contains("t1"));
    }

    #[test]
    fn media_fault_is_transient() {
        assert!(PlaybackError::MediaFault("decoder reset".into()).is_transient());
    }
}
