//! # Download Error Types

use bridge_traits::error::BridgeError;
use core_library::error::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DownloadError {
    /// Track cannot be downloaded as given (missing id, no remote uri).
    #[error(transparent)]
    Track(#[from] LibraryError),

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    /// Durable storage read or write failed.
    #[error("Storage error: {0}")]
    Storage(#[from] BridgeError),

    /// Persisted map could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DownloadError {
    /// Whether the fault belongs to persistence rather than the transfer.
    pub fn is_storage_error(&self) -> bool {
        matches!(self, DownloadError::Storage(_) | DownloadError::Serialization(_))
    }
}

pub type Result<T> = std::result::Result<T, DownloadError>;
