use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),

    #[error("Download error: {0}")]
    Download(#[from] core_download::DownloadError),
}

impl From<core_runtime::Error> for CoreError {
    fn from(err: core_runtime::Error) -> Self {
        match err {
            core_runtime::Error::CapabilityMissing { capability, message } => {
                CoreError::CapabilityMissing { capability, message }
            }
            core_runtime::Error::Config(message) => CoreError::Config(message),
            core_runtime::Error::Logging(message) => CoreError::InitializationFailed(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
