use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LibraryError {
    #[error("Track {track_id} has no playable media uri")]
    MissingMediaUri { track_id: String },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },
}

pub type Result<T> = std::result::Result<T, LibraryError>;
