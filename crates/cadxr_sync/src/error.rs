//! Error types for the sync client.

use thiserror::Error;

/// Errors that can occur talking to the realtime database.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid database path: {0:?}")]
    InvalidPath(String),

    #[error("document has no top-level key {0:?}")]
    MissingKey(String),
}

pub type SyncResult<T> = Result<T, SyncError>;
