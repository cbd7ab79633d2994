//! Error types shared by the library.

use std::path::PathBuf;

use thiserror::Error;

use crate::reference::ReferenceKind;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, WatchError>;

#[derive(Error, Debug)]
pub enum WatchError {
    /// A reference string is malformed or names a different kind than required.
    #[error("`{reference}` is not a valid {expected} reference")]
    InvalidReferenceKind {
        expected: ReferenceKind,
        reference: String,
    },

    /// A string that is not a canonical reference of any kind.
    #[error("`{0}` is not a valid reference")]
    InvalidReference(String),

    /// A persisted snapshot exists but cannot be read back.
    #[error("snapshot {path} is malformed: {message}")]
    SnapshotFormat { path: PathBuf, message: String },

    /// The catalog API call failed (transport, status or payload).
    #[error("catalog request failed: {0}")]
    RemoteFetch(String),

    /// Required setup (credentials, settings) is missing or unusable.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("group `{0}` not found")]
    GroupNotFound(String),

    #[error("group `{0}` already exists")]
    GroupExists(String),

    #[error("group store error: {0}")]
    GroupStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for WatchError {
    fn from(e: reqwest::Error) -> Self {
        WatchError::RemoteFetch(e.to_string())
    }
}
