//! Error types shared by the engines.
//!
//! Reaching either end of the active view is not an error: the cursor reports
//! it as `cursor::Step::Boundary` and publishes `TrackListEnd` instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::library::TrackId;

/// Failures raised synchronously by the track store and property accessors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Malformed input to insert/upsert/set.
    #[error("invalid track data: {0}")]
    Validation(String),
    /// Field name outside the closed property set.
    #[error("unknown or read-only track property `{0}`")]
    InvalidProperty(String),
    /// Operation on a missing record.
    #[error("track {0} not found")]
    NotFound(TrackId),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Failures reading or playing a media file.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("file not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("cannot read {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },
    #[error("cannot decode {}: {reason}", path.display())]
    Unsupported { path: PathBuf, reason: String },
    #[error("no tags found in {}", .0.display())]
    Untagged(PathBuf),
    #[error("audio output unavailable: {0}")]
    OutputUnavailable(String),
}

impl MediaError {
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            MediaError::Missing(path) | MediaError::Untagged(path) => Some(path),
            MediaError::Unreadable { path, .. } | MediaError::Unsupported { path, .. } => {
                Some(path)
            }
            MediaError::OutputUnavailable(_) => None,
        }
    }
}

/// Failures surfaced by command execution or undo.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Media(#[from] MediaError),
    /// The state needed to reverse a command no longer exists.
    #[error("cannot undo: {0}")]
    UndoUnavailable(String),
}
