//! Error types for the Curtain engine.

use std::time::Duration;

use crate::CollectionName;
use thiserror::Error;

/// All possible errors from the Curtain engine.
///
/// Remote failures never show up here from the save and sync paths: those
/// are recorded in [`SyncStatus::errors`](crate::SyncStatus) instead. Edits
/// and deletes of confirmed records do report them, as they are not
/// queued for a later pass.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Local store errors
    #[error("local storage error: {0}")]
    LocalStorage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    // Validation errors
    #[error("invalid collection key: {0:?}")]
    InvalidCollectionKey(CollectionName),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("unknown permission: {0}")]
    UnknownPermission(String),

    #[error("invalid season: {0}")]
    InvalidSeason(String),

    // State errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("offline: {0} needs the remote store")]
    Offline(&'static str),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::LocalStorage(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Failure of a call against the remote document store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("remote store unreachable: {0}")]
    Unreachable(String),

    #[error("remote store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid remote response: {0}")]
    InvalidResponse(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for remote store calls.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;
