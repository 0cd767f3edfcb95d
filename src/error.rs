//! Error taxonomy for the survey queue.
//!
//! Store invariant violations (`DuplicateId`, `NotFound`) are caller bugs and
//! are never retried. `Offline` and `InProgress` are expected operating
//! conditions: wait and call `sync()` again.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("survey {0} is already in the store")]
    DuplicateId(String),

    #[error("survey {0} not found in the store")]
    NotFound(String),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("survey field encoding error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("stored timestamp is not RFC 3339: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("cannot sync while offline")]
    Offline,

    #[error("a synchronization pass is already running")]
    InProgress,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    /// True for conditions the caller should simply retry later.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SyncError::Offline | SyncError::InProgress)
    }
}
