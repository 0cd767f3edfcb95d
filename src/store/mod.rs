//! Durable Record Store
//!
//! Holds captured surveys in creation order and survives process restarts.
//! Every mutating call returns only after the change is committed.

pub mod record;
pub mod sqlite;

pub use record::{CitizenDeclaration, EnumeratorSession, QueueCounts, SurveyRecord};
pub use sqlite::SqliteRecordStore;

use async_trait::async_trait;

use crate::error::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Interface the sync coordinator and the capture workflow share.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert at the end of the queue as a pending record.
    async fn append(&self, record: SurveyRecord) -> StoreResult<()>;

    /// Flip a record to synced. Already-synced records are left untouched.
    async fn mark_synced(&self, id: &str) -> StoreResult<()>;

    /// Snapshot of pending records, oldest first.
    async fn list_pending(&self) -> StoreResult<Vec<SurveyRecord>>;

    /// Snapshot of synced records, oldest first.
    async fn list_synced(&self) -> StoreResult<Vec<SurveyRecord>>;

    async fn get(&self, id: &str) -> StoreResult<Option<SurveyRecord>>;

    async fn counts(&self) -> StoreResult<QueueCounts>;

    async fn set_session(&self, session: EnumeratorSession) -> StoreResult<()>;

    async fn session(&self) -> StoreResult<Option<EnumeratorSession>>;

    /// Drop every record and the enumerator session (logout).
    async fn clear(&self) -> StoreResult<()>;
}
