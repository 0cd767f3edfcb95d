//! Census Field Sync
//!
//! Offline-first survey capture queue for field enumeration devices:
//! - Durable SQLite survey store that survives restarts
//! - Externally driven connectivity signal
//! - Sequential, idempotent synchronization passes against the census API
//! - Reconnect-triggered sync

pub mod config;
pub mod connectivity;
pub mod error;
pub mod store;
pub mod sync;
pub mod utils;

// Re-exports for convenience
pub use connectivity::ConnectivitySignal;
pub use error::{StoreError, SyncError};
pub use store::{RecordStore, SqliteRecordStore, SurveyRecord};
pub use sync::{SyncCoordinator, SyncSummary};
