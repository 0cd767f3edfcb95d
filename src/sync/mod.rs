//! Synchronization Module
//!
//! Reconciles the local survey queue against the census server: the
//! submission client seam, the pass coordinator, and the reconnect watcher.

pub mod client;
pub mod coordinator;
pub mod http;
pub mod watcher;

pub use client::{SubmissionClient, SubmissionOutcome, SubmissionRequest};
pub use coordinator::{SyncCoordinator, SyncSummary};
pub use http::HttpSubmissionClient;
pub use watcher::spawn_reconnect_sync;
