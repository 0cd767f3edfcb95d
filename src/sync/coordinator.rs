//! Sync Queue Coordinator
//!
//! Runs one synchronization pass at a time over a snapshot of the pending
//! queue, oldest record first, with at most one outstanding submission.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::client::{SubmissionClient, SubmissionOutcome, SubmissionRequest};
use crate::connectivity::ConnectivitySignal;
use crate::error::SyncError;
use crate::store::RecordStore;

/// Aggregate result of one pass. Partial failure is a normal result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub success_count: usize,
    pub failure_count: usize,
    /// Ids left pending by this pass, in submission order.
    pub failed_ids: Vec<String>,
}

impl SyncSummary {
    pub fn is_complete(&self) -> bool {
        self.failure_count == 0
    }

    fn record_failure(&mut self, id: &str) {
        self.failure_count += 1;
        self.failed_ids.push(id.to_string());
    }
}

pub struct SyncCoordinator {
    store: Arc<dyn RecordStore>,
    client: Arc<dyn SubmissionClient>,
    connectivity: ConnectivitySignal,
    pass_lock: Mutex<()>,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        client: Arc<dyn SubmissionClient>,
        connectivity: ConnectivitySignal,
    ) -> Self {
        Self {
            store,
            client,
            connectivity,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn connectivity(&self) -> &ConnectivitySignal {
        &self.connectivity
    }

    /// Run one pass now. Fails with [`SyncError::InProgress`] if another
    /// pass holds the queue, and with [`SyncError::Offline`] before any
    /// submission if the signal reports offline.
    #[tracing::instrument(skip(self))]
    pub async fn sync(&self) -> Result<SyncSummary, SyncError> {
        if !self.connectivity.is_online() {
            return Err(SyncError::Offline);
        }
        let _pass = self.pass_lock.try_lock().map_err(|_| SyncError::InProgress)?;
        self.run_pass().await
    }

    /// Like [`sync`](Self::sync), but queues behind an in-flight pass
    /// instead of failing.
    pub async fn sync_when_idle(&self) -> Result<SyncSummary, SyncError> {
        let _pass = self.pass_lock.lock().await;
        if !self.connectivity.is_online() {
            return Err(SyncError::Offline);
        }
        self.run_pass().await
    }

    async fn run_pass(&self) -> Result<SyncSummary, SyncError> {
        let pending = self.store.list_pending().await?;
        let mut summary = SyncSummary::default();

        if pending.is_empty() {
            debug!("Nothing pending, sync pass skipped");
            return Ok(summary);
        }
        info!("Sync pass started: {} pending survey(s)", pending.len());

        for record in &pending {
            if !self.connectivity.is_online() {
                debug!(survey_id = %record.id, "Went offline mid-pass, leaving survey pending");
                summary.record_failure(&record.id);
                continue;
            }

            let request = SubmissionRequest::from(record);
            match self.client.submit(&request).await {
                outcome @ (SubmissionOutcome::Accepted | SubmissionOutcome::AlreadyExists) => {
                    self.store.mark_synced(&record.id).await?;
                    summary.success_count += 1;
                    debug!(survey_id = %record.id, ?outcome, "Survey synced");
                }
                SubmissionOutcome::Failed(reason) => {
                    warn!(survey_id = %record.id, "Survey submission failed: {}", reason);
                    summary.record_failure(&record.id);
                }
            }
        }

        if summary.is_complete() {
            info!("Sync complete: {} survey(s) synced", summary.success_count);
        } else {
            warn!(
                "Sync partial: {} synced, {} failed and will retry later",
                summary.success_count, summary.failure_count
            );
        }
        Ok(summary)
    }
}
