//! Reconnect watcher: one sync pass each time the device comes back online.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::coordinator::SyncCoordinator;
use crate::error::SyncError;

/// Spawn a task that runs [`SyncCoordinator::sync_when_idle`] on every
/// offline → online transition. Aborting the handle is safe at any point:
/// records not yet marked stay pending.
pub fn spawn_reconnect_sync(coordinator: Arc<SyncCoordinator>) -> JoinHandle<()> {
    let mut rx = coordinator.connectivity().subscribe();
    let mut was_online = *rx.borrow_and_update();

    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let online = *rx.borrow_and_update();
            let reconnected = online && !was_online;
            was_online = online;
            if !reconnected {
                continue;
            }

            info!("Connectivity restored, syncing pending surveys");
            match coordinator.sync_when_idle().await {
                Ok(summary) => info!(
                    "Reconnect sync finished: {} synced, {} failed",
                    summary.success_count, summary.failure_count
                ),
                Err(SyncError::Offline) => info!("Went offline again before reconnect sync"),
                Err(e) => warn!("Reconnect sync failed: {}", e),
            }
        }
    })
}
