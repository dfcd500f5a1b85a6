//! Expiration Sweeper Task
//!
//! Background task that periodically applies truncate requests and removes expired
//! records from the memory store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::driver::memory::RecordStore;

/// Spawns a task that sweeps the store every `interval`.
///
/// The returned handle is aborted when the owning store is closed.
///
/// # Example
/// ```ignore
/// let store = Arc::new(RwLock::new(RecordStore::new(1000, true)));
/// let handle = spawn_sweeper(store.clone(), Duration::from_millis(100));
/// // Later, on close:
/// handle.abort();
/// ```
pub fn spawn_sweeper(store: Arc<RwLock<RecordStore>>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!("Starting sweeper with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let report = {
                let mut store_guard = store.write().await;
                store_guard.sweep()
            };

            if report.truncated > 0 {
                info!("Sweep: truncated {} records", report.truncated);
            }
            if report.expired > 0 {
                debug!("Sweep: removed {} expired records", report.expired);
            }
        }
    })
}
