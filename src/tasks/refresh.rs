//! Index Refresh Task
//!
//! Background task that periodically forces a prune pass over the cache
//! index, so expired keys are reclaimed from the store without waiting for
//! the next access to sweep them.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::Cache;

/// Spawns a background task that periodically refreshes the cache index.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between refresh passes. Each pass prunes expired entries (which deletes
/// their values from the store through the removal hook) and re-persists the
/// index snapshot.
///
/// Returns a `JoinHandle` which can be used to abort the task during
/// shutdown.
pub fn spawn_refresh_task(cache: Cache, refresh_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(refresh_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting index refresh task with interval of {} seconds",
            refresh_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let before = cache.size();
            cache.refresh();
            let removed = before.saturating_sub(cache.size());

            if removed > 0 {
                info!("Index refresh: pruned {} expired entries", removed);
            } else {
                debug!("Index refresh: no expired entries found");
            }
        }
    })
}
