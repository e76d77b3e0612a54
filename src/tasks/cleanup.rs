//! Expiry Sweep Task
//!
//! Background task that periodically drops expired responses from the
//! memory cache.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::MemoryCache;

/// Spawns a background task that periodically removes expired entries.
///
/// Expired entries are also dropped lazily on lookup; the sweep keeps
/// responses nobody asks for again from holding memory. Abort the returned
/// handle during shutdown.
pub fn spawn_cleanup_task(cache: MemoryCache, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval = ?interval, "Starting memory cache cleanup task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = {
                let store = cache.store();
                let mut guard = store.write().await;
                guard.cleanup_expired()
            };

            if removed > 0 {
                info!("Memory cache cleanup: removed {} expired entries", removed);
            } else {
                debug!("Memory cache cleanup: no expired entries found");
            }
        }
    })
}
