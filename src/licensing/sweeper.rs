//! Background eviction of stale license entries.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::licensing::cache::LicenseCache;

pub struct LicenseSweeper {
    cache: LicenseCache,
    interval: Duration,
}

impl LicenseSweeper {
    pub fn new(cache: LicenseCache, interval: Duration) -> Self {
        Self { cache, interval }
    }

    /// Sweep every `interval` until shutdown is signalled.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "License sweeper starting");

        // First tick one interval out; a fresh cache has nothing to evict.
        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.cache.sweep_expired();
                    if evicted > 0 {
                        tracing::debug!(evicted, remaining = self.cache.len(), "Swept stale license entries");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("License sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
