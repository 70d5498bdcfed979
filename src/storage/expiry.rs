//! Background Expiry Reaper
//!
//! Lazy expiry (checking on access) keeps reads correct but never
//! reclaims memory for keys nobody touches again. The reaper fixes that:
//! a background Tokio task that wakes on a fixed interval and sweeps
//! every expired entry out of the store.
//!
//! Each tick takes the same exclusive lock as writers and scans the
//! whole map - O(store size) per tick. That full-scan policy is the
//! baseline contract here; at scale it would be replaced with a
//! structure ordered by deadline, but small and medium stores do not
//! need one.
//!
//! The reaper runs independently of client traffic and is stopped
//! through a watch channel when its handle is dropped.

use crate::storage::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Configuration for the expiry reaper.
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// Fixed interval between sweeps (default: 1s)
    pub interval: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

/// A handle to the running reaper task.
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub struct Reaper {
    shutdown_tx: watch::Sender<bool>,
}

impl Reaper {
    /// Starts the reaper as a background task sweeping `store`.
    pub fn start(store: Arc<Store>, config: ReaperConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(reaper_loop(store, config, shutdown_rx));

        info!("Background expiry reaper started");

        Self { shutdown_tx }
    }

    /// Stops the reaper. Called automatically when the handle drops.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn reaper_loop(store: Arc<Store>, config: ReaperConfig, mut shutdown_rx: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(config.interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry reaper received shutdown signal");
                    return;
                }
            }
        }

        let evicted = store.sweep_expired().await;
        if evicted > 0 {
            let keys_remaining = store.len().await;
            debug!(
                evicted = evicted,
                keys_remaining = keys_remaining,
                "Expired entries evicted"
            );
        }
    }
}

/// Starts the reaper with the default one-second interval.
pub fn start_reaper(store: Arc<Store>) -> Reaper {
    Reaper::start(store, ReaperConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SyncPolicy;
    use bytes::Bytes;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_reaper_evicts_untouched_expired_keys() {
        let dir = tempdir().unwrap();
        let store = Arc::new(
            Store::open(dir.path().join("appendonly.aof"), SyncPolicy::Strict)
                .await
                .unwrap(),
        );

        store
            .set("short", Bytes::from("x"), Some(Duration::from_millis(20)))
            .await
            .unwrap();
        store.set("keeper", Bytes::from("y"), None).await.unwrap();

        let _reaper = Reaper::start(
            Arc::clone(&store),
            ReaperConfig {
                interval: Duration::from_millis(10),
            },
        );

        tokio::time::sleep(Duration::from_millis(100)).await;

        // The expired key is physically gone without ever being read
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("keeper").await, Some(Bytes::from("y")));
    }

    #[tokio::test]
    async fn test_reaper_stops_on_drop() {
        let dir = tempdir().unwrap();
        let store = Arc::new(
            Store::open(dir.path().join("appendonly.aof"), SyncPolicy::Strict)
                .await
                .unwrap(),
        );

        let reaper = Reaper::start(
            Arc::clone(&store),
            ReaperConfig {
                interval: Duration::from_millis(10),
            },
        );
        drop(reaper);

        store
            .set("k", Bytes::from("v"), Some(Duration::from_millis(10)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        // Entry is still physically present: only the lazy read path
        // would hide it now
        assert_eq!(store.len().await, 1);
    }
}
