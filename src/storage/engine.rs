//! Durable In-Memory Store
//!
//! This module implements the core store for emberkv: a single
//! concurrent map from key to entry, backed by the append-only log for
//! crash recovery.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                         Store                             │
//! │                                                           │
//! │   RwLock<HashMap<String, Entry>>      AppendLog           │
//! │   reads overlap, writes exclusive     own file lock       │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! One readers-writer lock guards the whole map: GETs may overlap,
//! while SET, DEL and expiry eviction are mutually exclusive with all
//! other access. The write path appends to the log *while still holding
//! the write lock*, so under strict durability every writer in the
//! process waits out the fsync of the writer ahead of it. That
//! serialization is a deliberate simplicity/durability tradeoff and
//! must not be relaxed casually.
//!
//! ## Durability Contract
//!
//! A failed log append does not roll back the in-memory mutation. The
//! caller sees an error meaning "applied but durability not confirmed",
//! and memory may run ahead of the log until the next restart. The
//! contract is lenient on purpose: it promises confirmation, not
//! atomicity.
//!
//! ## Expiry
//!
//! Entries expire two ways:
//! 1. **Lazy**: a read that finds an expired entry reports not-found
//!    and removes it.
//! 2. **Active**: the background reaper sweeps the whole map on a fixed
//!    interval (see [`crate::storage::expiry`]).
//!
//! Either way, an entry whose deadline has passed is never returned.

use crate::storage::aof::{AppendLog, LogCmd, LogRecord, SyncPolicy};
use crate::storage::StoreError;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use tracing::info;

/// A stored value with its optional expiry deadline.
///
/// The deadline is a wall-clock [`SystemTime`] rather than a monotonic
/// instant because the snapshot exporter writes it out as absolute
/// nanoseconds since the epoch.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The stored value
    pub value: Bytes,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<SystemTime>,
}

impl Entry {
    /// Creates an entry without expiry.
    pub fn new(value: Bytes) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Creates an entry that expires `ttl` from now.
    pub fn with_ttl(value: Bytes, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Some(SystemTime::now() + ttl),
        }
    }

    /// Checks whether the entry's deadline has passed.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|deadline| SystemTime::now() >= deadline)
            .unwrap_or(false)
    }
}

/// The durable key-value store.
///
/// Designed to be wrapped in an `Arc` and shared across all connection
/// tasks and the background reaper. All operations are async because
/// mutations append to the log inline.
///
/// # Example
///
/// ```ignore
/// use emberkv::storage::{Store, SyncPolicy};
/// use bytes::Bytes;
///
/// let store = Store::open("appendonly.aof", SyncPolicy::Strict).await?;
/// store.set("name", Bytes::from("ember"), None).await?;
/// assert_eq!(store.get("name").await, Some(Bytes::from("ember")));
/// ```
#[derive(Debug)]
pub struct Store {
    /// The single shared map; reads overlap, writes are exclusive
    data: RwLock<HashMap<String, Entry>>,

    /// Durability log; replayed on open, appended to on every mutation
    log: AppendLog,

    /// Statistics: total GET operations
    get_count: AtomicU64,

    /// Statistics: total SET operations
    set_count: AtomicU64,

    /// Statistics: total DEL operations
    del_count: AtomicU64,

    /// Statistics: number of expired entries evicted
    expired_count: AtomicU64,
}

impl Store {
    /// Opens the store, replaying the append log at `log_path` to
    /// rebuild the in-memory state.
    ///
    /// Replay applies records in file order exactly as if they arrived
    /// live; a replayed SET recomputes its expiry relative to *now*, so
    /// TTLs restart their clock on every restart. Failure to open or
    /// read the log is startup-fatal.
    pub async fn open(
        log_path: impl AsRef<Path>,
        policy: SyncPolicy,
    ) -> Result<Self, StoreError> {
        let log = AppendLog::open(log_path, policy).await?;

        let mut data = HashMap::new();
        let replayed = log
            .replay(|record| match record.cmd {
                LogCmd::Set => {
                    let value = Bytes::from(record.value.unwrap_or_default());
                    let entry = match record.ttl_ms {
                        Some(ms) if ms > 0 => {
                            Entry::with_ttl(value, Duration::from_millis(ms))
                        }
                        _ => Entry::new(value),
                    };
                    data.insert(record.key, entry);
                }
                LogCmd::Del => {
                    data.remove(&record.key);
                }
            })
            .await?;

        info!(records = replayed, keys = data.len(), "Store recovered from append log");

        Ok(Self {
            data: RwLock::new(data),
            log,
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        })
    }

    /// Inserts or overwrites a key, optionally with a time-to-live.
    ///
    /// The write lock is held across the log append (and its fsync
    /// under strict durability); see the module docs for why. On append
    /// failure the in-memory mutation is kept and the error is
    /// surfaced as durability-not-confirmed.
    pub async fn set(
        &self,
        key: &str,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let record = LogRecord::set(key, &value, ttl);
        let entry = match ttl {
            Some(ttl) => Entry::with_ttl(value, ttl),
            None => Entry::new(value),
        };

        let mut data = self.data.write().await;
        data.insert(key.to_string(), entry);
        self.log.append(&record).await
    }

    /// Returns the value for a key, or `None` if it is absent or
    /// expired.
    ///
    /// An expired entry found on the read path is removed via write
    /// lock escalation, so a key is never served past its deadline even
    /// if the reaper has not run yet.
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        // Fast path: read lock for live keys
        {
            let data = self.data.read().await;
            match data.get(key) {
                Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Key was expired - escalate to the write lock and evict it
        let mut data = self.data.write().await;
        if let Some(entry) = data.get(key) {
            if entry.is_expired() {
                data.remove(key);
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            // Race: another writer may have replaced the key meanwhile
            return Some(entry.value.clone());
        }

        None
    }

    /// Removes each of the given keys if present.
    ///
    /// Every individual removal is logged. Returns the number of keys
    /// actually removed; deleting an absent key is a no-op that counts
    /// zero, so repeated deletes are idempotent.
    pub async fn delete(&self, keys: &[String]) -> Result<u64, StoreError> {
        self.del_count.fetch_add(1, Ordering::Relaxed);

        let mut removed = 0u64;
        let mut data = self.data.write().await;
        for key in keys {
            if data.remove(key).is_some() {
                removed += 1;
                self.log.append(&LogRecord::del(key)).await?;
            }
        }
        Ok(removed)
    }

    /// Evicts every expired entry; called by the background reaper.
    ///
    /// Full scan under the write lock - O(store size) per call. Expiry
    /// is not logged: replay reconstructs deadlines from the recorded
    /// TTLs.
    ///
    /// Returns the number of entries evicted.
    pub async fn sweep_expired(&self) -> u64 {
        let mut data = self.data.write().await;
        let before = data.len();

        data.retain(|_, entry| !entry.is_expired());

        let evicted = (before - data.len()) as u64;
        if evicted > 0 {
            self.expired_count.fetch_add(evicted, Ordering::Relaxed);
        }
        evicted
    }

    /// Clones out every entry, expired or not, for the snapshot
    /// exporter. The export is a diagnostic dump, so entries that have
    /// expired but not yet been evicted appear in it.
    pub async fn scan(&self) -> Vec<(String, Entry)> {
        let data = self.data.read().await;
        data.iter().map(|(k, e)| (k.clone(), e.clone())).collect()
    }

    /// Returns the number of keys currently stored (including entries
    /// that have expired but not yet been evicted).
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    /// Returns true if the store holds no keys.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Returns operation counters.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }
}

/// Store operation counters.
#[derive(Debug, Clone, Copy)]
pub struct StoreStats {
    /// Total GET operations
    pub get_ops: u64,
    /// Total SET operations
    pub set_ops: u64,
    /// Total DEL operations
    pub del_ops: u64,
    /// Total expired entries evicted
    pub expired: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    async fn open_store(dir: &tempfile::TempDir) -> Store {
        Store::open(dir.path().join("appendonly.aof"), SyncPolicy::Strict)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;

        store.set("key", Bytes::from("value"), None).await.unwrap();
        assert_eq!(store.get("key").await, Some(Bytes::from("value")));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;
        assert_eq!(store.get("nonexistent").await, None);
    }

    #[tokio::test]
    async fn test_overwrite() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;

        store.set("key", Bytes::from("v1"), None).await.unwrap();
        store.set("key", Bytes::from("v2"), None).await.unwrap();
        assert_eq!(store.get("key").await, Some(Bytes::from("v2")));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;

        store.set("foo", Bytes::from("bar"), None).await.unwrap();

        let keys = vec!["foo".to_string()];
        assert_eq!(store.delete(&keys).await.unwrap(), 1);
        assert_eq!(store.delete(&keys).await.unwrap(), 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_counts_each_present_key_once() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;

        store.set("foo", Bytes::from("bar"), None).await.unwrap();

        // Same key twice in one DEL: removed on first mention only
        let keys = vec!["foo".to_string(), "foo".to_string()];
        assert_eq!(store.delete(&keys).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_never_returned() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;

        store
            .set("key", Bytes::from("value"), Some(Duration::from_millis(20)))
            .await
            .unwrap();
        assert_eq!(store.get("key").await, Some(Bytes::from("value")));

        tokio::time::sleep(Duration::from_millis(60)).await;

        // No reaper running: the lazy path alone must hide the entry
        assert_eq!(store.get("key").await, None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_replay_reproduces_final_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("appendonly.aof");

        {
            let store = Store::open(&path, SyncPolicy::Strict).await.unwrap();
            store.set("k", Bytes::from("v"), None).await.unwrap();
            store.set("gone", Bytes::from("x"), None).await.unwrap();
            store.delete(&["gone".to_string()]).await.unwrap();
        }

        let store = Store::open(&path, SyncPolicy::Strict).await.unwrap();
        assert_eq!(store.get("k").await, Some(Bytes::from("v")));
        assert_eq!(store.get("gone").await, None);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_replay_restarts_ttl_clock() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("appendonly.aof");

        {
            let store = Store::open(&path, SyncPolicy::Strict).await.unwrap();
            store
                .set("k", Bytes::from("v"), Some(Duration::from_millis(200)))
                .await
                .unwrap();
        }

        tokio::time::sleep(Duration::from_millis(400)).await;

        // TTLs are relative: replay recomputes the deadline from replay
        // time, so the key comes back alive after restart.
        let store = Store::open(&path, SyncPolicy::Strict).await.unwrap();
        assert_eq!(store.get("k").await, Some(Bytes::from("v")));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(store.get("k").await, None);
    }

    #[tokio::test]
    async fn test_concurrent_writers_serialize() {
        let dir = tempdir().unwrap();
        let store = Arc::new(open_store(&dir).await);

        let a = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.set("key", Bytes::from("aaaa"), None).await })
        };
        let b = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.set("key", Bytes::from("bbbb"), None).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        // The final value is exactly one of the two writes, never an
        // interleaving of both.
        let value = store.get("key").await.unwrap();
        assert!(value == Bytes::from("aaaa") || value == Bytes::from("bbbb"));
    }

    #[tokio::test]
    async fn test_sweep_evicts_only_expired() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;

        store.set("stays", Bytes::from("1"), None).await.unwrap();
        store
            .set("goes", Bytes::from("2"), Some(Duration::from_millis(10)))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(store.sweep_expired().await, 1);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("stays").await, Some(Bytes::from("1")));
    }

    #[tokio::test]
    async fn test_stats_track_operations() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;

        store.set("a", Bytes::from("1"), None).await.unwrap();
        store.get("a").await;
        store.delete(&["a".to_string()]).await.unwrap();

        let stats = store.stats();
        assert_eq!(stats.set_ops, 1);
        assert_eq!(stats.get_ops, 1);
        assert_eq!(stats.del_ops, 1);
    }
}
