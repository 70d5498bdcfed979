//! Append-Only Log
//!
//! Durability for emberkv is a single append-only file: one JSON object
//! per line, one line per mutating operation, written in the order the
//! mutations were applied.
//!
//! ```text
//! {"cmd":"SET","key":"session","value":"tok123","ttl_ms":60000}
//! {"cmd":"SET","key":"name","value":"ember"}
//! {"cmd":"DEL","key":"session"}
//! ```
//!
//! On startup the log is replayed top to bottom to rebuild the store;
//! the ordered record sequence is the sole source of truth for the
//! recovered state. No deduplication, compaction or rewrite is done.
//!
//! ## Sync Policies
//!
//! - [`SyncPolicy::Strict`] (default): every append is fsynced before
//!   the call returns. Highest durability; writers serialize behind
//!   storage latency.
//! - [`SyncPolicy::Buffered`]: appends are written without fsync. A
//!   crash can lose the most recent operations.
//!
//! ## Limitations
//!
//! Values are stored as text in the log. A value that is not valid
//! UTF-8 will be corrupted by the round trip; the wire protocol cannot
//! deliver such a value in the first place, so the limitation is kept
//! rather than papered over with a binary-safe encoding.

use crate::storage::StoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Which mutation a log record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogCmd {
    #[serde(rename = "SET")]
    Set,
    #[serde(rename = "DEL")]
    Del,
}

/// One mutating operation, as persisted in the append log.
///
/// `ttl_ms` is a *relative* duration. Replay computes a fresh expiry
/// from it, so TTLs restart their clock on every process restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub cmd: LogCmd,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_ms: Option<u64>,
}

impl LogRecord {
    /// Builds a SET record. The value is stored as text (see the module
    /// docs for the binary-safety caveat).
    pub fn set(key: &str, value: &[u8], ttl: Option<Duration>) -> Self {
        Self {
            cmd: LogCmd::Set,
            key: key.to_string(),
            value: Some(String::from_utf8_lossy(value).into_owned()),
            ttl_ms: ttl.map(|d| d.as_millis() as u64),
        }
    }

    /// Builds a DEL record for a single key.
    pub fn del(key: &str) -> Self {
        Self {
            cmd: LogCmd::Del,
            key: key.to_string(),
            value: None,
            ttl_ms: None,
        }
    }
}

/// When appended records reach stable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPolicy {
    /// fsync after every append before the call returns.
    #[default]
    Strict,
    /// Write without fsync; the OS flushes at its leisure.
    Buffered,
}

/// The durable, append-only operation log.
///
/// The file handle is guarded by its own lock, independent of the store
/// lock; the store's write path holds both in the strict-durability
/// case so that all writers serialize behind the fsync.
#[derive(Debug)]
pub struct AppendLog {
    file: Mutex<File>,
    path: PathBuf,
    policy: SyncPolicy,
}

impl AppendLog {
    /// Opens (creating if necessary) the log file in append mode.
    pub async fn open(path: impl AsRef<Path>, policy: SyncPolicy) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        info!(path = %path.display(), ?policy, "Append log opened");

        Ok(Self {
            file: Mutex::new(file),
            path,
            policy,
        })
    }

    /// Appends one record and, under [`SyncPolicy::Strict`], syncs it to
    /// stable storage before returning.
    pub async fn append(&self, record: &LogRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        if self.policy == SyncPolicy::Strict {
            file.sync_data().await?;
        }
        Ok(())
    }

    /// Replays the log from the beginning, applying each record in file
    /// order.
    ///
    /// Lines that fail to parse are skipped without an operator-visible
    /// signal. The right recovery policy for a corrupt record (abort,
    /// skip, quarantine) is ambiguous, so the lenient one is used; this
    /// is a known observability gap.
    ///
    /// Lines are read as raw bytes: a corrupt record that is not even
    /// valid UTF-8 is still just a skipped line, never a read failure.
    ///
    /// Returns the number of records applied. An I/O failure while
    /// reading aborts startup entirely.
    pub async fn replay<F>(&self, mut apply: F) -> Result<usize, StoreError>
    where
        F: FnMut(LogRecord),
    {
        let file = File::open(&self.path).await?;
        let mut lines = BufReader::new(file).split(b'\n');
        let mut applied = 0usize;

        while let Some(line) = lines.next_segment().await? {
            match serde_json::from_slice::<LogRecord>(&line) {
                Ok(record) => {
                    apply(record);
                    applied += 1;
                }
                Err(_) => continue,
            }
        }

        debug!(records = applied, "Append log replayed");
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_record_wire_schema() {
        let rec = LogRecord::set("k", b"v", Some(Duration::from_millis(250)));
        assert_eq!(
            serde_json::to_string(&rec).unwrap(),
            r#"{"cmd":"SET","key":"k","value":"v","ttl_ms":250}"#
        );

        let rec = LogRecord::del("k");
        assert_eq!(
            serde_json::to_string(&rec).unwrap(),
            r#"{"cmd":"DEL","key":"k"}"#
        );
    }

    #[tokio::test]
    async fn test_append_then_replay() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("appendonly.aof");

        let log = AppendLog::open(&path, SyncPolicy::Strict).await.unwrap();
        log.append(&LogRecord::set("a", b"1", None)).await.unwrap();
        log.append(&LogRecord::set("b", b"2", None)).await.unwrap();
        log.append(&LogRecord::del("a")).await.unwrap();

        let mut records = Vec::new();
        let applied = log.replay(|r| records.push(r)).await.unwrap();

        assert_eq!(applied, 3);
        assert_eq!(records[0], LogRecord::set("a", b"1", None));
        assert_eq!(records[2], LogRecord::del("a"));
    }

    #[tokio::test]
    async fn test_replay_skips_malformed_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("appendonly.aof");

        let log = AppendLog::open(&path, SyncPolicy::Strict).await.unwrap();
        log.append(&LogRecord::set("a", b"1", None)).await.unwrap();
        {
            let mut file = log.file.lock().await;
            file.write_all(b"{garbage\n").await.unwrap();
        }
        log.append(&LogRecord::set("b", b"2", None)).await.unwrap();

        let mut keys = Vec::new();
        let applied = log.replay(|r| keys.push(r.key)).await.unwrap();

        assert_eq!(applied, 2);
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_replay_skips_non_utf8_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("appendonly.aof");

        let log = AppendLog::open(&path, SyncPolicy::Strict).await.unwrap();
        log.append(&LogRecord::set("a", b"1", None)).await.unwrap();
        {
            // Raw bytes that are neither JSON nor valid UTF-8
            let mut file = log.file.lock().await;
            file.write_all(&[0xff, 0xfe, 0xfd, b'\n']).await.unwrap();
        }
        log.append(&LogRecord::set("b", b"2", None)).await.unwrap();

        let mut keys = Vec::new();
        let applied = log.replay(|r| keys.push(r.key)).await.unwrap();

        assert_eq!(applied, 2);
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_buffered_policy_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("appendonly.aof");

        let log = AppendLog::open(&path, SyncPolicy::Buffered).await.unwrap();
        log.append(&LogRecord::set("a", b"1", None)).await.unwrap();

        let applied = log.replay(|_| {}).await.unwrap();
        assert_eq!(applied, 1);
    }

    #[tokio::test]
    async fn test_reopen_appends_after_existing_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("appendonly.aof");

        {
            let log = AppendLog::open(&path, SyncPolicy::Strict).await.unwrap();
            log.append(&LogRecord::set("a", b"1", None)).await.unwrap();
        }

        let log = AppendLog::open(&path, SyncPolicy::Strict).await.unwrap();
        log.append(&LogRecord::set("b", b"2", None)).await.unwrap();

        let mut keys = Vec::new();
        log.replay(|r| keys.push(r.key)).await.unwrap();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
