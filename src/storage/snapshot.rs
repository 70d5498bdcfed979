//! Snapshot Exporter
//!
//! On-demand full dump of the store to a single JSON file, triggered by
//! the client SAVE command:
//!
//! ```json
//! {
//!   "session": {
//!     "value": "tok123",
//!     "expiresAt": 1766000000000000000
//!   }
//! }
//! ```
//!
//! `expiresAt` is absolute nanoseconds since the Unix epoch, `0` when
//! the entry has no expiry.
//!
//! The snapshot is an export-only artifact: startup recovery reads the
//! append log exclusively and never consults this file. Each SAVE
//! overwrites the previous export wholesale; a failed write is reported
//! to the caller and may leave the prior file truncated.

use crate::storage::{Store, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// One exported entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// The value, as text (same non-binary-safe encoding as the log)
    pub value: String,
    /// Absolute expiry in nanoseconds since the epoch; 0 means none
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,
}

/// Serializes every entry of the store into the snapshot file at
/// `path`, overwriting any previous export unconditionally.
///
/// The pass over the store is read-only, so concurrent GETs are not
/// blocked while the dump is assembled.
pub async fn export(store: &Store, path: impl AsRef<Path>) -> Result<(), StoreError> {
    let entries = store.scan().await;

    let mut dump = BTreeMap::new();
    for (key, entry) in entries {
        dump.insert(
            key,
            SnapshotEntry {
                value: String::from_utf8_lossy(&entry.value).into_owned(),
                expires_at: entry.expires_at.map(epoch_nanos).unwrap_or(0),
            },
        );
    }

    let json = serde_json::to_vec_pretty(&dump)?;
    tokio::fs::write(path.as_ref(), json).await?;

    debug!(keys = dump.len(), path = %path.as_ref().display(), "Snapshot exported");
    Ok(())
}

fn epoch_nanos(t: SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
