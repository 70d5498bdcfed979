//! Storage Engine Module
//!
//! The core of emberkv: a concurrent in-memory map made durable by an
//! append-only log, with active expiry and an on-demand export.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         Store                            │
//! │          RwLock<HashMap<String, Entry>>                  │
//! │   reads overlap / writes + eviction are exclusive        │
//! └───────┬───────────────────┬──────────────────┬───────────┘
//!         │ mutations         │ every tick       │ on SAVE
//!         ▼                   ▼                  ▼
//!   ┌───────────┐       ┌───────────┐     ┌─────────────┐
//!   │ AppendLog │       │  Reaper   │     │  Snapshot   │
//!   │ JSON lines│       │ full scan │     │ JSON export │
//!   └───────────┘       └───────────┘     └─────────────┘
//!         ▲
//!         │ replayed on startup (sole recovery path)
//! ```
//!
//! Recovery is the append log's exclusive responsibility; the snapshot
//! file is never read back.

pub mod aof;
pub mod engine;
pub mod expiry;
pub mod snapshot;

// Re-export commonly used types
pub use aof::{AppendLog, LogCmd, LogRecord, SyncPolicy};
pub use engine::{Entry, Store, StoreStats};
pub use expiry::{start_reaper, Reaper, ReaperConfig};
pub use snapshot::SnapshotEntry;

/// Errors from the storage layer.
///
/// Callers of a mutating operation must treat an error as "applied in
/// memory, durability not confirmed" - mutations are not rolled back.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O failure on the append log or snapshot file
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record or snapshot (de)serialization failure
    #[error("storage encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}
