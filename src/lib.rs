//! # emberkv - A Minimal Durable In-Memory Key-Value Store
//!
//! emberkv is a single-process key-value store exposed over a
//! line-oriented TCP text protocol. It offers SET/GET/DEL with optional
//! time-to-live, crash recovery through an append-only log, and an
//! on-demand JSON snapshot export.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            emberkv                              │
//! │                                                                 │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐          │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │          │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │          │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘          │
//! │                                               │                 │
//! │                                               ▼                 │
//! │  ┌─────────────┐    ┌──────────────────────────────────────┐    │
//! │  │ Line parser │    │                Store                 │    │
//! │  │ + replies   │    │   RwLock<HashMap<String, Entry>>     │    │
//! │  └─────────────┘    └───────┬───────────────────┬──────────┘    │
//! │                             │                   │               │
//! │                             ▼                   ▼               │
//! │                      ┌───────────┐       ┌───────────┐          │
//! │                      │ AppendLog │       │  Reaper   │          │
//! │                      │JSON lines │       │ 1s sweep  │          │
//! │                      └───────────┘       └───────────┘          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `SET key value [PX milliseconds]`
//! - `GET key`
//! - `DEL key [key ...]`
//! - `SAVE`
//! - `PING`
//!
//! ## Durability
//!
//! Every mutation appends one JSON record to the append-only log, by
//! default fsynced before the command is acknowledged (strict mode).
//! Startup replays the log top to bottom; the snapshot file produced by
//! SAVE is diagnostic only and never read back.
//!
//! ## Design Highlights
//!
//! - **One lock**: a single readers-writer lock guards the whole map.
//!   Concurrent GETs overlap; SET/DEL/eviction are exclusive, and in
//!   strict mode the write lock is held across the log fsync so writers
//!   serialize behind storage latency by design.
//! - **Lazy + active expiry**: reads never return an expired entry, and
//!   a background reaper sweeps untouched expired keys every second.
//! - **One task per connection**: unbounded, with a 5-minute idle
//!   timeout as the only per-connection lifecycle bound.
//!
//! ## Module Overview
//!
//! - [`protocol`]: line-oriented command parsing and reply encoding
//! - [`storage`]: the store, append log, reaper and snapshot exporter
//! - [`commands`]: command dispatch against the store
//! - [`connection`]: per-client connection loop

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use connection::{handle_connection, ConnectionError, ConnectionStats};
pub use protocol::{Command, ProtocolError, Reply};
pub use storage::{start_reaper, Reaper, ReaperConfig, Store, StoreError, SyncPolicy};

/// The default port emberkv listens on
pub const DEFAULT_PORT: u16 = 6380;

/// The default host emberkv binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default append log path
pub const DEFAULT_AOF_FILE: &str = "appendonly.aof";

/// Default snapshot export path
pub const DEFAULT_SNAPSHOT_FILE: &str = "dump.json";

/// Version of emberkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
