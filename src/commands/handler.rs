//! Command Dispatch
//!
//! Maps parsed [`Command`]s onto store operations and encodes the
//! outcome as a single [`Reply`]:
//!
//! | Command | Success reply          | Failure reply              |
//! |---------|------------------------|----------------------------|
//! | PING    | `+PONG`                | -                          |
//! | SET     | `+OK`                  | `-ERR <durability error>`  |
//! | GET     | `$<len>` value / `$-1` | -                          |
//! | DEL     | `:<count removed>`     | `-ERR <durability error>`  |
//! | SAVE    | `+OK`                  | `-ERR <snapshot error>`    |
//!
//! Durability errors mean the in-memory mutation already happened; the
//! error reply tells the client the log append was not confirmed.

use crate::protocol::{Command, Reply};
use crate::storage::{snapshot, Store};
use std::path::PathBuf;
use std::sync::Arc;

/// Executes commands against the shared store.
///
/// Cheap to clone; every connection task gets its own copy.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    /// The shared store
    store: Arc<Store>,
    /// Where SAVE writes its export
    snapshot_path: PathBuf,
}

impl CommandHandler {
    /// Creates a handler over the given store.
    pub fn new(store: Arc<Store>, snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            snapshot_path: snapshot_path.into(),
        }
    }

    /// Executes one command and returns its reply.
    pub async fn execute(&self, command: Command) -> Reply {
        match command {
            Command::Ping => Reply::pong(),

            Command::Set { key, value, ttl } => {
                match self.store.set(&key, value, ttl).await {
                    Ok(()) => Reply::ok(),
                    Err(e) => Reply::error(format!("ERR {}", e)),
                }
            }

            Command::Get { key } => match self.store.get(&key).await {
                Some(value) => Reply::bulk(value),
                None => Reply::Nil,
            },

            Command::Del { keys } => match self.store.delete(&keys).await {
                Ok(removed) => Reply::Integer(removed as i64),
                Err(e) => Reply::error(format!("ERR {}", e)),
            },

            Command::Save => {
                match snapshot::export(&self.store, &self.snapshot_path).await {
                    Ok(()) => Reply::ok(),
                    Err(e) => Reply::error(format!("ERR {}", e)),
                }
            }
        }
    }
}
