//! Line-Oriented Command Parser
//!
//! Clients talk to emberkv in plain text: one command per
//! newline-terminated line, tokens split on runs of whitespace.
//!
//! ```text
//! SET key value [PX milliseconds]
//! GET key
//! DEL key [key ...]
//! SAVE
//! PING
//! ```
//!
//! There is no quoting and no escaping, so a value containing whitespace
//! cannot be represented. This is a documented limitation of the wire
//! format, not an accident.

use bytes::Bytes;
use std::time::Duration;

/// A fully parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `PING` - liveness check.
    Ping,
    /// `SET key value [PX ms]` - insert or overwrite a key, optionally
    /// with a relative time-to-live.
    Set {
        key: String,
        value: Bytes,
        ttl: Option<Duration>,
    },
    /// `GET key` - fetch a value.
    Get { key: String },
    /// `DEL key [key ...]` - remove keys, reply with the removed count.
    Del { keys: Vec<String> },
    /// `SAVE` - export a full snapshot to disk.
    Save,
}

/// Errors produced while parsing a command line.
///
/// These map one-to-one onto inline `-ERR ...` replies; the connection
/// stays usable after any of them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("ERR unknown command")]
    UnknownCommand,

    #[error("ERR wrong number of args for {0}")]
    WrongArgCount(&'static str),
}

impl Command {
    /// Parses a single command line.
    ///
    /// Returns `Ok(None)` for a blank line (no command, no reply).
    /// The verb is matched case-insensitively; everything after it is
    /// taken verbatim.
    pub fn parse(line: &str) -> Result<Option<Command>, ProtocolError> {
        let args: Vec<&str> = line.split_whitespace().collect();
        let Some(verb) = args.first() else {
            return Ok(None);
        };

        let command = match verb.to_ascii_uppercase().as_str() {
            "PING" => Command::Ping,
            "SET" => {
                if args.len() < 3 {
                    return Err(ProtocolError::WrongArgCount("SET"));
                }
                Command::Set {
                    key: args[1].to_string(),
                    value: Bytes::copy_from_slice(args[2].as_bytes()),
                    ttl: parse_px(&args[3..]),
                }
            }
            "GET" => {
                if args.len() != 2 {
                    return Err(ProtocolError::WrongArgCount("GET"));
                }
                Command::Get {
                    key: args[1].to_string(),
                }
            }
            "DEL" => {
                if args.len() < 2 {
                    return Err(ProtocolError::WrongArgCount("DEL"));
                }
                Command::Del {
                    keys: args[1..].iter().map(|s| s.to_string()).collect(),
                }
            }
            "SAVE" => Command::Save,
            _ => return Err(ProtocolError::UnknownCommand),
        };

        Ok(Some(command))
    }
}

/// Parses the optional `PX <milliseconds>` tail of a SET command.
///
/// A malformed or missing milliseconds value is silently ignored (the
/// key is stored without a TTL) rather than rejected. Extra trailing
/// tokens are ignored as well.
fn parse_px(rest: &[&str]) -> Option<Duration> {
    if rest.len() < 2 || !rest[0].eq_ignore_ascii_case("PX") {
        return None;
    }
    match rest[1].parse::<u64>() {
        Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
        _ => None,
    }
}
