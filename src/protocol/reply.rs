//! Wire Reply Types
//!
//! This module defines the replies emberkv sends back to clients.
//! The encoding is a minimal structured wire format borrowed from RESP:
//! every reply starts with a one-byte type prefix and is terminated
//! with CRLF (`\r\n`).
//!
//! ## Reply Format
//!
//! - `+` Simple status: `+OK\r\n`
//! - `-` Error: `-ERR unknown command\r\n`
//! - `:` Integer: `:2\r\n`
//! - `$` Bulk string: `$5\r\nhello\r\n`
//! - `$-1` Nil bulk string: `$-1\r\n`
//!
//! Commands arrive as plain text lines (see [`crate::protocol::command`]),
//! so only the reply side of the protocol is encoded here. There are no
//! arrays: the server answers exactly one reply per command line.

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used for every reply line
pub const CRLF: &[u8] = b"\r\n";

/// Reply type prefixes
pub mod prefix {
    pub const SIMPLE: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK: u8 = b'$';
}

/// A single reply to a client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Non-binary-safe status line, e.g. `+OK\r\n`.
    Simple(String),

    /// Error condition, e.g. `-ERR unknown command\r\n`.
    /// Errors never close the connection by themselves.
    Error(String),

    /// 64-bit signed integer, e.g. `:2\r\n`.
    Integer(i64),

    /// Length-prefixed value bytes: `$<len>\r\n<data>\r\n`.
    Bulk(Bytes),

    /// Missing or expired key: `$-1\r\n`.
    Nil,
}

impl Reply {
    /// Creates an error reply. The conventional `ERR ` prefix is the
    /// caller's responsibility.
    pub fn error(msg: impl Into<String>) -> Self {
        Reply::Error(msg.into())
    }

    /// Creates a bulk reply from value bytes.
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Reply::Bulk(data.into())
    }

    /// Standard success status.
    pub fn ok() -> Self {
        Reply::Simple("OK".to_string())
    }

    /// Reply to PING.
    pub fn pong() -> Self {
        Reply::Simple("PONG".to_string())
    }

    /// Serializes the reply to bytes for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the reply into an existing buffer.
    ///
    /// More efficient than [`Reply::serialize`] when a buffer is reused
    /// across replies on the same connection.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Reply::Simple(s) => {
                buf.push(prefix::SIMPLE);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Error(s) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Integer(n) => {
                buf.push(prefix::INTEGER);
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Bulk(data) => {
                buf.push(prefix::BULK);
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            Reply::Nil => {
                buf.push(prefix::BULK);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
        }
    }

    /// Returns true if this reply is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Simple(s) => write!(f, "{}", s),
            Reply::Error(s) => write!(f, "(error) {}", s),
            Reply::Integer(n) => write!(f, "(integer) {}", n),
            Reply::Bulk(data) => {
                if let Ok(s) = std::str::from_utf8(data) {
                    write!(f, "\"{}\"", s)
                } else {
                    write!(f, "(binary data, {} bytes)", data.len())
                }
            }
            Reply::Nil => write!(f, "(nil)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_serialize() {
        assert_eq!(Reply::ok().serialize(), b"+OK\r\n");
        assert_eq!(Reply::pong().serialize(), b"+PONG\r\n");
    }

    #[test]
    fn test_error_serialize() {
        let reply = Reply::error("ERR unknown command");
        assert_eq!(reply.serialize(), b"-ERR unknown command\r\n");
    }

    #[test]
    fn test_integer_serialize() {
        assert_eq!(Reply::Integer(2).serialize(), b":2\r\n");
        assert_eq!(Reply::Integer(0).serialize(), b":0\r\n");
        assert_eq!(Reply::Integer(-1).serialize(), b":-1\r\n");
    }

    #[test]
    fn test_bulk_serialize() {
        let reply = Reply::bulk(Bytes::from("bar"));
        assert_eq!(reply.serialize(), b"$3\r\nbar\r\n");
    }

    #[test]
    fn test_empty_bulk_serialize() {
        let reply = Reply::bulk(Bytes::new());
        assert_eq!(reply.serialize(), b"$0\r\n\r\n");
    }

    #[test]
    fn test_nil_serialize() {
        assert_eq!(Reply::Nil.serialize(), b"$-1\r\n");
    }

    #[test]
    fn test_is_error() {
        assert!(Reply::error("ERR boom").is_error());
        assert!(!Reply::ok().is_error());
        assert!(!Reply::Nil.is_error());
    }

    #[test]
    fn test_display() {
        assert_eq!(Reply::ok().to_string(), "OK");
        assert_eq!(Reply::error("ERR boom").to_string(), "(error) ERR boom");
        assert_eq!(Reply::Integer(7).to_string(), "(integer) 7");
        assert_eq!(Reply::bulk(Bytes::from("hi")).to_string(), "\"hi\"");
        assert_eq!(
            Reply::bulk(Bytes::from_static(&[0xff, 0xfe])).to_string(),
            "(binary data, 2 bytes)"
        );
        assert_eq!(Reply::Nil.to_string(), "(nil)");
    }
}
