//! Wire Protocol Implementation
//!
//! emberkv speaks an asymmetric, line-oriented protocol over TCP:
//!
//! - **Requests** are plain ASCII text lines, one command per line,
//!   tokens separated by runs of whitespace (see [`command`]).
//! - **Replies** use a minimal RESP-style framing with `+`/`-`/`:`/`$`
//!   type prefixes and CRLF terminators (see [`reply`]).
//!
//! ## Example Session
//!
//! ```text
//! > SET foo bar
//! +OK
//! > GET foo
//! $3
//! bar
//! > DEL foo
//! :1
//! ```

pub mod command;
pub mod reply;

// Re-export commonly used types for convenience
pub use command::{Command, ProtocolError};
pub use reply::Reply;
