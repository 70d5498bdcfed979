//! Connection Management Module
//!
//! Each accepted TCP client is served by its own async task running a
//! line-at-a-time loop: read, parse, dispatch, reply. The server places
//! no cap on simultaneous connections - bounded admission control is an
//! explicit scope boundary left to the deployment, not an accident of
//! the design.

pub mod handler;

// Re-export commonly used types
pub use handler::{
    handle_connection, ConnectionError, ConnectionHandler, ConnectionStats,
    DEFAULT_IDLE_TIMEOUT,
};
