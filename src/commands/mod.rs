//! Command Handling Module
//!
//! Dispatches parsed commands to the storage layer and turns results
//! into wire replies. Each connection task owns a cheap clone of
//! [`CommandHandler`]; the store behind it is shared.

pub mod handler;

// Re-export commonly used types
pub use handler::CommandHandler;
