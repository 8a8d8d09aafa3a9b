//! Core database infrastructure
//!
//! - `DatabaseConn`: SQLite connection wrapper used by the cleaner and the
//!   fixture loader

mod connection;

pub use connection::{quote_identifier, DatabaseConn, SQLITE_ADAPTERS};
