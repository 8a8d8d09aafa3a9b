//! Database module
//!
//! Everything a fixture builder needs from the database side, organized into:
//!
//! ```text
//! database/
//! ├── core/       # SQLite DatabaseConn wrapper
//! ├── resolver    # config argument -> validated DatabaseConfig
//! ├── cache       # connections shared by config argument
//! └── cleaner     # table truncation before fixtures load
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use seedbed::database::{ConfigResolver, ConnectionCache, DatabaseCleaner};
//!
//! let cache = ConnectionCache::new();
//! let conn = cache.connect(&"config/database.yml".into(), &ConfigResolver::default())?;
//!
//! let conn = conn.lock();
//! DatabaseCleaner::new(&conn, None)?.clean()?;
//! ```

pub mod cache;
pub mod cleaner;
pub mod core;
pub mod resolver;

pub use cache::{CacheKey, ConnectionCache, SharedConnection};
pub use cleaner::{CleanerOptions, DatabaseCleaner};
pub use self::core::DatabaseConn;
pub use resolver::{
    validate, ConfigResolver, DatabaseConfig, DatabaseConfigSource, REQUIRED_FIELDS,
};
