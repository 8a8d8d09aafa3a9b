#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Seedbed - immutable builders and database fixtures for tests
//!
//! Seedbed provides a small framework for immutable, refinable builders and,
//! built on it, a fixture builder that prepares a SQLite test database:
//! it resolves the database config, truncates tables and loads YAML fixtures.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - **[`builder`]**: The builder framework
//!   - `Builder`: immutable option record with deferred, memoized build logic
//!   - `OptionSchema`: declared options with default and coercion pipelines
//!   - `AdHoc`: one-off builders from a closure (`Builder::create_with`)
//!
//! - **[`database`]**: Everything database
//!   - `core`: SQLite connection wrapper
//!   - `resolver`: database config argument resolution and validation
//!   - `cache`: connections shared by config argument
//!   - `cleaner`: table truncation
//!
//! - **[`fixtures`]**: The fixture builder and the YAML fixture loader
//!
//! - **[`config`]**: Process-level settings (`seedbed.toml`, `SEEDBED_*`)
//!
//! - **[`template`]**: `tera` rendering of fixture and config files
//!
//! # Quick Start Examples
//!
//! ## Loading fixtures
//!
//! ```rust,ignore
//! use seedbed::{FixtureBlueprint, FixtureBuilder};
//!
//! // ./config/database.yml and the first of ./spec/fixtures, ./test/fixtures
//! let fixtures = FixtureBuilder::new(FixtureBlueprint::shared())?.build()?;
//!
//! // or with explicit options
//! let fixtures = FixtureBuilder::new(FixtureBlueprint::shared())?
//!     .with_database_config("config/database.yml")?
//!     .with_fixture_directory("spec/fixtures/blog")?
//!     .build()?;
//! println!("{} users", fixtures.count("users"));
//! ```
//!
//! ## Ad-hoc builders
//!
//! ```rust,ignore
//! use seedbed::builder::Builder;
//! use serde_json::Value;
//!
//! let greeting = Builder::create_with([("name", Value::Null)], |options| {
//!     let name = options.get("name").and_then(|v| v.as_str()).unwrap_or("world");
//!     Ok(format!("hello, {}", name))
//! })?;
//!
//! assert_eq!(greeting.with("name", "Ann")?.build()?, "hello, Ann");
//! ```
//!
//! ## Settings
//!
//! ```rust,ignore
//! use seedbed::{FixtureBlueprint, SeedbedConfig};
//!
//! let settings = SeedbedConfig::new(&None)?;
//! let blueprint = FixtureBlueprint::shared().with_settings(settings);
//! ```

pub mod builder;
pub mod config;
pub mod database;
pub mod error;
pub mod fixtures;
pub mod template;

// =============================================================================
// Configuration
// =============================================================================

pub use self::config::SeedbedConfig;

// =============================================================================
// Errors
// =============================================================================

pub use error::{Error, Result};

// =============================================================================
// Builder framework
// =============================================================================

pub use builder::{AdHoc, Blueprint, Builder, DefaultValue, OptionSchema, Options};

// =============================================================================
// Database
// =============================================================================

pub use database::{
    CleanerOptions, ConfigResolver, ConnectionCache, DatabaseCleaner, DatabaseConfig,
    DatabaseConfigSource, DatabaseConn, SharedConnection,
};

// =============================================================================
// Fixtures
// =============================================================================

pub use fixtures::{FixtureBlueprint, FixtureBuilder, FixtureLoader, FixtureSet, YamlFixtureLoader};
