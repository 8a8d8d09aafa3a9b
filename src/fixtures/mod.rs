//! Fixture loading
//!
//! - `loader`: reads a fixture group from disk into a connection
//! - `builder`: the [`FixtureBuilder`], which cleans the database, resolves
//!   the fixture directory and drives a loader

pub mod builder;
pub mod loader;

pub use builder::{
    FixtureBlueprint, FixtureBuilder, FixtureMemo, DATABASE_CLEANER_OPTIONS, DATABASE_CONFIG,
    FIXTURE_DIRECTORY,
};
pub use loader::{FixtureLoader, FixtureRow, FixtureSet, YamlFixtureLoader, FIXTURE_EXTENSIONS};
