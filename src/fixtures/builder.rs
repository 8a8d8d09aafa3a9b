//! Fixture builder
//!
//! A [`FixtureBuilder`] truncates the test database and loads a fixture group
//! into it. It takes three options:
//!
//! | option | accepts | default |
//! |---|---|---|
//! | `database_config` | YAML file path or inline mapping | `./config/database.yml` |
//! | `fixture_directory` | directory path | first existing of `./spec/fixtures`, `./test/fixtures` |
//! | `database_cleaner_options` | `{ skip, tables }` | clean every table |
//!
//! ```rust,ignore
//! use seedbed::{CleanerOptions, FixtureBlueprint, FixtureBuilder};
//!
//! let fixtures = FixtureBuilder::new(FixtureBlueprint::shared())?
//!     .with_database_config("config/database.yml")?
//!     .with_fixture_directory("spec/fixtures/blog")?
//!     .with_database_cleaner_options(CleanerOptions::only(["users", "posts"]))?
//!     .build()?;
//!
//! assert_eq!(fixtures.count("users"), 3);
//! ```
//!
//! Following the defaults, `FixtureBuilder::new(FixtureBlueprint::shared())?.build()`
//! is enough.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde_json::Value;
use tracing::debug;

use crate::builder::{Blueprint, Builder, OptionSchema};
use crate::config::SeedbedConfig;
use crate::database::{
    CleanerOptions, ConfigResolver, ConnectionCache, DatabaseCleaner, DatabaseConfigSource,
    SharedConnection,
};
use crate::error::{Error, Result};
use crate::fixtures::loader::{FixtureLoader, FixtureSet, YamlFixtureLoader};

pub const DATABASE_CONFIG: &str = "database_config";
pub const FIXTURE_DIRECTORY: &str = "fixture_directory";
pub const DATABASE_CLEANER_OPTIONS: &str = "database_cleaner_options";

/// Builder that cleans the database and loads fixtures
pub type FixtureBuilder = Builder<FixtureBlueprint>;

/// Blueprint of [`FixtureBuilder`]: its options, collaborators and build logic
pub struct FixtureBlueprint {
    schema: OptionSchema,
    settings: SeedbedConfig,
    resolver: ConfigResolver,
    cache: Arc<ConnectionCache>,
    loader: Arc<dyn FixtureLoader>,
}

/// Per-instance memoized lookups of a [`FixtureBuilder`]
#[derive(Default)]
pub struct FixtureMemo {
    connection: OnceCell<SharedConnection>,
    fixture_path: OnceCell<PathBuf>,
}

impl FixtureBlueprint {
    /// Default settings and the YAML loader, caching connections in `cache`.
    pub fn new(cache: Arc<ConnectionCache>) -> Self {
        let settings = SeedbedConfig::default();
        Self {
            schema: option_schema(),
            resolver: ConfigResolver::from_settings(&settings),
            settings,
            cache,
            loader: Arc::new(YamlFixtureLoader::new()),
        }
    }

    /// Same as [`FixtureBlueprint::new`] with the process-wide cache.
    pub fn shared() -> Self {
        Self::new(ConnectionCache::shared())
    }

    pub fn with_settings(mut self, settings: SeedbedConfig) -> Self {
        self.resolver = ConfigResolver::from_settings(&settings);
        self.settings = settings;
        self
    }

    pub fn with_loader(mut self, loader: impl FixtureLoader + 'static) -> Self {
        self.loader = Arc::new(loader);
        self
    }

    pub fn settings(&self) -> &SeedbedConfig {
        &self.settings
    }

    pub fn cache(&self) -> &Arc<ConnectionCache> {
        &self.cache
    }

    /// Explicit non-empty directory (must exist), else the first existing
    /// default candidate.
    fn resolve_fixture_directory(&self, explicit: Option<&str>) -> Result<PathBuf> {
        if let Some(dir) = explicit.filter(|d| !d.is_empty()) {
            let path = PathBuf::from(dir);
            if !path.exists() {
                return Err(Error::DatabaseNotConfigured(format!(
                    "Invalid fixture directory {}",
                    dir
                )));
            }
            return Ok(path);
        }

        self.settings
            .fixture_directories
            .iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.exists())
            .ok_or_else(|| {
                Error::DatabaseNotConfigured("Unable to find fixtures to load".to_string())
            })
    }
}

fn option_schema() -> OptionSchema {
    OptionSchema::with_options([DATABASE_CONFIG, FIXTURE_DIRECTORY, DATABASE_CLEANER_OPTIONS])
        .coercion(DATABASE_CONFIG, |value, _| {
            DatabaseConfigSource::from_value(&value)?;
            Ok(value)
        })
        .coercion(FIXTURE_DIRECTORY, |value, _| match value {
            Value::Null | Value::String(_) => Ok(value),
            other => Err(Error::invalid_option(
                FIXTURE_DIRECTORY,
                format!("expected a directory path, got {}", other),
            )),
        })
        .coercion(DATABASE_CLEANER_OPTIONS, |value, _| {
            if value.is_null() {
                return Ok(value);
            }
            Ok(serde_json::to_value(CleanerOptions::from_value(&value)?)?)
        })
}

/// Split a directory into its parent and leaf name, the way the loader
/// addresses a fixture group.
fn split_fixture_path(path: &Path) -> Result<(PathBuf, String)> {
    let invalid = || Error::DatabaseNotConfigured(format!("Invalid fixture directory {}", path.display()));

    let path = match path.file_name() {
        Some(_) => path.to_path_buf(),
        None => path.canonicalize().map_err(|_| invalid())?,
    };
    let group = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(invalid)?
        .to_string();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((parent, group))
}

impl Blueprint for FixtureBlueprint {
    type Output = FixtureSet;
    type Memo = FixtureMemo;

    fn schema(&self) -> &OptionSchema {
        &self.schema
    }

    fn name(&self) -> &str {
        "FixtureBuilder"
    }

    /// Resolve everything first, so configuration errors surface before any
    /// table is touched, then clean and load.
    fn build(&self, builder: &Builder<Self>) -> Result<FixtureSet> {
        let cleaner_options = builder.database_cleaner_options()?;
        let shared = builder.connection()?;
        let fixture_path = builder.path_to_fixtures()?;
        let (parent, group) = split_fixture_path(fixture_path)?;

        let db = shared.lock();
        if cleaner_options.skip {
            debug!("skipping database cleaner");
        } else {
            DatabaseCleaner::new(&db, cleaner_options.tables)?.clean()?;
        }

        self.loader.load(&parent, &group, &db)
    }
}

impl Builder<FixtureBlueprint> {
    pub fn database_config(&self) -> Result<DatabaseConfigSource> {
        match self.value(DATABASE_CONFIG) {
            Some(value) => DatabaseConfigSource::from_value(value),
            None => Ok(DatabaseConfigSource::Default),
        }
    }

    pub fn with_database_config(&self, source: impl Into<DatabaseConfigSource>) -> Result<Self> {
        self.with(DATABASE_CONFIG, source.into().to_value())
    }

    pub fn fixture_directory(&self) -> Option<&str> {
        self.value(FIXTURE_DIRECTORY).and_then(Value::as_str)
    }

    pub fn with_fixture_directory(&self, dir: impl AsRef<Path>) -> Result<Self> {
        self.with(
            FIXTURE_DIRECTORY,
            dir.as_ref().to_string_lossy().into_owned(),
        )
    }

    pub fn database_cleaner_options(&self) -> Result<CleanerOptions> {
        match self.value(DATABASE_CLEANER_OPTIONS) {
            Some(value) => CleanerOptions::from_value(value),
            None => Ok(CleanerOptions::default()),
        }
    }

    pub fn with_database_cleaner_options(&self, options: CleanerOptions) -> Result<Self> {
        self.with(DATABASE_CLEANER_OPTIONS, serde_json::to_value(options)?)
    }

    /// The connection for `database_config`, opened on first use.
    ///
    /// Memoized on this instance and shared through the blueprint's
    /// [`ConnectionCache`] with every builder given an equal config argument.
    pub fn connection(&self) -> Result<SharedConnection> {
        self.memo()
            .connection
            .get_or_try_init(|| {
                let blueprint = self.blueprint();
                blueprint
                    .cache
                    .connect(&self.database_config()?, &blueprint.resolver)
            })
            .map(Arc::clone)
    }

    /// The fixture directory this builder loads from.
    ///
    /// Fails with [`Error::DatabaseNotConfigured`] when an explicit directory
    /// does not exist or no default candidate does.
    pub fn path_to_fixtures(&self) -> Result<&Path> {
        self.memo()
            .fixture_path
            .get_or_try_init(|| {
                self.blueprint()
                    .resolve_fixture_directory(self.fixture_directory())
            })
            .map(PathBuf::as_path)
    }
}
