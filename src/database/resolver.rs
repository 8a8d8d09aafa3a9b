//! Database config resolution
//!
//! Turns the flexible config argument of a fixture builder into a validated
//! [`DatabaseConfig`]. The argument is one of:
//!
//! - a path to a YAML file (when it is missing or unusable the default path
//!   is tried instead),
//! - an inline mapping,
//! - nothing, in which case the default path (`./config/database.yml`) is
//!   read.
//!
//! Either form may be keyed by environment, like a Rails `database.yml`:
//!
//! ```yaml
//! test:
//!   adapter: sqlite
//!   database: db/test.sqlite3
//!   username: root
//! ```
//!
//! in which case the `test` entry is used. Config files are rendered as
//! `tera` templates before parsing. Keys may be written in symbol form
//! (`:adapter`); the leading colon is stripped once, here, so nothing
//! downstream has to look for both spellings.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::SeedbedConfig;
use crate::error::{Error, Result};
use crate::template;

/// Fields a config must contain, in the order they are reported when missing.
pub const REQUIRED_FIELDS: [&str; 3] = ["adapter", "database", "username"];

/// Validated connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseConfig {
    pub adapter: String,
    pub database: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl DatabaseConfig {
    /// Build from a mapping that already passed [`validate`]. Scalar values
    /// of any type are accepted and rendered as text.
    fn from_validated(map: &Map<String, Value>) -> Self {
        let field = |name: &str| map.get(name).and_then(scalar_text);
        Self {
            adapter: field("adapter").unwrap_or_default(),
            database: field("database").unwrap_or_default(),
            username: field("username").unwrap_or_default(),
            password: field("password"),
            host: field("host"),
        }
    }
}

/// Where the database config comes from
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DatabaseConfigSource {
    /// A YAML file on disk.
    FilePath(PathBuf),
    /// A mapping given directly.
    Inline(Map<String, Value>),
    /// Nothing given: the default config path is read.
    #[default]
    Default,
}

impl DatabaseConfigSource {
    /// Interpret a stored option value: a string is a path, an object an
    /// inline config, `null` the default.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(DatabaseConfigSource::Default),
            Value::String(path) => Ok(DatabaseConfigSource::FilePath(PathBuf::from(path))),
            Value::Object(map) => Ok(DatabaseConfigSource::Inline(map.clone())),
            other => Err(Error::invalid_option(
                "database_config",
                format!("expected a file path or a mapping, got {}", other),
            )),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            DatabaseConfigSource::FilePath(path) => {
                Value::String(path.to_string_lossy().into_owned())
            }
            DatabaseConfigSource::Inline(map) => Value::Object(map.clone()),
            DatabaseConfigSource::Default => Value::Null,
        }
    }
}

impl From<&str> for DatabaseConfigSource {
    fn from(path: &str) -> Self {
        DatabaseConfigSource::FilePath(PathBuf::from(path))
    }
}

impl From<String> for DatabaseConfigSource {
    fn from(path: String) -> Self {
        DatabaseConfigSource::FilePath(PathBuf::from(path))
    }
}

impl From<PathBuf> for DatabaseConfigSource {
    fn from(path: PathBuf) -> Self {
        DatabaseConfigSource::FilePath(path)
    }
}

impl From<&Path> for DatabaseConfigSource {
    fn from(path: &Path) -> Self {
        DatabaseConfigSource::FilePath(path.to_path_buf())
    }
}

impl From<Map<String, Value>> for DatabaseConfigSource {
    fn from(map: Map<String, Value>) -> Self {
        DatabaseConfigSource::Inline(map)
    }
}

/// Resolves a [`DatabaseConfigSource`] into a [`DatabaseConfig`]
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    default_path: PathBuf,
    environment: String,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::from_settings(&SeedbedConfig::default())
    }
}

impl ConfigResolver {
    pub fn new(default_path: impl Into<PathBuf>, environment: impl Into<String>) -> Self {
        Self {
            default_path: default_path.into(),
            environment: environment.into(),
        }
    }

    pub fn from_settings(settings: &SeedbedConfig) -> Self {
        Self::new(&settings.database_config, &settings.environment)
    }

    /// Path read when no config argument is given
    pub fn default_path(&self) -> &Path {
        &self.default_path
    }

    /// Environment key selected from environment-keyed configs
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Resolve `source`, first success wins:
    ///
    /// 1. a path to an existing file that parses as a YAML mapping,
    /// 2. a mapping (inline, or the file just parsed), narrowed to its
    ///    environment entry when it has one, then validated,
    /// 3. the default path as in step 1, when there is no argument or the
    ///    given file is missing, unparsable or not a mapping.
    ///
    /// A failed validation is final. When no source yields a mapping the
    /// result is [`Error::DatabaseNotConfigured`].
    pub fn resolve(&self, source: &DatabaseConfigSource) -> Result<DatabaseConfig> {
        let candidate = match source {
            DatabaseConfigSource::Inline(map) => Some(map.clone()),
            DatabaseConfigSource::FilePath(path) => {
                read_config_mapping(path).or_else(|| {
                    debug!(
                        "falling back to default database config {}",
                        self.default_path.display()
                    );
                    read_config_mapping(&self.default_path)
                })
            }
            DatabaseConfigSource::Default => read_config_mapping(&self.default_path),
        };

        match candidate {
            Some(map) => self.resolve_mapping(map),
            None => Err(Error::DatabaseNotConfigured(
                "Unable to connect to database".to_string(),
            )),
        }
    }

    /// Select the environment entry of `map` if present, then validate.
    pub fn resolve_mapping(&self, map: Map<String, Value>) -> Result<DatabaseConfig> {
        let mut map = normalize_keys(map);
        let selected = match map.remove(&self.environment) {
            Some(Value::Object(env)) => normalize_keys(env),
            Some(_) => Map::new(),
            None => map,
        };

        validate(&selected)?;
        Ok(DatabaseConfig::from_validated(&selected))
    }
}

/// Check that every [`REQUIRED_FIELDS`] entry is present.
///
/// The error message lists the missing fields in declaration order, e.g.
/// `Unable to connect to database: Missing config for adapter, username`.
pub fn validate(config: &Map<String, Value>) -> Result<()> {
    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !config.contains_key(*field))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::DatabaseNotConfigured(format!(
            "Unable to connect to database: Missing config for {}",
            missing.join(", ")
        )))
    }
}

/// Strip the leading `:` of symbol-form keys.
pub fn normalize_keys(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .map(|(key, value)| match key.strip_prefix(':') {
            Some(stripped) => (stripped.to_string(), value),
            None => (key, value),
        })
        .collect()
}

/// Render and parse a YAML config file. Missing or unparsable files, and
/// files that are not a mapping, yield `None`.
fn read_config_mapping(path: &Path) -> Option<Map<String, Value>> {
    if !path.exists() {
        debug!("database config {} does not exist", path.display());
        return None;
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            debug!("unable to read database config {}: {}", path.display(), e);
            return None;
        }
    };

    let rendered = match template::render(&content) {
        Ok(rendered) => rendered,
        Err(e) => {
            debug!(
                "unable to render database config {}: {}",
                path.display(),
                template::describe(&e)
            );
            return None;
        }
    };

    match serde_yaml::from_str::<Value>(&rendered) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => {
            debug!("database config {} is not a mapping", path.display());
            None
        }
        Err(e) => {
            debug!("unable to parse database config {}: {}", path.display(), e);
            None
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
