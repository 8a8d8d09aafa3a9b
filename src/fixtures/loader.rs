//! YAML fixture loading
//!
//! A fixture group is a directory with one YAML file per table. Each file
//! maps fixture names to rows:
//!
//! ```yaml
//! # spec/fixtures/blog/users.yml
//! luke:
//!   id: 1
//!   first_name: Luke
//!   last_name: Skywalker
//! leia:
//!   id: 2
//!   first_name: Leia
//!   last_name: Organa
//! ```
//!
//! Files are loaded in file-name order and rows in document order, all in a
//! single transaction. Each file is rendered as a `tera` template before it
//! is parsed, so `{{ 40 + 2 }}` loads as `42`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::info;

use crate::database::core::DatabaseConn;
use crate::error::{Error, Result};
use crate::template;

/// Column -> value mapping of one fixture row
pub type FixtureRow = Map<String, Value>;

/// Fixture file extensions, in preference order.
pub const FIXTURE_EXTENSIONS: &[&str] = &["yml", "yaml"];

/// Rows loaded by a fixture loader, by table then fixture name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixtureSet {
    tables: BTreeMap<String, Vec<(String, FixtureRow)>>,
}

impl FixtureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows to `table`.
    pub fn insert(&mut self, table: impl Into<String>, rows: Vec<(String, FixtureRow)>) {
        self.tables.entry(table.into()).or_default().extend(rows);
    }

    /// Table names, sorted.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Named rows of `table`, in load order.
    pub fn table(&self, table: &str) -> Option<&[(String, FixtureRow)]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    pub fn row(&self, table: &str, fixture: &str) -> Option<&FixtureRow> {
        self.table(table)?
            .iter()
            .find(|(name, _)| name == fixture)
            .map(|(_, row)| row)
    }

    /// Number of rows loaded into `table`.
    pub fn count(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, Vec::len)
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Loads the fixture group `group` found under `parent` into a connection
pub trait FixtureLoader: Send + Sync {
    fn load(&self, parent: &Path, group: &str, db: &DatabaseConn) -> Result<FixtureSet>;
}

/// The default loader, reading `<parent>/<group>/<table>.yml` files
#[derive(Debug, Clone, Default)]
pub struct YamlFixtureLoader;

impl YamlFixtureLoader {
    pub fn new() -> Self {
        Self
    }

    /// Fixture files of a group directory, sorted by file name.
    pub fn fixture_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_fixture = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| FIXTURE_EXTENSIONS.contains(&e));
            if path.is_file() && is_fixture {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Parse one fixture file into named rows, in document order.
    ///
    /// The file is rendered as a template first, see [`crate::template`].
    pub fn parse_file(&self, path: &Path) -> Result<Vec<(String, FixtureRow)>> {
        let content = fs::read_to_string(path)?;
        self.parse_str(&content, path)
    }

    fn parse_str(&self, content: &str, origin: &Path) -> Result<Vec<(String, FixtureRow)>> {
        let invalid = |message: String| Error::Fixture {
            path: origin.display().to_string(),
            message,
        };

        let rendered = template::render(content).map_err(|e| invalid(template::describe(&e)))?;
        let document: serde_yaml::Value = serde_yaml::from_str(&rendered)?;

        let mapping = match document {
            serde_yaml::Value::Null => return Ok(Vec::new()),
            serde_yaml::Value::Mapping(mapping) => mapping,
            _ => return Err(invalid("expected a mapping of fixture names to rows".to_string())),
        };

        let mut rows = Vec::with_capacity(mapping.len());
        for (name, row) in mapping {
            let name = match name {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                _ => return Err(invalid("fixture names must be scalars".to_string())),
            };
            let row = match serde_json::to_value(&row).map_err(|e| invalid(format!("{}: {}", name, e)))? {
                Value::Object(row) => row,
                Value::Null => Map::new(),
                _ => return Err(invalid(format!("fixture '{}' is not a mapping of columns", name))),
            };
            rows.push((name, row));
        }
        Ok(rows)
    }
}

impl FixtureLoader for YamlFixtureLoader {
    fn load(&self, parent: &Path, group: &str, db: &DatabaseConn) -> Result<FixtureSet> {
        let dir = parent.join(group);
        let files = self.fixture_files(&dir)?;

        let mut fixtures = FixtureSet::new();
        let tx = db.transaction()?;
        for file in files {
            let table = match file.file_stem().and_then(|s| s.to_str()) {
                Some(table) => table.to_string(),
                None => continue,
            };
            let rows = self.parse_file(&file)?;
            for (_, row) in &rows {
                db.insert_row(&table, row)?;
            }
            fixtures.insert(table, rows);
        }
        tx.commit()?;

        info!(
            "Loaded fixtures from {}: {}",
            dir.display(),
            fixtures
                .tables()
                .map(|t| format!("{}({})", t, fixtures.count(t)))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(fixtures)
    }
}
