//! Database cleaner
//!
//! Resets state before fixtures are loaded by truncating tables.
//!
//! ```rust,ignore
//! // every table in the database
//! DatabaseCleaner::new(&conn, None)?.clean()?;
//!
//! // only these, in this order
//! DatabaseCleaner::new(&conn, Some(vec!["users".into(), "messages".into()]))?.clean()?;
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::database::core::DatabaseConn;
use crate::database::resolver::normalize_keys;
use crate::error::{Error, Result};

/// The `database_cleaner_options` of a fixture builder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerOptions {
    /// Do not clean at all.
    pub skip: bool,
    /// Tables to truncate; `None` means every table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<String>>,
}

impl CleanerOptions {
    pub fn skipped() -> Self {
        Self {
            skip: true,
            tables: None,
        }
    }

    pub fn only<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            skip: false,
            tables: Some(tables.into_iter().map(Into::into).collect()),
        }
    }

    /// Read options from a stored option value; `null` gives the defaults.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => {
                serde_json::from_value(Value::Object(normalize_keys(map.clone())))
                    .map_err(|e| Error::invalid_option("database_cleaner_options", e.to_string()))
            }
            other => Err(Error::invalid_option(
                "database_cleaner_options",
                format!("expected a mapping, got {}", other),
            )),
        }
    }
}

/// Truncates a fixed list of tables
pub struct DatabaseCleaner<'a> {
    db: &'a DatabaseConn,
    tables: Vec<String>,
}

impl<'a> DatabaseCleaner<'a> {
    /// Create a cleaner for `tables`, or for every table the connection
    /// knows about right now when `tables` is `None`.
    pub fn new(db: &'a DatabaseConn, tables: Option<Vec<String>>) -> Result<Self> {
        let tables = match tables {
            Some(tables) => tables,
            None => db.tables()?,
        };
        Ok(Self { db, tables })
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    /// Truncate every table, in order. Stops at the first failure.
    pub fn clean(&self) -> Result<()> {
        for table in &self.tables {
            self.db.truncate(table)?;
        }
        info!("Truncated {} tables", self.tables.len());
        Ok(())
    }
}
