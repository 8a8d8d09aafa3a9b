//! Database connection management
//!
//! This module provides the SQLite connection wrapper that the resolver opens,
//! the cleaner truncates through, and the fixture loader inserts through.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde_json::{Map, Value};

use crate::database::resolver::DatabaseConfig;
use crate::error::{Error, Result};

/// Adapter names accepted by [`DatabaseConn::open`].
pub const SQLITE_ADAPTERS: &[&str] = &["sqlite", "sqlite3"];

/// Core database connection wrapper
///
/// `DatabaseConn` provides a thin wrapper around SQLite connections,
/// handling file-based, in-memory and `file:` URI databases with consistent
/// configuration and error handling.
pub struct DatabaseConn {
    pub conn: Connection,
}

impl DatabaseConn {
    /// Open a connection for a validated database config
    ///
    /// Only SQLite adapters are supported. `username`, `password` and `host`
    /// are accepted for compatibility with shared config files and ignored.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        if !SQLITE_ADAPTERS.contains(&config.adapter.as_str()) {
            return Err(Error::Connection {
                database: config.database.clone(),
                message: format!("unsupported adapter '{}'", config.adapter),
            });
        }

        let conn = Connection::open(&config.database).map_err(|e| Error::Connection {
            database: config.database.clone(),
            message: e.to_string(),
        })?;

        let db = DatabaseConn { conn };
        db.configure().map_err(|e| Error::Connection {
            database: config.database.clone(),
            message: e.to_string(),
        })?;
        Ok(db)
    }

    /// Open a database at the specified path (convenience method)
    pub fn open_path(path: &str) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| Error::Connection {
            database: path.to_string(),
            message: e.to_string(),
        })?;
        let db = DatabaseConn { conn };
        db.configure()?;
        Ok(db)
    }

    /// Create an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::Connection {
            database: ":memory:".to_string(),
            message: e.to_string(),
        })?;
        let db = DatabaseConn { conn };
        db.configure()?;
        Ok(db)
    }

    fn configure(&self) -> Result<()> {
        // WAL lets a test's own verification connection read while this one
        // holds the fixtures; in-memory databases report "memory" instead
        let _: String = self
            .conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;

        self.conn.execute("PRAGMA synchronous=NORMAL", [])?;
        self.conn.execute("PRAGMA temp_store=MEMORY", [])?;

        Ok(())
    }

    /// Execute a SQL statement
    pub fn execute(&self, sql: &str) -> Result<usize> {
        Ok(self.conn.execute(sql, [])?)
    }

    /// Begin an unchecked transaction
    ///
    /// Dropping the transaction without committing rolls it back.
    pub fn transaction(&self) -> Result<rusqlite::Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    /// Names of all user tables, ordered by name
    pub fn tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// Check if a table exists in the database
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let count: i32 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [table_name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Get the row count for a table
    pub fn table_count(&self, table_name: &str) -> Result<u64> {
        let query = format!("SELECT COUNT(*) FROM {}", quote_identifier(table_name));
        let count: u64 = self.conn.query_row(&query, [], |row| row.get(0))?;
        Ok(count)
    }

    /// Remove every row of a table
    ///
    /// The table's AUTOINCREMENT counter is reset as well, so reloaded
    /// fixtures without explicit ids get the same ids every run.
    pub fn truncate(&self, table_name: &str) -> Result<()> {
        self.conn.execute(
            &format!("DELETE FROM {}", quote_identifier(table_name)),
            [],
        )?;

        if self.table_exists("sqlite_sequence")? {
            self.conn
                .execute("DELETE FROM sqlite_sequence WHERE name = ?1", [table_name])?;
        }
        Ok(())
    }

    /// Insert one row given as a column -> value mapping
    ///
    /// Booleans are stored as 0/1; arrays and objects as JSON text.
    pub fn insert_row(&self, table_name: &str, row: &Map<String, Value>) -> Result<()> {
        let table = quote_identifier(table_name);
        if row.is_empty() {
            self.conn
                .execute(&format!("INSERT INTO {} DEFAULT VALUES", table), [])?;
            return Ok(());
        }

        let columns: Vec<String> = row.keys().map(|c| quote_identifier(c)).collect();
        let placeholders: Vec<String> = (1..=row.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        );

        self.conn
            .execute(&sql, params_from_iter(row.values().map(to_sql_value)))?;
        Ok(())
    }
}

/// Quote an SQL identifier, doubling embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => SqlValue::Integer(i),
            (None, Some(f)) => SqlValue::Real(f),
            (None, None) => SqlValue::Text(n.to_string()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sqlite_config(database: &str) -> DatabaseConfig {
        DatabaseConfig {
            adapter: "sqlite".to_string(),
            database: database.to_string(),
            username: "root".to_string(),
            password: None,
            host: None,
        }
    }

    fn with_people() -> DatabaseConn {
        let db = DatabaseConn::open_in_memory().unwrap();
        db.execute("CREATE TABLE people (id INTEGER PRIMARY KEY AUTOINCREMENT, first_name TEXT, active INTEGER, tags TEXT)")
            .unwrap();
        db.execute("CREATE TABLE houses (id INTEGER PRIMARY KEY, city TEXT)")
            .unwrap();
        db
    }

    #[test]
    fn test_open_in_memory() {
        let db = DatabaseConn::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_open_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sqlite3");
        let db = DatabaseConn::open(&sqlite_config(path.to_str().unwrap())).unwrap();
        db.execute("CREATE TABLE t (id INTEGER)").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_unsupported_adapter() {
        let mut config = sqlite_config(":memory:");
        config.adapter = "postgres".to_string();

        let err = DatabaseConn::open(&config).err().unwrap();
        match err {
            Error::Connection { message, .. } => assert!(message.contains("postgres")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unreachable_database() {
        let config = sqlite_config("/nonexistent-dir/for/sure/db.sqlite3");
        let err = DatabaseConn::open(&config).err().unwrap();
        assert!(matches!(err, Error::Connection { .. }));
    }

    #[test]
    fn test_tables_sorted() {
        let db = with_people();
        assert_eq!(db.tables().unwrap(), vec!["houses", "people"]);
        assert!(db.table_exists("people").unwrap());
        assert!(!db.table_exists("nonexistent_table").unwrap());
    }

    #[test]
    fn test_insert_and_count() {
        let db = with_people();
        let row = json!({"first_name": "Luke", "active": true, "tags": ["jedi"]});
        db.insert_row("people", row.as_object().unwrap()).unwrap();
        db.insert_row("people", &Map::new()).unwrap();

        assert_eq!(db.table_count("people").unwrap(), 2);
        let (active, tags): (i64, String) = db
            .conn
            .query_row(
                "SELECT active, tags FROM people WHERE first_name = 'Luke'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(active, 1);
        assert_eq!(tags, r#"["jedi"]"#);
    }

    #[test]
    fn test_truncate_resets_sequence() {
        let db = with_people();
        let row = json!({"first_name": "Leia"});
        db.insert_row("people", row.as_object().unwrap()).unwrap();
        db.insert_row("people", row.as_object().unwrap()).unwrap();

        db.truncate("people").unwrap();
        assert_eq!(db.table_count("people").unwrap(), 0);

        db.insert_row("people", row.as_object().unwrap()).unwrap();
        let id: i64 = db
            .conn
            .query_row("SELECT id FROM people", [], |row| row.get(0))
            .unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    fn test_truncate_missing_table_fails() {
        let db = with_people();
        assert!(matches!(db.truncate("ghosts"), Err(Error::Database(_))));
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users"), "\"users\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }
}
