//! Connection cache
//!
//! Connections are cached by the config argument that produced them, so two
//! fixture builders given equal arguments share one connection. Entries live
//! as long as the cache; there is no eviction.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info};

use crate::database::core::DatabaseConn;
use crate::database::resolver::{ConfigResolver, DatabaseConfigSource};
use crate::error::Result;

/// Connection handle shared between builders and the cache
pub type SharedConnection = Arc<Mutex<DatabaseConn>>;

static SHARED_CACHE: Lazy<Arc<ConnectionCache>> = Lazy::new(|| Arc::new(ConnectionCache::new()));

/// Identity of a config argument
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Path(String),
    /// Canonical JSON text of an inline mapping.
    Inline(String),
}

impl CacheKey {
    /// The absent argument is keyed as the default path, so it shares a
    /// connection with an explicit reference to that same path.
    pub fn for_source(source: &DatabaseConfigSource, resolver: &ConfigResolver) -> Self {
        match source {
            DatabaseConfigSource::FilePath(path) => {
                CacheKey::Path(path.to_string_lossy().into_owned())
            }
            DatabaseConfigSource::Inline(map) => {
                CacheKey::Inline(Value::Object(map.clone()).to_string())
            }
            DatabaseConfigSource::Default => {
                CacheKey::Path(resolver.default_path().to_string_lossy().into_owned())
            }
        }
    }
}

/// Cache of open connections keyed by config argument
#[derive(Default)]
pub struct ConnectionCache {
    connections: Mutex<HashMap<CacheKey, SharedConnection>>,
}

impl ConnectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used by [`FixtureBlueprint::shared`](crate::FixtureBlueprint::shared)
    pub fn shared() -> Arc<ConnectionCache> {
        Arc::clone(&SHARED_CACHE)
    }

    /// Return the cached connection for `source`, or resolve, open and cache
    /// a new one.
    ///
    /// Resolution and driver errors are returned as-is and nothing is cached.
    /// The cache lock is held while opening, so concurrent callers with the
    /// same key never open two connections.
    pub fn connect(
        &self,
        source: &DatabaseConfigSource,
        resolver: &ConfigResolver,
    ) -> Result<SharedConnection> {
        let key = CacheKey::for_source(source, resolver);
        let mut connections = self.connections.lock();

        if let Some(conn) = connections.get(&key) {
            debug!("reusing cached database connection for {:?}", key);
            return Ok(Arc::clone(conn));
        }

        let config = resolver.resolve(source)?;
        let conn: SharedConnection = Arc::new(Mutex::new(DatabaseConn::open(&config)?));
        info!(
            "Opened {} database connection to {}",
            config.adapter, config.database
        );

        connections.insert(key, Arc::clone(&conn));
        Ok(conn)
    }

    pub fn contains(&self, source: &DatabaseConfigSource, resolver: &ConfigResolver) -> bool {
        self.connections
            .lock()
            .contains_key(&CacheKey::for_source(source, resolver))
    }

    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }
}
