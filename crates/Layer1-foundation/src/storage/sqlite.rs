//! SQLite cache backend
//!
//! Entries live in a single table keyed by `(namespace, key)`, so several
//! namespaces can share one database file and `clear` only touches its
//! own rows.
//!
//! ## Schema
//!
//! - Version 1: `cache_entries(namespace, key, value, args, created_at)`

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::cache::{CacheBackend, CacheKey, CachedValue};
use crate::storage::file::DEFAULT_NAMESPACE;
use crate::{Error, Result};

/// Current schema version
const CURRENT_SCHEMA_VERSION: i32 = 1;

/// SQLite-backed cache
#[derive(Clone)]
pub struct SqliteCache {
    conn: Arc<Mutex<Connection>>,
    namespace: String,
    record_args: bool,
}

impl std::fmt::Debug for SqliteCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCache")
            .field("namespace", &self.namespace)
            .field("record_args", &self.record_args)
            .finish()
    }
}

impl SqliteCache {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Storage(format!("Failed to create data directory: {}", e))
                })?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::Storage(format!("Failed to open database: {}", e)))?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| Error::Storage(format!("Failed to set pragmas: {}", e)))?;

        Self::from_connection(conn)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Storage(format!("Failed to create in-memory database: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let cache = Self {
            conn: Arc::new(Mutex::new(conn)),
            namespace: DEFAULT_NAMESPACE.to_string(),
            record_args: false,
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Scope this handle to another namespace. Handles share the connection.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        if !namespace.trim().is_empty() {
            self.namespace = namespace;
        }
        self
    }

    /// Persist the argument list next to each entry
    pub fn record_args(mut self, enabled: bool) -> Self {
        self.record_args = enabled;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::backend("sqlite", "connection lock poisoned"))
    }

    /// Get current schema version from database
    pub fn get_schema_version(&self) -> Result<i32> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .map_err(|e| Error::Storage(format!("Failed to get schema version: {}", e)))
    }

    fn initialize_schema(&self) -> Result<()> {
        {
            let conn = self.lock()?;
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS schema_version (
                    version INTEGER PRIMARY KEY,
                    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS cache_entries (
                    namespace TEXT NOT NULL,
                    key TEXT NOT NULL,
                    value TEXT NOT NULL,
                    args TEXT,
                    created_at TEXT NOT NULL,
                    PRIMARY KEY (namespace, key)
                );

                INSERT OR IGNORE INTO schema_version (version) VALUES (1);
                "#,
            )
            .map_err(|e| Error::Storage(format!("Failed to initialize schema: {}", e)))?;
        }

        let version = self.get_schema_version()?;
        if version > CURRENT_SCHEMA_VERSION {
            warn!(
                "Cache database schema version {} is newer than supported {}",
                version, CURRENT_SCHEMA_VERSION
            );
        } else {
            debug!("Cache database schema is up to date (version {})", version);
        }
        Ok(())
    }

    /// Number of entries in this namespace
    pub fn len(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM cache_entries WHERE namespace = ?1",
            params![self.namespace],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Stored argument list for `key`, if one was recorded
    pub fn recorded_args(&self, key: &CacheKey) -> Result<Option<Vec<Value>>> {
        let conn = self.lock()?;
        let raw: Option<Option<String>> = conn
            .query_row(
                "SELECT args FROM cache_entries WHERE namespace = ?1 AND key = ?2",
                params![self.namespace, key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw
            .flatten()
            .and_then(|text| serde_json::from_str(&text).ok()))
    }

    fn upsert(&self, key: &CacheKey, value: &CachedValue, args: Option<&[Value]>) -> Result<()> {
        let value_json = serde_json::to_string(value)?;
        let args_json = match args {
            Some(args) => Some(serde_json::to_string(args)?),
            None => None,
        };
        let now = chrono::Utc::now().to_rfc3339();

        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO cache_entries (namespace, key, value, args, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![self.namespace, key.as_str(), value_json, args_json, now],
        )?;
        Ok(())
    }
}

impl CacheBackend for SqliteCache {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn get(&self, key: &CacheKey) -> Result<Option<CachedValue>> {
        let raw: Option<String> = {
            let conn = self.lock()?;
            conn.query_row(
                "SELECT value FROM cache_entries WHERE namespace = ?1 AND key = ?2",
                params![self.namespace, key.as_str()],
                |row| row.get(0),
            )
            .optional()?
        };

        Ok(raw.and_then(|text| match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, "Ignoring corrupted cache row: {}", e);
                None
            }
        }))
    }

    fn set(&self, key: &CacheKey, value: CachedValue) -> Result<()> {
        self.upsert(key, &value, None)
    }

    fn has(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    fn delete(&self, key: &CacheKey) -> Result<bool> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM cache_entries WHERE namespace = ?1 AND key = ?2",
            params![self.namespace, key.as_str()],
        )?;
        Ok(removed > 0)
    }

    fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM cache_entries WHERE namespace = ?1",
            params![self.namespace],
        )?;
        info!(namespace = %self.namespace, removed, "Cleared cache namespace");
        Ok(())
    }

    fn store(&self, key: &CacheKey, value: CachedValue, args: &[Value]) -> Result<()> {
        let args = self.record_args.then_some(args);
        self.upsert(key, &value, args)
    }
}
