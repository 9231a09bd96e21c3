//! File-backed cache backend
//!
//! One JSON file per key:
//!
//! ```text
//! <root>/
//!   <namespace>/                  (default: "default")
//!     <sha256(key)>.json          { key, value, createdAt, args? }
//! ```
//!
//! Reads are forgiving: a missing, unreadable or unparseable file is a
//! miss. `delete` and `clear` are best-effort and never fail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::cache::{CacheBackend, CacheKey, CachedValue};
use crate::{Error, Result};

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "default";

/// On-disk record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub key: CacheKey,
    pub value: CachedValue,
    pub created_at: DateTime<Utc>,
    /// Argument list that produced the entry, kept for inspection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<Value>>,
}

/// JSON file cache
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
    namespace: String,
    record_args: bool,
}

impl FileCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            record_args: false,
        }
    }

    /// Cache under the platform cache directory (`~/.cache/recall` on Linux)
    pub fn in_cache_dir() -> Result<Self> {
        let dir = dirs::cache_dir()
            .ok_or_else(|| Error::Config("Cannot find cache directory".to_string()))?
            .join("recall");
        Ok(Self::new(dir))
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = if namespace.trim().is_empty() {
            DEFAULT_NAMESPACE.to_string()
        } else {
            namespace
        };
        self
    }

    /// Persist the argument list next to each entry
    pub fn record_args(mut self, enabled: bool) -> Self {
        self.record_args = enabled;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn namespace_dir(&self) -> PathBuf {
        self.root.join(&self.namespace)
    }

    /// File holding the entry for `key`
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.namespace_dir().join(format!("{}.json", key.digest()))
    }

    fn ensure_dir(&self) -> Result<()> {
        let dir = self.namespace_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir)
                .map_err(|e| Error::backend("file", format!("Failed to create directory: {}", e)))?;
        }
        Ok(())
    }

    /// Load the full record for `key`, treating any defect as absent
    pub fn read_entry(&self, key: &CacheKey) -> Option<FileEntry> {
        let path = self.entry_path(key);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        let entry: FileEntry = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Ignoring corrupted cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        if &entry.key != key {
            debug!(expected = %key, found = %entry.key, "Cache file holds a different key");
            return None;
        }
        Some(entry)
    }

    fn write_entry(&self, entry: &FileEntry) -> Result<()> {
        self.ensure_dir()?;
        let path = self.entry_path(&entry.key);
        let content = serde_json::to_string_pretty(entry)
            .map_err(|e| Error::backend("file", format!("Failed to serialize: {}", e)))?;
        std::fs::write(&path, content)
            .map_err(|e| Error::backend("file", format!("Failed to write {}: {}", path.display(), e)))
    }
}

impl CacheBackend for FileCache {
    fn name(&self) -> &str {
        "file"
    }

    fn get(&self, key: &CacheKey) -> Result<Option<CachedValue>> {
        Ok(self.read_entry(key).map(|entry| entry.value))
    }

    fn set(&self, key: &CacheKey, value: CachedValue) -> Result<()> {
        self.write_entry(&FileEntry {
            key: key.clone(),
            value,
            created_at: Utc::now(),
            args: None,
        })
    }

    fn has(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.read_entry(key).is_some())
    }

    fn delete(&self, key: &CacheKey) -> Result<bool> {
        let path = self.entry_path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => {
                warn!("Failed to remove cache entry {}: {}", path.display(), e);
                Ok(false)
            }
        }
    }

    fn clear(&self) -> Result<()> {
        let dir = self.namespace_dir();
        if dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                warn!("Could not fully clear {}: {}", dir.display(), e);
            }
        }
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!("Failed to recreate {}: {}", dir.display(), e);
        }
        Ok(())
    }

    fn store(&self, key: &CacheKey, value: CachedValue, args: &[Value]) -> Result<()> {
        self.write_entry(&FileEntry {
            key: key.clone(),
            value,
            created_at: Utc::now(),
            args: self.record_args.then(|| args.to_vec()),
        })
    }
}
