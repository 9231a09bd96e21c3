//! In-memory backend
//!
//! A plain map behind a lock. Unbounded, no persistence; entries live as
//! long as the backend instance.

use parking_lot::RwLock;
use std::collections::HashMap;

use super::backend::CacheBackend;
use super::entry::CachedValue;
use super::key::CacheKey;
use crate::Result;

/// Process-local cache backend
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, CachedValue>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Snapshot of the stored keys, sorted
    pub fn keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl CacheBackend for MemoryCache {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &CacheKey) -> Result<Option<CachedValue>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &CacheKey, value: CachedValue) -> Result<()> {
        self.entries.write().insert(key.clone(), value);
        Ok(())
    }

    fn has(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.entries.read().contains_key(key))
    }

    fn delete(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.entries.write().remove(key).is_some())
    }

    fn clear(&self) -> Result<()> {
        self.entries.write().clear();
        Ok(())
    }
}
