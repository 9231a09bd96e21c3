//! Cache backend contract
//!
//! The memo engine only needs five synchronous operations from a store.
//! Implementations own their durability, namespacing and thread-safety;
//! the engine never assumes atomicity across calls.

use serde_json::Value;
use std::sync::Arc;

use super::entry::CachedValue;
use super::key::CacheKey;
use crate::Result;

/// Storage consumed by memoized proxies
pub trait CacheBackend: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &str;

    /// Fetch an entry. `Ok(None)` means absent.
    fn get(&self, key: &CacheKey) -> Result<Option<CachedValue>>;

    /// Insert or replace an entry
    fn set(&self, key: &CacheKey, value: CachedValue) -> Result<()>;

    /// Whether an entry exists, including entries holding `null`
    fn has(&self, key: &CacheKey) -> Result<bool>;

    /// Remove an entry. Returns true iff one existed and was removed.
    fn delete(&self, key: &CacheKey) -> Result<bool>;

    /// Remove every entry in this backend's scope
    fn clear(&self) -> Result<()>;

    /// Insert with the argument list that produced the entry.
    ///
    /// Backends that keep human-readable records override this; the
    /// default ignores `args`.
    fn store(&self, key: &CacheKey, value: CachedValue, args: &[Value]) -> Result<()> {
        let _ = args;
        self.set(key, value)
    }
}

/// Backend shared between proxies
pub type SharedBackend = Arc<dyn CacheBackend>;

impl<B: CacheBackend + ?Sized> CacheBackend for Arc<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn get(&self, key: &CacheKey) -> Result<Option<CachedValue>> {
        (**self).get(key)
    }

    fn set(&self, key: &CacheKey, value: CachedValue) -> Result<()> {
        (**self).set(key, value)
    }

    fn has(&self, key: &CacheKey) -> Result<bool> {
        (**self).has(key)
    }

    fn delete(&self, key: &CacheKey) -> Result<bool> {
        (**self).delete(key)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }

    fn store(&self, key: &CacheKey, value: CachedValue, args: &[Value]) -> Result<()> {
        (**self).store(key, value, args)
    }
}
