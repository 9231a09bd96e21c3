//! Memo engine
//!
//! Runs the per-call state machine shared by dynamic proxies and typed
//! decorators:
//!
//! ```text
//! START ─┬─ Disabled ─────────────────────────────► EXECUTE ─► RETURN
//!        ├─ no key ───────────────────────────────► EXECUTE ─► RETURN
//!        ├─ Normal/ReadOnly + hit ────────────────► RETURN_CACHED
//!        ├─ ReadOnly + miss ──────────────────────► RETURN_EMPTY
//!        └─ Normal miss / ForceRefresh ─► EXECUTE ─┬─ ready   ─► STORE ─► RETURN
//!                                                  └─ pending ─► RETURN (store on Ok)
//! ```
//!
//! No lock is held while the operation runs. Two identical calls racing
//! on a cold key may both execute; the later write wins.

mod stats;

pub use stats::MemoStats;

use futures::future::FutureExt;
use recall_foundation::{
    args_to_values, CacheKey, CacheMode, CachedValue, Error, KeyGenerator, KeyTransform,
    Result, SharedBackend,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::target::Invocation;
use stats::StatsCounters;

/// Memoization context: backend, resolved mode, key generator
#[derive(Clone)]
pub struct Memo {
    backend: SharedBackend,
    mode: CacheMode,
    keys: KeyGenerator,
    scope: Option<String>,
    stats: Arc<StatsCounters>,
}

impl Memo {
    pub fn new(backend: SharedBackend, mode: CacheMode) -> Self {
        Self {
            backend,
            mode,
            keys: KeyGenerator::new(),
            scope: None,
            stats: Arc::new(StatsCounters::default()),
        }
    }

    pub fn with_key_transform(mut self, transform: Option<KeyTransform>) -> Self {
        self.keys = match transform {
            Some(transform) => KeyGenerator::with_transform(transform),
            None => KeyGenerator::new(),
        };
        self
    }

    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    pub fn backend(&self) -> &SharedBackend {
        &self.backend
    }

    pub fn keys(&self) -> &KeyGenerator {
        &self.keys
    }

    /// Dot-joined path of the nested object this context serves
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn stats(&self) -> MemoStats {
        self.stats.snapshot()
    }

    /// Context for a nested object: same backend, mode, transform and stats
    pub fn scoped(&self, segment: &str) -> Memo {
        let mut child = self.clone();
        child.scope = Some(self.operation_id(segment));
        child
    }

    /// Identifier of operation `name` within this scope
    pub fn operation_id(&self, name: &str) -> String {
        match &self.scope {
            Some(scope) => format!("{}.{}", scope, name),
            None => name.to_string(),
        }
    }

    /// Key the call would be stored under, if it can be keyed
    pub fn key_for(&self, name: &str, args: &[Value]) -> Option<CacheKey> {
        self.keys.generate(&self.operation_id(name), args)
    }

    fn lookup(&self, key: &CacheKey) -> Result<Option<CachedValue>> {
        if self.backend.has(key)? {
            self.backend.get(key)
        } else {
            Ok(None)
        }
    }

    // ========================================================================
    // Dynamic calls
    // ========================================================================

    /// Memoize one call of operation `name`; `exec` performs the real call
    pub fn call<F>(&self, name: &str, args: Vec<Value>, exec: F) -> Result<Invocation>
    where
        F: FnOnce(Vec<Value>) -> Result<Invocation>,
    {
        let operation = self.operation_id(name);

        if self.mode == CacheMode::Disabled {
            self.stats.bypass();
            trace!(operation = %operation, "Cache disabled, executing directly");
            return exec(args);
        }

        let Some(key) = self.keys.generate(&operation, &args) else {
            self.stats.uncacheable();
            return exec(args);
        };

        if self.mode.reads() {
            if let Some(entry) = self.lookup(&key)? {
                self.stats.hit();
                debug!(key = %key, resolved = entry.is_resolved(), "Cache hit");
                return Ok(match entry {
                    CachedValue::Plain(value) => Invocation::Ready(value),
                    CachedValue::Resolved(value) => Invocation::resolved(value),
                });
            }
            self.stats.miss();
            if self.mode == CacheMode::ReadOnly {
                debug!(key = %key, "Cache miss in read-only mode, returning empty");
                return Ok(Invocation::Empty);
            }
        }

        trace!(key = %key, mode = %self.mode, "Executing operation");
        let recorded = args.clone();
        match exec(args)? {
            Invocation::Ready(value) => {
                if self.mode.writes() {
                    self.backend
                        .store(&key, CachedValue::Plain(value.clone()), &recorded)?;
                    self.stats.store();
                    debug!(key = %key, "Stored result");
                }
                Ok(Invocation::Ready(value))
            }
            Invocation::Pending(fut) => {
                if !self.mode.writes() {
                    return Ok(Invocation::Pending(fut));
                }
                let backend = Arc::clone(&self.backend);
                let stats = Arc::clone(&self.stats);
                Ok(Invocation::Pending(
                    async move {
                        // Rejections propagate and are never stored
                        let value = fut.await?;
                        backend.store(&key, CachedValue::Resolved(value.clone()), &recorded)?;
                        stats.store();
                        debug!(key = %key, "Stored resolved result");
                        Ok::<_, Error>(value)
                    }
                    .boxed(),
                ))
            }
            Invocation::Empty => Ok(Invocation::Empty),
        }
    }

    // ========================================================================
    // Typed calls
    // ========================================================================

    fn typed_lookup<R: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<R>> {
        let Some(entry) = self.lookup(key)? else {
            return Ok(None);
        };
        match serde_json::from_value(entry.into_value()) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                debug!(key = %key, error = %e, "Cached value has a different shape, treating as miss");
                Ok(None)
            }
        }
    }

    fn typed_store<R: Serialize>(
        &self,
        key: &CacheKey,
        value: &R,
        args: &[Value],
        resolved: bool,
    ) -> Result<()> {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                debug!(key = %key, error = %e, "Result not serializable, not caching");
                return Ok(());
            }
        };
        let entry = if resolved {
            CachedValue::Resolved(value)
        } else {
            CachedValue::Plain(value)
        };
        self.backend.store(key, entry, args)?;
        self.stats.store();
        Ok(())
    }

    /// Resolve the key for a typed call. `None` means run uncached.
    fn typed_key<A: Serialize + ?Sized>(&self, name: &str, args: &A) -> Option<(CacheKey, Vec<Value>)> {
        let operation = self.operation_id(name);
        let values = args_to_values(args);
        let key = values
            .as_deref()
            .and_then(|values| self.keys.generate(&operation, values));
        match (key, values) {
            (Some(key), Some(values)) => Some((key, values)),
            _ => {
                self.stats.uncacheable();
                None
            }
        }
    }

    /// Memoize a typed synchronous method.
    ///
    /// Returns `Ok(None)` only for a read-only miss.
    pub fn invoke<A, R, F>(&self, name: &str, args: &A, exec: F) -> Result<Option<R>>
    where
        A: Serialize + ?Sized,
        R: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<R>,
    {
        if self.mode == CacheMode::Disabled {
            self.stats.bypass();
            return exec().map(Some);
        }

        let Some((key, values)) = self.typed_key(name, args) else {
            return exec().map(Some);
        };

        if self.mode.reads() {
            if let Some(value) = self.typed_lookup(&key)? {
                self.stats.hit();
                debug!(key = %key, "Cache hit");
                return Ok(Some(value));
            }
            self.stats.miss();
            if self.mode == CacheMode::ReadOnly {
                return Ok(None);
            }
        }

        let value = exec()?;
        if self.mode.writes() {
            self.typed_store(&key, &value, &values, false)?;
        }
        Ok(Some(value))
    }

    /// Memoize a typed asynchronous method. Failed futures are not stored.
    pub async fn invoke_async<A, R, F, Fut>(&self, name: &str, args: &A, exec: F) -> Result<Option<R>>
    where
        A: Serialize + ?Sized,
        R: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        if self.mode == CacheMode::Disabled {
            self.stats.bypass();
            return exec().await.map(Some);
        }

        let Some((key, values)) = self.typed_key(name, args) else {
            return exec().await.map(Some);
        };

        if self.mode.reads() {
            if let Some(value) = self.typed_lookup(&key)? {
                self.stats.hit();
                debug!(key = %key, "Cache hit");
                return Ok(Some(value));
            }
            self.stats.miss();
            if self.mode == CacheMode::ReadOnly {
                return Ok(None);
            }
        }

        let value = exec().await?;
        if self.mode.writes() {
            self.typed_store(&key, &value, &values, true)?;
        }
        Ok(Some(value))
    }
}

impl fmt::Debug for Memo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("backend", &self.backend.name())
            .field("mode", &self.mode)
            .field("keys", &self.keys)
            .field("scope", &self.scope)
            .finish()
    }
}
