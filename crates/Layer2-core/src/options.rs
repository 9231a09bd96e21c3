//! Wrap options and entry points

use recall_foundation::{
    resolve_mode, CacheBackend, CacheMode, KeyTransform, MemoryCache, ModeSignal, RecallSettings,
    Result, SharedBackend,
};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::memo::Memo;
use crate::proxy::Memoized;
use crate::target::Target;

/// Configuration for [`wrap`]
#[derive(Clone, Default)]
pub struct WrapOptions {
    /// Backend; a fresh in-memory cache when absent
    pub cache: Option<SharedBackend>,
    /// Explicit mode; wins over the signal
    pub mode: Option<CacheMode>,
    /// Key preprocessing
    pub key: Option<KeyTransform>,
    /// Fallback mode signal, usually captured from the environment
    pub signal: ModeSignal,
}

impl WrapOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(mut self, cache: SharedBackend) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_mode(mut self, mode: CacheMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_key(mut self, transform: KeyTransform) -> Self {
        self.key = Some(transform);
        self
    }

    pub fn with_signal(mut self, signal: ModeSignal) -> Self {
        self.signal = signal;
        self
    }

    /// Options from file settings: configured backend and explicit mode
    pub fn from_settings(settings: &RecallSettings) -> Result<Self> {
        Ok(Self {
            cache: Some(settings.build_backend()?),
            mode: settings.mode(),
            ..Self::default()
        })
    }

    /// Mode these options resolve to
    pub fn resolved_mode(&self) -> CacheMode {
        resolve_mode(self.mode, self.signal.as_str())
    }
}

impl<B> From<Arc<B>> for WrapOptions
where
    B: CacheBackend + ?Sized + 'static,
{
    fn from(cache: Arc<B>) -> Self {
        Self {
            cache: Some(Arc::new(cache)),
            ..Self::default()
        }
    }
}

impl fmt::Debug for WrapOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapOptions")
            .field("cache", &self.cache.as_ref().map(|c| c.name().to_string()))
            .field("mode", &self.mode)
            .field("key", &self.key.is_some())
            .field("signal", &self.signal)
            .finish()
    }
}

/// Wrap `target` so its operations are memoized.
///
/// The mode is resolved here, once. Later changes to the signal do not
/// affect the returned proxy.
pub fn wrap(target: Arc<dyn Target>, options: impl Into<WrapOptions>) -> Memoized {
    let options = options.into();
    let mode = options.resolved_mode();
    let cache: SharedBackend = match options.cache {
        Some(cache) => cache,
        None => Arc::new(MemoryCache::new()),
    };
    debug!(backend = cache.name(), mode = %mode, "Wrapping target");

    let memo = Memo::new(cache, mode).with_key_transform(options.key);
    Memoized::new(target, memo)
}

/// [`wrap`], with the fallback signal read from `RECALL_CACHE_MODE`
pub fn wrap_with_env(target: Arc<dyn Target>, options: impl Into<WrapOptions>) -> Memoized {
    let options = options.into().with_signal(ModeSignal::from_env());
    wrap(target, options)
}
