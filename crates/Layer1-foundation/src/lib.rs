//! # recall-foundation
//!
//! Foundation layer for Recall:
//! - Cache: key generation, cached-entry model, backend contract, in-memory backend
//! - Storage: file-backed (JSON per key) and SQLite backends
//! - Config: cache modes, environment signal, `recall.json` settings
//! - Error: central error type
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  recall-core (Layer2)                                   │
//! │  wrap(target) ──► Memoized ──► Memo engine              │
//! │                                   │                     │
//! │          ┌────────────────────────┼──────────────┐      │
//! │          ▼                        ▼              ▼      │
//! │   KeyGenerator              CacheMode      CacheBackend │
//! │   (cache::key)            (config::mode)   (cache, storage)
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Cache
// ============================================================================
pub use cache::{
    // Keys
    args_to_values,
    canonical_args,
    canonical_json,
    canonicalize,
    generate_key,
    key_transform,
    // Backend contract
    CacheBackend,
    CacheKey,
    CachedValue,
    KeyGenerator,
    KeyParts,
    KeyTransform,
    MemoryCache,
    SharedBackend,
    MAX_CANONICAL_DEPTH,
};

// ============================================================================
// Storage
// ============================================================================
pub use storage::{FileCache, FileEntry, SqliteCache, DEFAULT_NAMESPACE};

// ============================================================================
// Config
// ============================================================================
pub use config::{
    resolve_mode, BackendKind, CacheMode, ModeSignal, RecallSettings, MODE_ENV_VAR,
    RECALL_CONFIG_FILE, SQLITE_FILE,
};
