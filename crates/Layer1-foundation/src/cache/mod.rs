//! # Recall Cache Primitives
//!
//! Everything the memo engine needs below the interception layer.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │  key      operation + args ──► "op:[canonical,args]"      │
//! │           (optional KeyTransform applied first)           │
//! ├───────────────────────────────────────────────────────────┤
//! │  entry    CachedValue::Plain | CachedValue::Resolved      │
//! ├───────────────────────────────────────────────────────────┤
//! │  backend  get / set / has / delete / clear                │
//! │           MemoryCache (here), FileCache / SqliteCache     │
//! │           (crate::storage)                                │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use recall_foundation::cache::{generate_key, CacheBackend, CachedValue, MemoryCache};
//!
//! let cache = MemoryCache::new();
//! let key = generate_key("add", &[json!(2), json!(3)], None).unwrap();
//! cache.set(&key, CachedValue::plain(json!(5)))?;
//! assert!(cache.has(&key)?);
//! ```

pub mod backend;
pub mod entry;
pub mod key;
pub mod memory;

pub use backend::{CacheBackend, SharedBackend};
pub use entry::CachedValue;
pub use key::{
    args_to_values, canonical_args, canonical_json, canonicalize, generate_key, key_transform,
    CacheKey, KeyGenerator, KeyParts, KeyTransform, MAX_CANONICAL_DEPTH,
};
pub use memory::MemoryCache;
