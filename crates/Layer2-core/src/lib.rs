//! recall-core: transparent memoization of target operations
//!
//! Layer2 - wraps a [`Target`] so that each operation call is looked up
//! in a cache backend before running.
//!
//! # Modules
//!
//! - `target`: the `Target` trait, `Invocation` results, `ObjectTarget` builder
//! - `memo`: the per-call state machine (`Memo`) and `MemoStats`
//! - `proxy`: `Memoized`, the recursive proxy over a target
//! - `options`: `WrapOptions`, `wrap`, `wrap_with_env`
//!
//! # Example
//!
//! ```ignore
//! use recall_core::{arg_i64, wrap, ObjectTarget, WrapOptions};
//! use recall_foundation::{CacheMode, FileCache};
//!
//! let calc = Arc::new(
//!     ObjectTarget::new()
//!         .with_operation("add", |args| Ok(json!(arg_i64(&args, 0)? + arg_i64(&args, 1)?))),
//! );
//!
//! let proxy = wrap(calc, WrapOptions::new()
//!     .with_cache(Arc::new(FileCache::new("/tmp/recall")))
//!     .with_mode(CacheMode::Normal));
//!
//! let five = proxy.call("add", vec![json!(2), json!(3)])?.into_ready();
//! ```

pub mod memo;
pub mod options;
pub mod proxy;
pub mod target;

// Re-exports: Target
pub use target::{arg_i64, arg_str, Invocation, Member, ObjectTarget, Target};

// Re-exports: Memo
pub use memo::{Memo, MemoStats};

// Re-exports: Proxy
pub use proxy::{MemoMember, MemoOperation, Memoized};

// Re-exports: Entry points
pub use options::{wrap, wrap_with_env, WrapOptions};

// Re-exports: Layer1 types used in signatures
pub use recall_foundation::{
    CacheBackend, CacheKey, CacheMode, CachedValue, Error, KeyParts, KeyTransform, ModeSignal,
    Result, SharedBackend,
};
