//! Memoization end-to-end tests
//!
//! `cargo test -p recall-core --test memoize`

use recall_core::{
    arg_i64, arg_str, wrap, wrap_with_env, CacheBackend, CacheKey, CacheMode, CachedValue, Error,
    KeyParts, ModeSignal, ObjectTarget, Target, WrapOptions,
};
use recall_foundation::{key_transform, FileCache, MemoryCache, SqliteCache, MODE_ENV_VAR};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;
use tempfile::TempDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();
    });
}

fn adder(calls: Arc<AtomicUsize>) -> Arc<dyn Target> {
    Arc::new(ObjectTarget::new().with_operation("add", move |args| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!(arg_i64(&args, 0)? + arg_i64(&args, 1)?))
    }))
}

fn counter(counter: Arc<AtomicI64>) -> Arc<dyn Target> {
    Arc::new(ObjectTarget::new().with_operation("getCount", move |_| {
        Ok(json!(counter.fetch_add(1, Ordering::SeqCst)))
    }))
}

/// Memory backend whose next `get` can be made to fail
#[derive(Default)]
struct FlakyCache {
    inner: MemoryCache,
    fail_next_get: AtomicBool,
}

impl FlakyCache {
    fn fail_next_get(&self) {
        self.fail_next_get.store(true, Ordering::SeqCst);
    }
}

impl CacheBackend for FlakyCache {
    fn name(&self) -> &str {
        "flaky"
    }

    fn get(&self, key: &CacheKey) -> recall_core::Result<Option<CachedValue>> {
        if self.fail_next_get.swap(false, Ordering::SeqCst) {
            return Err(Error::backend("flaky", "get failed"));
        }
        self.inner.get(key)
    }

    fn set(&self, key: &CacheKey, value: CachedValue) -> recall_core::Result<()> {
        self.inner.set(key, value)
    }

    fn has(&self, key: &CacheKey) -> recall_core::Result<bool> {
        self.inner.has(key)
    }

    fn delete(&self, key: &CacheKey) -> recall_core::Result<bool> {
        self.inner.delete(key)
    }

    fn clear(&self) -> recall_core::Result<()> {
        self.inner.clear()
    }
}

fn ready(value: recall_core::Result<recall_core::Invocation>) -> Value {
    value.unwrap().into_ready().unwrap()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_add_is_computed_once_per_argument_list() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let proxy = wrap(adder(calls.clone()), WrapOptions::new().with_mode(CacheMode::Normal));

    assert_eq!(ready(proxy.call("add", vec![json!(2), json!(3)])), json!(5));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert_eq!(ready(proxy.call("add", vec![json!(2), json!(3)])), json!(5));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert_eq!(ready(proxy.call("add", vec![json!(3), json!(4)])), json!(7));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_force_refresh_then_normal_sees_last_write() {
    init_tracing();
    let count = Arc::new(AtomicI64::new(0));
    let cache = Arc::new(MemoryCache::new());
    let target = counter(count.clone());

    let refresh = wrap(
        target.clone(),
        WrapOptions::new()
            .with_cache(cache.clone())
            .with_mode(CacheMode::ForceRefresh),
    );
    assert_eq!(ready(refresh.call("getCount", vec![])), json!(0));
    assert_eq!(ready(refresh.call("getCount", vec![])), json!(1));

    let normal = wrap(
        target,
        WrapOptions::new().with_cache(cache).with_mode(CacheMode::Normal),
    );
    assert_eq!(ready(normal.call("getCount", vec![])), json!(1));
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rejections_are_never_cached() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();
    let target: Arc<dyn Target> = Arc::new(ObjectTarget::new().with_async_operation(
        "fetch",
        move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::operation_msg("x")) }
        },
    ));
    let cache = Arc::new(MemoryCache::new());
    let proxy = wrap(target, cache.clone());

    for _ in 0..2 {
        let err = proxy.resolve("fetch", vec![]).await.unwrap_err();
        assert_eq!(err.to_string(), "x");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!cache.has(&CacheKey::from_raw("fetch:[]")).unwrap());
}

// ============================================================================
// Modes
// ============================================================================

#[test]
fn test_disabled_executes_every_call() {
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = Arc::new(MemoryCache::new());
    let proxy = wrap(
        adder(calls.clone()),
        WrapOptions::new()
            .with_cache(cache.clone())
            .with_mode(CacheMode::Disabled),
    );

    for _ in 0..5 {
        assert_eq!(ready(proxy.call("add", vec![json!(1), json!(1)])), json!(2));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    assert!(cache.is_empty());
}

#[test]
fn test_read_only_hit_and_miss() {
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = Arc::new(MemoryCache::new());
    cache
        .set(&CacheKey::from_raw("add:[1,2]"), CachedValue::plain(json!(42)))
        .unwrap();

    let proxy = wrap(
        adder(calls.clone()),
        WrapOptions::new()
            .with_cache(cache.clone())
            .with_mode(CacheMode::ReadOnly),
    );

    assert_eq!(ready(proxy.call("add", vec![json!(1), json!(2)])), json!(42));
    assert!(proxy.call("add", vec![json!(5), json!(5)]).unwrap().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_cached_null_is_a_hit() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();
    let target: Arc<dyn Target> = Arc::new(ObjectTarget::new().with_operation("find", move |_| {
        counted.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Null)
    }));
    let proxy = wrap(target, WrapOptions::new());

    assert_eq!(ready(proxy.call("find", vec![json!("id")])), Value::Null);
    assert_eq!(ready(proxy.call("find", vec![json!("id")])), Value::Null);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_env_signal_is_read_once_at_wrap_time() {
    let calls = Arc::new(AtomicUsize::new(0));
    std::env::set_var(MODE_ENV_VAR, "off");
    let proxy = wrap_with_env(adder(calls.clone()), WrapOptions::new());
    std::env::remove_var(MODE_ENV_VAR);

    assert_eq!(proxy.mode(), CacheMode::Disabled);
    proxy.call("add", vec![json!(1), json!(2)]).unwrap();
    proxy.call("add", vec![json!(1), json!(2)]).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_explicit_mode_beats_signal() {
    let proxy = wrap(
        adder(Arc::new(AtomicUsize::new(0))),
        WrapOptions::new()
            .with_mode(CacheMode::Normal)
            .with_signal(ModeSignal::new("READ_ONLY")),
    );
    assert_eq!(proxy.mode(), CacheMode::Normal);
}

// ============================================================================
// Async
// ============================================================================

#[tokio::test]
async fn test_async_result_cached_as_resolved() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();
    let target: Arc<dyn Target> = Arc::new(ObjectTarget::new().with_async_operation(
        "lookup",
        move |args| {
            counted.fetch_add(1, Ordering::SeqCst);
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(json!({ "user": arg_str(&args, 0)?, "ok": true }))
            }
        },
    ));
    let cache = Arc::new(MemoryCache::new());
    let proxy = wrap(target, cache.clone());

    let first = proxy.call("lookup", vec![json!("ann")]).unwrap();
    assert!(first.is_pending());
    assert_eq!(
        first.resolve().await.unwrap(),
        Some(json!({"ok": true, "user": "ann"}))
    );

    let second = proxy.call("lookup", vec![json!("ann")]).unwrap();
    assert!(second.is_pending());
    assert_eq!(
        second.resolve().await.unwrap(),
        Some(json!({"ok": true, "user": "ann"}))
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        cache.get(&CacheKey::from_raw(r#"lookup:["ann"]"#)).unwrap(),
        Some(CachedValue::resolved(json!({"ok": true, "user": "ann"})))
    );
}

#[tokio::test]
async fn test_plain_value_shaped_like_a_tag_stays_plain() {
    let payload = json!({"kind": "resolved", "value": 1});
    let returned = payload.clone();
    let target: Arc<dyn Target> =
        Arc::new(ObjectTarget::new().with_operation("raw", move |_| Ok(returned.clone())));
    let proxy = wrap(target, WrapOptions::new());

    proxy.call("raw", vec![]).unwrap();
    let hit = proxy.call("raw", vec![]).unwrap();
    assert!(hit.is_ready());
    assert_eq!(hit.into_ready(), Some(payload));
}

#[tokio::test]
async fn test_unawaited_future_leaves_no_entry() {
    let target: Arc<dyn Target> = Arc::new(
        ObjectTarget::new().with_async_operation("slow", |_| async { Ok(json!(1)) }),
    );
    let cache = Arc::new(MemoryCache::new());
    let proxy = wrap(target, cache.clone());

    drop(proxy.call("slow", vec![]).unwrap());
    assert!(cache.is_empty());

    proxy.resolve("slow", vec![]).await.unwrap();
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_force_refresh_async_stores_resolved_and_skips_rejections() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();
    let target: Arc<dyn Target> = Arc::new(ObjectTarget::new().with_async_operation(
        "fetch",
        move |args| {
            counted.fetch_add(1, Ordering::SeqCst);
            async move {
                match arg_str(&args, 0)? {
                    "fail" => Err(Error::operation_msg("x")),
                    name => Ok(json!({ "name": name })),
                }
            }
        },
    ));
    let cache = Arc::new(MemoryCache::new());
    let proxy = wrap(
        target,
        WrapOptions::new()
            .with_cache(cache.clone())
            .with_mode(CacheMode::ForceRefresh),
    );

    let first = proxy.call("fetch", vec![json!("ok")]).unwrap();
    assert!(first.is_pending());
    assert_eq!(first.resolve().await.unwrap(), Some(json!({"name": "ok"})));
    assert_eq!(
        cache.get(&CacheKey::from_raw(r#"fetch:["ok"]"#)).unwrap(),
        Some(CachedValue::resolved(json!({"name": "ok"})))
    );

    for _ in 0..2 {
        let err = proxy.resolve("fetch", vec![json!("fail")]).await.unwrap_err();
        assert_eq!(err.to_string(), "x");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(!cache.has(&CacheKey::from_raw(r#"fetch:["fail"]"#)).unwrap());
    assert_eq!(cache.len(), 1);
}

// ============================================================================
// Backend failures
// ============================================================================

#[test]
fn test_backend_read_failure_propagates_and_recovers() {
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = Arc::new(FlakyCache::default());
    let proxy = wrap(adder(calls.clone()), cache.clone());

    assert_eq!(ready(proxy.call("add", vec![json!(2), json!(3)])), json!(5));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    cache.fail_next_get();
    let err = proxy.call("add", vec![json!(2), json!(3)]).unwrap_err();
    assert!(err.is_caching_error());
    assert_eq!(err.to_string(), "Backend error: flaky - get failed");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert_eq!(ready(proxy.call("add", vec![json!(2), json!(3)])), json!(5));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(proxy.stats().hits, 1);
}

// ============================================================================
// Keys
// ============================================================================

#[test]
fn test_argument_object_order_does_not_matter() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();
    let target: Arc<dyn Target> = Arc::new(ObjectTarget::new().with_operation("q", move |_| {
        counted.fetch_add(1, Ordering::SeqCst);
        Ok(json!("rows"))
    }));
    let proxy = wrap(target, WrapOptions::new());

    proxy.call("q", vec![json!({"a": 1, "b": [1, 2]})]).unwrap();
    proxy.call("q", vec![json!({"b": [1, 2], "a": 1})]).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    proxy.call("q", vec![json!({"a": 1, "b": [2, 1]})]).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_key_transform_collapses_volatile_argument() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();
    let target: Arc<dyn Target> = Arc::new(ObjectTarget::new().with_operation("search", move |args| {
        counted.fetch_add(1, Ordering::SeqCst);
        Ok(json!(format!("results for {}", arg_str(&args, 0)?)))
    }));
    let transform = key_transform(|op, args| KeyParts::new(op, args.iter().take(1).cloned().collect()));
    let proxy = wrap(target, WrapOptions::new().with_key(transform));

    let a = ready(proxy.call("search", vec![json!("rust"), json!(1_700_000_000)]));
    let b = ready(proxy.call("search", vec![json!("rust"), json!(1_800_000_000)]));
    assert_eq!(a, b);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_key_transform_shares_entries_across_operations() {
    let target: Arc<dyn Target> = Arc::new(
        ObjectTarget::new()
            .with_operation("get_user", |_| Ok(json!("from get_user")))
            .with_operation("fetch_user", |_| Ok(json!("from fetch_user"))),
    );
    let transform = key_transform(|_, args| KeyParts::new("user", args.to_vec()));
    let proxy = wrap(target, WrapOptions::new().with_key(transform));

    proxy.call("get_user", vec![json!(7)]).unwrap();
    let shared = ready(proxy.call("fetch_user", vec![json!(7)]));
    assert_eq!(shared, json!("from get_user"));
}

#[test]
fn test_unkeyable_arguments_execute_uncached() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();
    let target: Arc<dyn Target> = Arc::new(ObjectTarget::new().with_operation("walk", move |_| {
        counted.fetch_add(1, Ordering::SeqCst);
        Ok(json!("walked"))
    }));
    let cache = Arc::new(MemoryCache::new());
    let proxy = wrap(target, cache.clone());

    let mut deep = json!(0);
    for _ in 0..200 {
        deep = json!([deep]);
    }
    for _ in 0..2 {
        assert_eq!(ready(proxy.call("walk", vec![deep.clone()])), json!("walked"));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(cache.is_empty());
    assert_eq!(proxy.stats().uncacheable, 2);
}

// ============================================================================
// Nesting and pass-through
// ============================================================================

#[test]
fn test_nested_objects_are_wrapped_with_same_backend() {
    let calls = Arc::new(AtomicUsize::new(0));
    let target: Arc<dyn Target> = Arc::new(
        ObjectTarget::new()
            .with_shared_object("math", adder(calls.clone()))
            .with_value("name", "calculator"),
    );
    let cache = Arc::new(MemoryCache::new());
    let proxy = wrap(target, cache.clone());

    let math = proxy.object("math").unwrap();
    assert_eq!(ready(math.call("add", vec![json!(2), json!(2)])), json!(4));
    assert_eq!(ready(math.call("add", vec![json!(2), json!(2)])), json!(4));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.keys(), vec![CacheKey::from_raw("math.add:[2,2]")]);

    assert_eq!(proxy.value("name"), Some(json!("calculator")));
    proxy.set("name", json!("abacus")).unwrap();
    assert_eq!(proxy.value("name"), Some(json!("abacus")));
}

// ============================================================================
// Backends
// ============================================================================

#[test]
fn test_file_backend_survives_rewrap() {
    let dir = TempDir::new().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let first = wrap(adder(calls.clone()), Arc::new(FileCache::new(dir.path())));
    assert_eq!(ready(first.call("add", vec![json!(20), json!(22)])), json!(42));

    let second = wrap(adder(calls.clone()), Arc::new(FileCache::new(dir.path())));
    assert_eq!(ready(second.call("add", vec![json!(20), json!(22)])), json!(42));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_file_backend_records_arguments() {
    let dir = TempDir::new().unwrap();
    let cache = Arc::new(FileCache::new(dir.path()).record_args(true));
    let proxy = wrap(adder(Arc::new(AtomicUsize::new(0))), cache.clone());

    proxy.call("add", vec![json!(1), json!(2)]).unwrap();
    let entry = cache.read_entry(&CacheKey::from_raw("add:[1,2]")).unwrap();
    assert_eq!(entry.value, CachedValue::plain(json!(3)));
    assert_eq!(entry.args, Some(vec![json!(1), json!(2)]));
}

#[tokio::test]
async fn test_sqlite_backend_end_to_end() {
    let cache = Arc::new(SqliteCache::in_memory().unwrap());
    let target: Arc<dyn Target> = Arc::new(
        ObjectTarget::new().with_async_operation("load", |args| async move {
            Ok(json!({ "id": arg_i64(&args, 0)? }))
        }),
    );
    let proxy = wrap(target, cache.clone());

    proxy.resolve("load", vec![json!(9)]).await.unwrap();
    assert_eq!(
        cache.get(&CacheKey::from_raw("load:[9]")).unwrap(),
        Some(CachedValue::resolved(json!({"id": 9})))
    );
    assert_eq!(
        proxy.resolve("load", vec![json!(9)]).await.unwrap(),
        Some(json!({"id": 9}))
    );
    assert_eq!(proxy.stats().hits, 1);
}
