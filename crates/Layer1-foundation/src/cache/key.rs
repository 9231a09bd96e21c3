//! Cache key generation
//!
//! A key is `<operation>:<canonical-args>`, where the argument list is
//! serialized as JSON with object keys sorted recursively. Two argument
//! lists that are equal up to object key order yield the same key.
//!
//! Generation never fails loudly: arguments that cannot be canonicalized
//! produce `None`, and callers run the operation without caching.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::debug;

/// Nesting limit for canonical serialization
pub const MAX_CANONICAL_DEPTH: usize = 128;

/// A generated cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap an already formatted key
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Fixed-length, filesystem-safe digest of the key (hex SHA-256)
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Operation identifier and arguments as seen by the key generator
#[derive(Debug, Clone, PartialEq)]
pub struct KeyParts {
    pub operation: String,
    pub args: Vec<Value>,
}

impl KeyParts {
    pub fn new(operation: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            operation: operation.into(),
            args,
        }
    }
}

/// Caller-supplied preprocessing applied before a key is built
pub type KeyTransform = Arc<dyn Fn(&str, &[Value]) -> KeyParts + Send + Sync>;

/// Box a closure as a [`KeyTransform`]
pub fn key_transform<F>(f: F) -> KeyTransform
where
    F: Fn(&str, &[Value]) -> KeyParts + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Build a key for `operation` called with `args`.
///
/// Returns `None` when the arguments cannot be canonicalized.
pub fn generate_key(
    operation: &str,
    args: &[Value],
    transform: Option<&KeyTransform>,
) -> Option<CacheKey> {
    let serialized = match transform {
        Some(transform) => {
            let parts = transform(operation, args);
            canonical_args(&parts.args).map(|s| (parts.operation, s))
        }
        None => canonical_args(args).map(|s| (operation.to_string(), s)),
    };

    match serialized {
        Some((operation, args)) => Some(CacheKey(format!("{}:{}", operation, args))),
        None => {
            debug!(operation, "Arguments not canonicalizable, call will not be cached");
            None
        }
    }
}

/// Key generator bound to an optional transform
#[derive(Clone, Default)]
pub struct KeyGenerator {
    transform: Option<KeyTransform>,
}

impl KeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transform(transform: KeyTransform) -> Self {
        Self {
            transform: Some(transform),
        }
    }

    pub fn transform(&self) -> Option<&KeyTransform> {
        self.transform.as_ref()
    }

    pub fn generate(&self, operation: &str, args: &[Value]) -> Option<CacheKey> {
        generate_key(operation, args, self.transform.as_ref())
    }

    /// Build a key from any serializable argument value.
    ///
    /// Tuples and sequences become the argument list; any other value is
    /// treated as a single argument.
    pub fn generate_typed<A: Serialize + ?Sized>(
        &self,
        operation: &str,
        args: &A,
    ) -> Option<CacheKey> {
        let args = args_to_values(args)?;
        self.generate(operation, &args)
    }
}

impl fmt::Debug for KeyGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyGenerator")
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// Convert typed arguments into an argument list
pub fn args_to_values<A: Serialize + ?Sized>(args: &A) -> Option<Vec<Value>> {
    match serde_json::to_value(args) {
        Ok(Value::Array(items)) => Some(items),
        Ok(other) => Some(vec![other]),
        Err(e) => {
            debug!(error = %e, "Failed to serialize arguments");
            None
        }
    }
}

/// Canonical JSON for an argument list
pub fn canonical_args(args: &[Value]) -> Option<String> {
    let mut out = String::with_capacity(64);
    out.push('[');
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_canonical(arg, &mut out, 1)?;
    }
    out.push(']');
    Some(out)
}

/// Canonical JSON for a single value (object keys sorted recursively)
pub fn canonical_json(value: &Value) -> Option<String> {
    let mut out = String::new();
    write_canonical(value, &mut out, 0)?;
    Some(out)
}

/// Canonical JSON for any serializable value
pub fn canonicalize<T: Serialize + ?Sized>(value: &T) -> Option<String> {
    let value = serde_json::to_value(value).ok()?;
    canonical_json(&value)
}

fn write_canonical(value: &Value, out: &mut String, depth: usize) -> Option<()> {
    if depth > MAX_CANONICAL_DEPTH {
        return None;
    }

    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            let _ = write!(out, "{}", n);
        }
        Value::String(s) => out.push_str(&serde_json::to_string(s).ok()?),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out, depth + 1)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            // Sort keys for order independence
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key).ok()?);
                out.push(':');
                write_canonical(&map[key.as_str()], out, depth + 1)?;
            }
            out.push('}');
        }
    }
    Some(())
}
