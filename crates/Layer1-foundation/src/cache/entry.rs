//! Cached entry model
//!
//! An entry records whether the value came from a synchronous call or is
//! the resolved output of an asynchronous one. The distinction lives in
//! the enum tag, so no payload shape can be mistaken for a marker.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A value stored in a cache backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CachedValue {
    /// Return value of a synchronous operation
    Plain(Value),
    /// Resolved value of an asynchronous operation
    Resolved(Value),
}

impl CachedValue {
    pub fn plain(value: impl Into<Value>) -> Self {
        CachedValue::Plain(value.into())
    }

    pub fn resolved(value: impl Into<Value>) -> Self {
        CachedValue::Resolved(value.into())
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        matches!(self, CachedValue::Resolved(_))
    }

    pub fn value(&self) -> &Value {
        match self {
            CachedValue::Plain(v) | CachedValue::Resolved(v) => v,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            CachedValue::Plain(v) | CachedValue::Resolved(v) => v,
        }
    }
}
