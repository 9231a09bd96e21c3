//! Invocation - the result of calling an operation
//!
//! An operation answers either synchronously (`Ready`) or with a future
//! (`Pending`). The memo layer preserves that shape: a cached asynchronous
//! result is handed back as a fresh, already-resolved future.

use futures::future::{self, BoxFuture, FutureExt};
use recall_foundation::Result;
use serde_json::Value;
use std::fmt;
use std::future::Future;

/// Outcome of a (possibly memoized) operation call
pub enum Invocation {
    /// Synchronous return value
    Ready(Value),
    /// Asynchronous result, to be awaited
    Pending(BoxFuture<'static, Result<Value>>),
    /// No result: a read-only cache miss
    Empty,
}

impl Invocation {
    pub fn ready(value: impl Into<Value>) -> Self {
        Invocation::Ready(value.into())
    }

    pub fn pending<F>(fut: F) -> Self
    where
        F: Future<Output = Result<Value>> + Send + 'static,
    {
        Invocation::Pending(fut.boxed())
    }

    /// Already-resolved asynchronous value
    pub fn resolved(value: Value) -> Self {
        Invocation::Pending(future::ready(Ok(value)).boxed())
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self, Invocation::Ready(_))
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self, Invocation::Pending(_))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Invocation::Empty)
    }

    /// The synchronous value, if this is one
    pub fn into_ready(self) -> Option<Value> {
        match self {
            Invocation::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Await whatever shape this is. `Empty` resolves to `None`.
    pub async fn resolve(self) -> Result<Option<Value>> {
        match self {
            Invocation::Ready(value) => Ok(Some(value)),
            Invocation::Pending(fut) => fut.await.map(Some),
            Invocation::Empty => Ok(None),
        }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocation::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Invocation::Pending(_) => f.write_str("Pending(..)"),
            Invocation::Empty => f.write_str("Empty"),
        }
    }
}

impl From<Value> for Invocation {
    fn from(value: Value) -> Self {
        Invocation::Ready(value)
    }
}
