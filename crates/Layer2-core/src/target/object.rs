//! ObjectTarget - a target assembled from closures
//!
//! ```ignore
//! let calc = ObjectTarget::new()
//!     .with_operation("add", |args| Ok(json!(arg_i64(&args, 0)? + arg_i64(&args, 1)?)))
//!     .with_async_operation("fetch", |args| async move { fetch(args).await })
//!     .with_object("math", ObjectTarget::new().with_operation("neg", neg))
//!     .with_value("version", json!("1.0"));
//! ```

use futures::future::{BoxFuture, FutureExt};
use parking_lot::RwLock;
use recall_foundation::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::{Invocation, Member, Target};

type SyncOperation = Arc<dyn Fn(Vec<Value>) -> Result<Value> + Send + Sync>;
type AsyncOperation = Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

#[derive(Clone)]
enum Slot {
    Sync(SyncOperation),
    Async(AsyncOperation),
    Object(Arc<dyn Target>),
    Value(Value),
}

/// Dynamic target built member by member
#[derive(Default)]
pub struct ObjectTarget {
    slots: RwLock<HashMap<String, Slot>>,
}

impl ObjectTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a synchronous operation
    pub fn with_operation<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value> + Send + Sync + 'static,
    {
        self.insert(name, Slot::Sync(Arc::new(f)))
    }

    /// Add an asynchronous operation
    pub fn with_async_operation<F, Fut>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.insert(name, Slot::Async(Arc::new(move |args| f(args).boxed())))
    }

    /// Add a nested object
    pub fn with_object<T>(self, name: impl Into<String>, target: T) -> Self
    where
        T: Target + 'static,
    {
        self.insert(name, Slot::Object(Arc::new(target)))
    }

    /// Add an already shared nested object
    pub fn with_shared_object(self, name: impl Into<String>, target: Arc<dyn Target>) -> Self {
        self.insert(name, Slot::Object(target))
    }

    /// Add a plain value
    pub fn with_value(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, Slot::Value(value.into()))
    }

    fn insert(self, name: impl Into<String>, slot: Slot) -> Self {
        self.slots.write().insert(name.into(), slot);
        self
    }

    fn slot(&self, name: &str) -> Option<Slot> {
        self.slots.read().get(name).cloned()
    }
}

impl Target for ObjectTarget {
    fn member(&self, name: &str) -> Option<Member> {
        Some(match self.slot(name)? {
            Slot::Sync(_) | Slot::Async(_) => Member::Operation,
            Slot::Object(target) => Member::Object(target),
            Slot::Value(value) => Member::Value(value),
        })
    }

    fn invoke(&self, name: &str, args: Vec<Value>) -> Result<Invocation> {
        // Lock is released before the operation runs
        match self.slot(name) {
            Some(Slot::Sync(op)) => op(args).map(Invocation::Ready),
            Some(Slot::Async(op)) => Ok(Invocation::Pending(op(args))),
            Some(_) => Err(Error::NotCallable(name.to_string())),
            None => Err(Error::UnknownMember(name.to_string())),
        }
    }

    fn assign(&self, name: &str, value: Value) -> Result<()> {
        self.slots.write().insert(name.to_string(), Slot::Value(value));
        Ok(())
    }

    fn member_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slots.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for ObjectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectTarget")
            .field("members", &self.member_names())
            .finish()
    }
}

/// Read argument `index` as an `i64`
pub fn arg_i64(args: &[Value], index: usize) -> Result<i64> {
    args.get(index)
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::InvalidInput(format!("argument {} must be an integer", index)))
}

/// Read argument `index` as a string slice
pub fn arg_str(args: &[Value], index: usize) -> Result<&str> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidInput(format!("argument {} must be a string", index)))
}
