//! Memoized proxy over a [`Target`]
//!
//! Member access mirrors the target: operations come back as memoized
//! callables, nested objects as proxies sharing the same backend, mode,
//! key transform and statistics, and plain values unchanged.

use recall_foundation::{CacheMode, Error, Result};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::memo::{Memo, MemoStats};
use crate::target::{Invocation, Member, Target};

/// A wrapped target
#[derive(Clone)]
pub struct Memoized {
    target: Arc<dyn Target>,
    memo: Memo,
}

/// A member read through a [`Memoized`] proxy
#[derive(Debug, Clone)]
pub enum MemoMember {
    Operation(MemoOperation),
    Object(Memoized),
    Value(Value),
}

impl MemoMember {
    pub fn into_operation(self) -> Option<MemoOperation> {
        match self {
            MemoMember::Operation(op) => Some(op),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<Memoized> {
        match self {
            MemoMember::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            MemoMember::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl Memoized {
    pub fn new(target: Arc<dyn Target>, memo: Memo) -> Self {
        Self { target, memo }
    }

    /// The unwrapped target
    pub fn target(&self) -> &Arc<dyn Target> {
        &self.target
    }

    pub fn memo(&self) -> &Memo {
        &self.memo
    }

    pub fn mode(&self) -> CacheMode {
        self.memo.mode()
    }

    pub fn stats(&self) -> MemoStats {
        self.memo.stats()
    }

    /// Read a member
    pub fn get(&self, name: &str) -> Option<MemoMember> {
        Some(match self.target.member(name)? {
            Member::Operation => MemoMember::Operation(MemoOperation {
                target: Arc::clone(&self.target),
                memo: self.memo.clone(),
                name: name.to_string(),
            }),
            Member::Object(nested) => MemoMember::Object(Memoized {
                target: nested,
                memo: self.memo.scoped(name),
            }),
            Member::Value(value) => MemoMember::Value(value),
        })
    }

    /// Follow a dot-separated path through nested objects
    pub fn path(&self, path: &str) -> Option<MemoMember> {
        let mut segments = path.split('.');
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            current = current.into_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Call operation `name` through the cache
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Invocation> {
        match self.target.member(name) {
            Some(Member::Operation) => {
                let target = &self.target;
                self.memo.call(name, args, |args| target.invoke(name, args))
            }
            Some(_) => Err(Error::NotCallable(name.to_string())),
            None => Err(Error::UnknownMember(name.to_string())),
        }
    }

    /// Call operation `name` and await the result whatever its shape
    pub async fn resolve(&self, name: &str, args: Vec<Value>) -> Result<Option<Value>> {
        self.call(name, args)?.resolve().await
    }

    /// Nested object `name`, wrapped
    pub fn object(&self, name: &str) -> Option<Memoized> {
        self.get(name)?.into_object()
    }

    /// Plain value `name`, uncached
    pub fn value(&self, name: &str) -> Option<Value> {
        self.get(name)?.into_value()
    }

    /// Assign a plain value on the target
    pub fn set(&self, name: &str, value: Value) -> Result<()> {
        self.target.assign(name, value)
    }

    pub fn member_names(&self) -> Vec<String> {
        self.target.member_names()
    }
}

impl fmt::Debug for Memoized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("members", &self.target.member_names())
            .field("memo", &self.memo)
            .finish()
    }
}

/// A memoized operation detached from its proxy
#[derive(Clone)]
pub struct MemoOperation {
    target: Arc<dyn Target>,
    memo: Memo,
    name: String,
}

impl MemoOperation {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier used for keys, including the nesting path
    pub fn operation_id(&self) -> String {
        self.memo.operation_id(&self.name)
    }

    pub fn call(&self, args: Vec<Value>) -> Result<Invocation> {
        let target = &self.target;
        let name = self.name.as_str();
        self.memo.call(name, args, |args| target.invoke(name, args))
    }

    pub async fn resolve(&self, args: Vec<Value>) -> Result<Option<Value>> {
        self.call(args)?.resolve().await
    }
}

impl fmt::Debug for MemoOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoOperation")
            .field("operation", &self.operation_id())
            .finish()
    }
}
