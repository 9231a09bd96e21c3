//! Target - the object being memoized
//!
//! A target exposes named members. Each member is one of:
//!
//! - an **operation**, dispatched through [`Target::invoke`]
//! - a nested **object**, itself a target (wrapped recursively)
//! - a plain **value**, returned as-is
//!
//! Implement [`Target`] by hand for an existing type, or build one with
//! [`ObjectTarget`].

mod invocation;
mod object;

pub use invocation::Invocation;
pub use object::{arg_i64, arg_str, ObjectTarget};

use recall_foundation::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// What a member name resolves to
#[derive(Clone)]
pub enum Member {
    /// Callable; dispatch with [`Target::invoke`]
    Operation,
    /// Nested composite
    Object(Arc<dyn Target>),
    /// Plain data (including arrays and JSON objects)
    Value(Value),
}

impl Member {
    pub fn is_operation(&self) -> bool {
        matches!(self, Member::Operation)
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Operation => f.write_str("Operation"),
            Member::Object(_) => f.write_str("Object(..)"),
            Member::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

/// An object whose operations can be memoized
pub trait Target: Send + Sync {
    /// Resolve a member by name
    fn member(&self, name: &str) -> Option<Member>;

    /// Call the operation `name` on this target
    fn invoke(&self, name: &str, args: Vec<Value>) -> Result<Invocation>;

    /// Assign a plain value. Targets are read-only unless they override this.
    fn assign(&self, name: &str, value: Value) -> Result<()> {
        let _ = value;
        Err(Error::ReadOnlyMember(name.to_string()))
    }

    /// Member names, for diagnostics
    fn member_names(&self) -> Vec<String> {
        Vec::new()
    }
}
