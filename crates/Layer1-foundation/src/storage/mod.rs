//! Persistent cache backends
//!
//! - `file`: one JSON file per key, namespaced directories
//! - `sqlite`: single-table SQLite store, namespaced rows

mod file;
mod sqlite;

pub use file::{FileCache, FileEntry, DEFAULT_NAMESPACE};
pub use sqlite::SqliteCache;
