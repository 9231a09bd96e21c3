//! Config - mode resolution and file-based settings
//!
//! - `mode.rs` - CacheMode, env signal, resolution rule
//! - `settings.rs` - RecallSettings (recall.json)

mod mode;
mod settings;

pub use mode::{resolve_mode, CacheMode, ModeSignal, MODE_ENV_VAR};
pub use settings::{BackendKind, RecallSettings, RECALL_CONFIG_FILE, SQLITE_FILE};
