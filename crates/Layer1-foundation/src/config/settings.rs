//! Recall settings - file-based defaults
//!
//! Settings are read from `recall.json` in the global config directory
//! and then in the project's `.recall/` directory; project values win.
//! Anything that fails to parse is treated as unset.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

use super::mode::CacheMode;
use crate::cache::{MemoryCache, SharedBackend};
use crate::storage::{FileCache, SqliteCache};
use crate::{Error, Result};

/// Settings file name
pub const RECALL_CONFIG_FILE: &str = "recall.json";

/// Database file name used by the SQLite backend
pub const SQLITE_FILE: &str = "recall.db";

/// Which backend to build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    File,
    Sqlite,
}

/// Recall settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallSettings {
    /// Mode signal (`ON`, `OFF`, `UPDATE_ONLY`, `READ_ONLY`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendKind>,

    /// Root directory for the file and SQLite backends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Keep argument lists next to persisted entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_args: Option<bool>,
}

impl RecallSettings {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// Global + project merged load, with the current directory as project root
    pub fn load() -> Self {
        let global = Self::global_path();
        let cwd = std::env::current_dir().ok();
        Self::load_layers(global.as_deref(), cwd.as_deref())
    }

    /// Global settings overlaid with the project settings under `root`
    pub fn load_for(root: &Path) -> Self {
        let global = Self::global_path();
        Self::load_layers(global.as_deref(), Some(root))
    }

    fn load_layers(global: Option<&Path>, project_root: Option<&Path>) -> Self {
        let mut settings = Self::new();

        if let Some(global) = global.and_then(Self::load_from) {
            settings.merge(global);
        }

        if let Some(root) = project_root {
            if let Some(project) = Self::load_from(&Self::project_path(root)) {
                settings.merge(project);
            }
        }

        settings
    }

    /// Load one file. Missing or malformed files yield `None`.
    pub fn load_from(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(settings) => Some(settings),
            Err(e) => {
                warn!("Ignoring malformed settings {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Save to a file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create directory: {}", e)))?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize: {}", e)))?;
        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write {}: {}", path.display(), e)))
    }

    /// `~/.config/recall/recall.json`
    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("recall").join(RECALL_CONFIG_FILE))
    }

    /// `<root>/.recall/recall.json`
    pub fn project_path(root: &Path) -> PathBuf {
        root.join(".recall").join(RECALL_CONFIG_FILE)
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// Merge another settings value (other wins)
    pub fn merge(&mut self, other: RecallSettings) {
        if other.mode.is_some() {
            self.mode = other.mode;
        }
        if other.backend.is_some() {
            self.backend = other.backend;
        }
        if other.root.is_some() {
            self.root = other.root;
        }
        if other.namespace.is_some() {
            self.namespace = other.namespace;
        }
        if other.record_args.is_some() {
            self.record_args = other.record_args;
        }
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Explicit mode named by the settings, if valid
    pub fn mode(&self) -> Option<CacheMode> {
        let raw = self.mode.as_deref()?;
        let mode = CacheMode::from_signal(raw);
        if mode.is_none() && !raw.trim().is_empty() {
            warn!("Ignoring unknown cache mode {:?} in settings", raw);
        }
        mode
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.unwrap_or_default()
    }

    fn root_dir(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => FileCache::in_cache_dir().map(|cache| cache.root().to_path_buf()),
        }
    }

    /// Construct the configured backend
    pub fn build_backend(&self) -> Result<SharedBackend> {
        let record_args = self.record_args.unwrap_or(false);
        let backend: SharedBackend = match self.backend_kind() {
            BackendKind::Memory => Arc::new(MemoryCache::new()),
            BackendKind::File => {
                let mut cache = FileCache::new(self.root_dir()?).record_args(record_args);
                if let Some(namespace) = &self.namespace {
                    cache = cache.with_namespace(namespace.clone());
                }
                Arc::new(cache)
            }
            BackendKind::Sqlite => {
                let mut cache =
                    SqliteCache::open(self.root_dir()?.join(SQLITE_FILE))?.record_args(record_args);
                if let Some(namespace) = &self.namespace {
                    cache = cache.with_namespace(namespace.clone());
                }
                Arc::new(cache)
            }
        };
        Ok(backend)
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn with_mode(mut self, mode: CacheMode) -> Self {
        self.mode = Some(mode.signal_name().to_string());
        self
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}
