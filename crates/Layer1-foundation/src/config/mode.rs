//! Cache mode - read/write policy for memoized calls
//!
//! | Mode           | Signal        | Consult cache | Store result |
//! |----------------|---------------|---------------|--------------|
//! | `Normal`       | `ON`          | yes           | yes          |
//! | `Disabled`     | `OFF`         | no            | no           |
//! | `ForceRefresh` | `UPDATE_ONLY` | no            | yes          |
//! | `ReadOnly`     | `READ_ONLY`   | yes           | no           |
//!
//! The mode is resolved once, when a target is wrapped. Changing the
//! environment afterwards has no effect on proxies that already exist.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Environment variable consulted by [`ModeSignal::from_env`]
pub const MODE_ENV_VAR: &str = "RECALL_CACHE_MODE";

/// Cache consistency policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Consult the cache, store on miss
    #[default]
    Normal,
    /// Never consult, never store
    Disabled,
    /// Never consult, always store
    ForceRefresh,
    /// Consult only; a miss yields no result without executing
    ReadOnly,
}

impl CacheMode {
    pub const ALL: [CacheMode; 4] = [
        CacheMode::Normal,
        CacheMode::Disabled,
        CacheMode::ForceRefresh,
        CacheMode::ReadOnly,
    ];

    /// Canonical signal name (`ON`, `OFF`, `UPDATE_ONLY`, `READ_ONLY`)
    pub fn signal_name(&self) -> &'static str {
        match self {
            CacheMode::Normal => "ON",
            CacheMode::Disabled => "OFF",
            CacheMode::ForceRefresh => "UPDATE_ONLY",
            CacheMode::ReadOnly => "READ_ONLY",
        }
    }

    /// Parse a signal value. Trimmed, case-insensitive; empty or unknown
    /// values yield `None`.
    pub fn from_signal(signal: &str) -> Option<Self> {
        let normalized = signal.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "ON" | "NORMAL" => Some(CacheMode::Normal),
            "OFF" | "DISABLED" => Some(CacheMode::Disabled),
            "UPDATE_ONLY" | "FORCE_REFRESH" => Some(CacheMode::ForceRefresh),
            "READ_ONLY" => Some(CacheMode::ReadOnly),
            _ => None,
        }
    }

    /// Whether existing entries are returned
    #[inline]
    pub fn reads(&self) -> bool {
        matches!(self, CacheMode::Normal | CacheMode::ReadOnly)
    }

    /// Whether fresh results are written back
    #[inline]
    pub fn writes(&self) -> bool {
        matches!(self, CacheMode::Normal | CacheMode::ForceRefresh)
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.signal_name())
    }
}

impl FromStr for CacheMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CacheMode::from_signal(s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown cache mode: {:?}", s)))
    }
}

/// Process-wide fallback signal, captured once
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeSignal(Option<String>);

impl ModeSignal {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Some(value.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }

    /// Read [`MODE_ENV_VAR`] from the process environment
    pub fn from_env() -> Self {
        Self::from_env_var(MODE_ENV_VAR)
    }

    pub fn from_env_var(name: &str) -> Self {
        Self(std::env::var(name).ok())
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// The mode this signal names, if it names one
    pub fn mode(&self) -> Option<CacheMode> {
        self.as_str().and_then(CacheMode::from_signal)
    }
}

/// Resolve the effective mode: explicit > signal > `Normal`
pub fn resolve_mode(explicit: Option<CacheMode>, signal: Option<&str>) -> CacheMode {
    if let Some(mode) = explicit {
        return mode;
    }
    signal
        .and_then(CacheMode::from_signal)
        .unwrap_or_default()
}
