//! Error types for Recall
//!
//! Every fallible operation in the workspace reports through [`Error`].
//! Failures of the wrapped operation itself travel as [`Error::Operation`]
//! and display exactly like the original error.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Recall error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Storage / backends
    // ========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Backend error: {backend} - {message}")]
    Backend { backend: String, message: String },

    // ========================================================================
    // Target access
    // ========================================================================
    #[error("Unknown member: {0}")]
    UnknownMember(String),

    #[error("Member is not callable: {0}")]
    NotCallable(String),

    #[error("Member cannot be assigned: {0}")]
    ReadOnlyMember(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // Wrapped operation
    // ========================================================================
    /// Failure raised by the memoized operation, passed through untouched.
    #[error(transparent)]
    Operation(#[from] anyhow::Error),

    // ========================================================================
    // External conversions
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    // ========================================================================
    // Other
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the error originates in the caching layer rather than in
    /// the wrapped operation
    pub fn is_caching_error(&self) -> bool {
        matches!(
            self,
            Error::Storage(_)
                | Error::Backend { .. }
                | Error::Io(_)
                | Error::Json(_)
                | Error::Sqlite(_)
        )
    }

    /// Backend error helper
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Wrap any error raised by a memoized operation
    pub fn operation<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Operation(anyhow::Error::new(err))
    }

    /// Operation failure from a plain message
    pub fn operation_msg(message: impl std::fmt::Display) -> Self {
        Error::Operation(anyhow::anyhow!("{}", message))
    }
}

// ============================================================================
// Additional From impls
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
