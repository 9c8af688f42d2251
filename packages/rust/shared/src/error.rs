//! Error types for annorelay.
//!
//! Library crates use [`AnnoRelayError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all annorelay operations.
#[derive(Debug, thiserror::Error)]
pub enum AnnoRelayError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The backing Zotero database is missing or cannot be opened.
    #[error("store unavailable at {path:?}: {reason}")]
    StoreUnavailable { path: PathBuf, reason: String },

    /// The item key does not name an attachment in the store.
    #[error("item key '{key}' not found (no attachment with that key)")]
    NotFound { key: String },

    /// A query failed against an already opened store.
    #[error("storage error: {0}")]
    Storage(String),

    /// A query failed while serving the request for `key`.
    #[error("storage error for item key '{key}': {message}")]
    Query { key: String, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid input (malformed key, bad config value, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, AnnoRelayError>;

/// Coarse error category reported across the crate boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    StoreUnavailable,
    NotFound,
    Storage,
    Io,
    Validation,
}

impl ErrorKind {
    /// Stable snake_case label for logs and user-facing messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::StoreUnavailable => "store_unavailable",
            Self::NotFound => "not_found",
            Self::Storage => "storage",
            Self::Io => "io",
            Self::Validation => "validation",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AnnoRelayError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The store at `path` could not be opened.
    pub fn store_unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// `key` does not resolve to an attachment.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Attach the requested item key to a bare query failure.
    pub fn for_key(self, key: &str) -> Self {
        match self {
            Self::Storage(message) => Self::Query {
                key: key.to_string(),
                message,
            },
            other => other,
        }
    }

    /// The coarse category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } => ErrorKind::Config,
            Self::StoreUnavailable { .. } => ErrorKind::StoreUnavailable,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Storage(_) | Self::Query { .. } => ErrorKind::Storage,
            Self::Io { .. } => ErrorKind::Io,
            Self::Validation { .. } => ErrorKind::Validation,
        }
    }
}
