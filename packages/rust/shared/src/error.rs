//! Error types for Predict.
//!
//! Library crates use [`PredictError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Predict operations.
///
/// Only [`PredictError::InvalidIdentifier`] and [`PredictError::NotFound`] are
/// produced by the core; the remaining variants belong to the collaborators
/// (metadata fetch, annotation storage, configuration).
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    /// A CVE identifier did not match `CVE-YYYY-NNNN[NNN]`.
    #[error("invalid CVE identifier: {id:?}")]
    InvalidIdentifier { id: String },

    /// Upstream metadata is absent for a well-formed identifier.
    #[error("no vulnerability record found for {id}")]
    NotFound { id: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to the metadata source.
    #[error("network error: {0}")]
    Network(String),

    /// Response body or input parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PredictError>;

impl PredictError {
    /// Create an invalid-identifier error for the offending input.
    pub fn invalid_identifier(id: impl Into<String>) -> Self {
        Self::InvalidIdentifier { id: id.into() }
    }

    /// Create a not-found error for a (valid) identifier.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
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

    /// Whether this error means "nothing to show" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
