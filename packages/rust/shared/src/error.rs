//! Error types for kbport.
//!
//! Library crates use [`KbportError`] via `thiserror`. Expected outcomes
//! (an archive that simply contains no knowledge base) are not errors —
//! they surface as values, see `NormalizeOutcome` in [`crate::types`].

use std::path::PathBuf;

/// Top-level error type for all kbport operations.
#[derive(Debug, thiserror::Error)]
pub enum KbportError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A write would resolve outside the dataset root. Always fatal,
    /// never retried.
    #[error("path escape: {source_path:?} -> {target_path:?} resolves outside the dataset root")]
    PathEscape {
        source_path: PathBuf,
        target_path: PathBuf,
    },

    /// A required source path does not exist.
    #[error("source does not exist: {path:?}")]
    SourceNotExists { path: PathBuf },

    /// Archive extraction failed (missing or malformed archive).
    /// No partial extraction is assumed usable.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad behavior name, malformed input, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, KbportError>;

impl KbportError {
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

    /// Create an extraction error from any displayable message.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    /// Create a path-escape error naming both offending paths.
    pub fn path_escape(source_path: impl Into<PathBuf>, target_path: impl Into<PathBuf>) -> Self {
        Self::PathEscape {
            source_path: source_path.into(),
            target_path: target_path.into(),
        }
    }

    /// Create a missing-source error naming the path.
    pub fn source_not_exists(path: impl Into<PathBuf>) -> Self {
        Self::SourceNotExists { path: path.into() }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = KbportError::config("missing merge section");
        assert_eq!(err.to_string(), "config error: missing merge section");

        let err = KbportError::source_not_exists("/tmp/missing.zip");
        assert!(err.to_string().contains("/tmp/missing.zip"));
    }

    #[test]
    fn path_escape_names_both_paths() {
        let err = KbportError::path_escape("docs/a.md", "/dataset/../outside.md");
        let msg = err.to_string();
        assert!(msg.contains("docs/a.md"));
        assert!(msg.contains("outside.md"));
    }
}
