//! Error and warning types for search operations.

use std::path::PathBuf;

use derive_builder::UninitializedFieldError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal errors. Each of these stops a search before any traversal starts.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Invalid or incomplete search criteria.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A root directory does not exist.
    #[error("Root directory not found: {path}")]
    RootNotFound { path: PathBuf },

    /// A root path exists but is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The content search worker pool could not be started.
    #[error("Failed to start worker pool: {message}")]
    ThreadPool { message: String },
}

impl SearchError {
    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::RootNotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Whether this error stems from the search configuration rather than
    /// the runtime environment.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. } | Self::RootNotFound { .. } | Self::NotADirectory { .. }
        )
    }
}

impl From<UninitializedFieldError> for SearchError {
    fn from(err: UninitializedFieldError) -> Self {
        match err.field_name() {
            "roots" => Self::invalid_config("at least one root directory is required"),
            field => Self::invalid_config(format!("`{field}` must be set")),
        }
    }
}

/// Kind of non-fatal warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Permission was denied.
    PermissionDenied,
    /// Error reading a directory.
    ReadError,
    /// Error reading metadata.
    MetadataError,
    /// A symbolic link leads back to one of its own ancestors.
    SymlinkLoop,
    /// A file could not be read during the content scan.
    ContentRead,
    /// The worker pool did not stop within its time limits.
    ShutdownTimeout,
}

/// Non-fatal warning encountered during a search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl SearchWarning {
    /// Create a new warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a warning for an I/O error hit while walking.
    pub fn read_error(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let path = path.into();
        let kind = match error.kind() {
            std::io::ErrorKind::PermissionDenied => WarningKind::PermissionDenied,
            _ => WarningKind::ReadError,
        };
        Self {
            message: format!("Read error: {error}"),
            path,
            kind,
        }
    }

    /// Create a symlink loop warning.
    pub fn symlink_loop(path: impl Into<PathBuf>, ancestor: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let ancestor = ancestor.into();
        Self {
            message: format!(
                "Symlink loop: {} points back to {}",
                path.display(),
                ancestor.display()
            ),
            path,
            kind: WarningKind::SymlinkLoop,
        }
    }

    /// Create a content read warning.
    pub fn content_read(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self {
            path: path.into(),
            message: format!("Content read error: {error}"),
            kind: WarningKind::ContentRead,
        }
    }

    /// Create the warning reported when workers could not be stopped.
    pub fn shutdown_timeout(still_running: usize) -> Self {
        Self {
            path: PathBuf::new(),
            message: format!(
                "Unable to shut down cleanly: {still_running} worker(s) still running"
            ),
            kind: WarningKind::ShutdownTimeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_error_io() {
        let err = SearchError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, SearchError::PermissionDenied { .. }));

        let err = SearchError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        );
        assert!(matches!(err, SearchError::Io { .. }));
        assert!(!err.is_config_error());
    }

    #[test]
    fn test_uninitialized_roots() {
        let err: SearchError = UninitializedFieldError::new("roots").into();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("root directory"));
    }

    #[test]
    fn test_warning_creation() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let warning = SearchWarning::read_error("/test/path", &denied);
        assert_eq!(warning.kind, WarningKind::PermissionDenied);

        let warning = SearchWarning::symlink_loop("/a/b/link", "/a");
        assert_eq!(warning.kind, WarningKind::SymlinkLoop);
        assert!(warning.message.contains("/a/b/link"));

        let warning = SearchWarning::shutdown_timeout(2);
        assert_eq!(warning.kind, WarningKind::ShutdownTimeout);
        assert!(warning.message.contains("2 worker(s)"));
    }
}
