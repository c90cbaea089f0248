//! Error types for shipfiles.
//!
//! Library crates use [`ShipfilesError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all shipfiles operations.
#[derive(Debug, thiserror::Error)]
pub enum ShipfilesError {
    /// The runtime directory or its anchor package could not be found.
    #[error("resolution error: {message}")]
    Resolution { message: String },

    /// A trace manifest is not valid JSON or lacks the trace list.
    #[error("malformed manifest {artifact}: {message}")]
    MalformedManifest { artifact: String, message: String },

    /// Copying a runtime file into the output root failed.
    #[error("failed to copy {file:?}: {source}")]
    Copy {
        file: PathBuf,
        source: std::io::Error,
    },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A build artifact was requested that the compilation does not hold.
    #[error("asset error: {0}")]
    Asset(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ShipfilesError>;

impl ShipfilesError {
    /// Create a resolution error from any displayable message.
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution {
            message: msg.into(),
        }
    }

    /// Create a malformed-manifest error for the named artifact.
    pub fn malformed(artifact: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::MalformedManifest {
            artifact: artifact.into(),
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a failed copy with the source file that could not be copied.
    pub fn copy(file: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Copy {
            file: file.into(),
            source,
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
