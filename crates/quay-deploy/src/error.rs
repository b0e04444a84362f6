use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while installing or watching deployment archives.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The archive is malformed, misnamed, or contains unsafe entries.
    #[error("Invalid archive {archive}: {message}")]
    InvalidArchive {
        /// Path to the offending archive.
        archive: PathBuf,
        /// Why it was rejected.
        message: String,
    },

    /// A filesystem operation on the applications root failed.
    #[error("Deployment failed at {path}: {message}")]
    Deployment {
        /// Path being created, written, or replaced.
        path: PathBuf,
        /// The underlying failure.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The drop-directory watcher could not be started.
    #[error("Watcher error: {0}")]
    Watch(String),
}

impl DeployError {
    pub(crate) fn invalid(archive: &std::path::Path, message: impl Into<String>) -> Self {
        Self::InvalidArchive {
            archive: archive.to_path_buf(),
            message: message.into(),
        }
    }

    pub(crate) fn deployment(path: &std::path::Path, message: impl Into<String>) -> Self {
        Self::Deployment {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// A specialized Result type for deploy operations.
pub type DeployResult<T> = Result<T, DeployError>;
