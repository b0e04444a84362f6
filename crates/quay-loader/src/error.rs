use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving artifacts and resources.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Neither the module's own locations nor its parent produced the name.
    #[error("{name} not found in scope {scope}")]
    NotFound {
        /// Scope (module name) that requested the resolution.
        scope: String,
        /// The symbol or resource name that was requested.
        name: String,
    },

    /// A bundle location could not be read or indexed.
    #[error("Failed to read bundle {path}: {message}")]
    Bundle {
        /// Path to the bundle file.
        path: PathBuf,
        /// The underlying failure.
        message: String,
    },

    /// I/O error while reading a located artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for loader operations.
pub type LoaderResult<T> = Result<T, LoaderError>;
