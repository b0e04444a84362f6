use thiserror::Error;

/// Errors that can occur while caching or dispatching results.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A file result pointed at something that does not exist, or outside
    /// its storage area.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A result of an unregistered kind, a missing required field, or a
    /// dispatch before initialization.
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    /// The template engine failed.
    #[error("Template {template} failed: {message}")]
    Template {
        /// Template identifier.
        template: String,
        /// Engine error message.
        message: String,
        /// Engine-specific trace text, shown only in diagnostics mode.
        trace: Option<String>,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;
