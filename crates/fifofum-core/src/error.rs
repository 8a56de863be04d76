//! Error types for the `fifofum` core library.

use thiserror::Error;

/// Result type alias using the fifofum Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for fifofum operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A configured pipe path does not exist at startup
    #[error("pipe {path} not found")]
    PipeNotFound {
        /// The path as given on the command line.
        path: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
