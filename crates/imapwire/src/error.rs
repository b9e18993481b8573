//! Error types for the IMAP library.

use thiserror::Error;

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations, including read timeouts and
    /// connections that close in the middle of a literal.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A response line could not be parsed.
    #[error("Protocol error at position {position}: {message}")]
    Parse {
        /// Byte position in the line where the error occurred.
        position: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// Server returned NO response.
    #[error("Server returned NO: {0}")]
    No(String),

    /// Server returned BAD response.
    #[error("Server returned BAD: {0}")]
    Bad(String),

    /// Server sent BYE (disconnecting).
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// A command argument was rejected before anything was sent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid state for the requested operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Protocol violation or unexpected data.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A response sink aborted processing.
    #[error("Response sink failed: {0}")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Builds a [`Error::Parse`] for the given line position.
    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Wraps an application error raised from a sink callback.
    pub fn sink(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Sink(err.into())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
