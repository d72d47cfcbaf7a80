//! Error types for logstream.

use thiserror::Error;

/// Errors that can occur while reading from or writing to a stream.
///
/// End-of-stream is not an error; it is reported through
/// [`ReadOutcome::Eof`](crate::cursor::ReadOutcome::Eof).
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Stream name must not be empty")]
    EmptyStreamName,

    #[error("Invalid table name '{0}'")]
    InvalidTable(String),

    #[error("Read cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamError {
    /// Returns `true` if the error came from a cancelled read.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
