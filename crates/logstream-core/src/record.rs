//! Stored records and stream identity.

use serde::{Deserialize, Serialize};

use crate::error::StreamError;

/// Store-assigned record identifier. Strictly increasing within a stream.
pub type RecordId = i64;

/// Name of a stream. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StreamName(String);

impl StreamName {
    /// Validate and wrap a stream name.
    pub fn new(name: impl Into<String>) -> Result<Self, StreamError> {
        let name = name.into();
        if name.is_empty() {
            return Err(StreamError::EmptyStreamName);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StreamName {
    type Error = StreamError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StreamName> for String {
    fn from(name: StreamName) -> Self {
        name.0
    }
}

impl std::fmt::Display for StreamName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single row of the append-only log.
///
/// `text == None` marks the close sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: RecordId,
    pub stream: StreamName,
    pub text: Option<Vec<u8>>,
}

impl LogRecord {
    /// A content record.
    pub fn line(id: RecordId, stream: StreamName, text: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            stream,
            text: Some(text.into()),
        }
    }

    /// A close sentinel.
    pub fn close(id: RecordId, stream: StreamName) -> Self {
        Self {
            id,
            stream,
            text: None,
        }
    }

    /// Returns `true` if this record is the end-of-stream sentinel.
    pub fn is_close(&self) -> bool {
        self.text.is_none()
    }
}
