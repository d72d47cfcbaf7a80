//! The append-only log collaborator.
//!
//! Streams never talk to a database directly; they go through [`AppendLog`].
//! Ordering and uniqueness of ids are the implementation's responsibility.

use async_trait::async_trait;

use crate::error::StreamError;
use crate::record::{LogRecord, RecordId, StreamName};

/// Ordered, append-only storage of stream records.
///
/// Implementations include [`MemoryLog`] and the SQLite / Postgres backends
/// in `logstream-storage`.
#[async_trait]
pub trait AppendLog: Send + Sync {
    /// Append a content record and return its id.
    async fn insert(&self, stream: &StreamName, text: &[u8]) -> Result<RecordId, StreamError>;

    /// Append a close sentinel (a record with no text) and return its id.
    async fn insert_close(&self, stream: &StreamName) -> Result<RecordId, StreamError>;

    /// All records of `stream` with `id > after`, ascending by id.
    async fn query(
        &self,
        stream: &StreamName,
        after: RecordId,
    ) -> Result<Vec<LogRecord>, StreamError>;
}

// ─── In-memory log ────────────────────────────────────────────────────────────

use std::sync::Mutex;

/// In-memory append log for tests and single-process piping.
///
/// Ids are global across streams, like an auto-increment column.
#[derive(Default)]
pub struct MemoryLog {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across all streams.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn append(&self, stream: &StreamName, text: Option<Vec<u8>>) -> RecordId {
        let mut records = self.lock();
        let id = records.last().map_or(1, |r| r.id + 1);
        records.push(LogRecord {
            id,
            stream: stream.clone(),
            text,
        });
        id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LogRecord>> {
        // A poisoned lock still holds a consistent Vec: every push is a single step.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl AppendLog for MemoryLog {
    async fn insert(&self, stream: &StreamName, text: &[u8]) -> Result<RecordId, StreamError> {
        Ok(self.append(stream, Some(text.to_vec())))
    }

    async fn insert_close(&self, stream: &StreamName) -> Result<RecordId, StreamError> {
        Ok(self.append(stream, None))
    }

    async fn query(
        &self,
        stream: &StreamName,
        after: RecordId,
    ) -> Result<Vec<LogRecord>, StreamError> {
        Ok(self
            .lock()
            .iter()
            .filter(|r| r.id > after && &r.stream == stream)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> StreamName {
        StreamName::new(s).unwrap()
    }

    #[tokio::test]
    async fn ids_increase_across_streams() {
        let log = MemoryLog::new();
        let a = log.insert(&name("a"), b"1").await.unwrap();
        let b = log.insert(&name("b"), b"2").await.unwrap();
        let c = log.insert_close(&name("a")).await.unwrap();
        assert!(a < b && b < c);
        assert_eq!(log.len(), 3);
    }

    #[tokio::test]
    async fn query_filters_by_stream_and_id() {
        let log = MemoryLog::new();
        let first = log.insert(&name("a"), b"one").await.unwrap();
        log.insert(&name("b"), b"other").await.unwrap();
        log.insert(&name("a"), b"two").await.unwrap();
        log.insert_close(&name("a")).await.unwrap();

        let rows = log.query(&name("a"), first).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text.as_deref(), Some(&b"two"[..]));
        assert!(rows[1].is_close());

        assert!(log.query(&name("missing"), 0).await.unwrap().is_empty());
    }
}
