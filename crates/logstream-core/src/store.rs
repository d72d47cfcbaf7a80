//! `LogStore` — the handle streams are opened from.

use std::sync::Arc;

use crate::append_log::AppendLog;
use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::record::{RecordId, StreamName};
use crate::stream::Stream;

/// A shared append log plus the configuration applied to every stream.
///
/// Cheap to clone; every clone uses the same log.
#[derive(Clone)]
pub struct LogStore {
    log: Arc<dyn AppendLog>,
    config: StreamConfig,
}

impl LogStore {
    pub fn new(log: Arc<dyn AppendLog>) -> Self {
        Self::with_config(log, StreamConfig::default())
    }

    pub fn with_config(log: Arc<dyn AppendLog>, config: StreamConfig) -> Self {
        Self { log, config }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Open the stream `name`, reading from its first record.
    ///
    /// Fails with [`StreamError::EmptyStreamName`] if `name` is empty.
    pub fn stream(&self, name: impl Into<String>) -> Result<Stream, StreamError> {
        self.stream_from(name, 0)
    }

    /// Open the stream `name`, reading only records with `id > last_id`.
    pub fn stream_from(
        &self,
        name: impl Into<String>,
        last_id: RecordId,
    ) -> Result<Stream, StreamError> {
        let name = StreamName::new(name)?;
        Ok(Stream::starting_after(
            name,
            Arc::clone(&self.log),
            self.config.backoff_policy(),
            last_id,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::append_log::MemoryLog;
    use crate::cursor::ReadOutcome;

    #[test]
    fn empty_name_is_rejected() {
        let store = LogStore::new(Arc::new(MemoryLog::new()));
        assert!(matches!(store.stream(""), Err(StreamError::EmptyStreamName)));
    }

    #[tokio::test]
    async fn streams_share_the_log() {
        let store = LogStore::new(Arc::new(MemoryLog::new()));
        let writer = store.stream("job").unwrap();
        writer.write(b"one\ntwo\n").await.unwrap();

        let mut reader = store.stream("job").unwrap();
        let mut buf = [0u8; 64];
        assert_eq!(reader.read(&mut buf).await.unwrap(), ReadOutcome::Data(8));
    }

    #[tokio::test]
    async fn stream_from_skips_seen_records() {
        let store = LogStore::new(Arc::new(MemoryLog::new()));
        let writer = store.stream("job").unwrap();
        let first = writer.append_line(b"one\n").await.unwrap();
        writer.append_line(b"two\n").await.unwrap();

        let mut reader = store.stream_from("job", first).unwrap();
        let mut buf = [0u8; 64];
        let out = reader.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..out.bytes()], b"two\n");
    }
}
