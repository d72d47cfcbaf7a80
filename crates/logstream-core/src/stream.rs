//! `Stream` — the read/write/close surface over an [`AppendLog`].
//!
//! Writes are framed into lines and appended one record per line. Reads poll
//! the log through the stream's own [`Cursor`], honouring its backoff delay,
//! and report [`ReadOutcome::Eof`] once the close sentinel is reached.
//!
//! A `Stream` used for reading must not be shared: `read` takes `&mut self`.
//! Open a separate `Stream` for every independent reader.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::append_log::AppendLog;
use crate::backoff::BackoffPolicy;
use crate::cursor::{Cursor, ReadOutcome};
use crate::error::StreamError;
use crate::framer::LineFramer;
use crate::record::{LogRecord, RecordId, StreamName};

/// A named, line-oriented byte stream.
pub struct Stream {
    name: StreamName,
    log: Arc<dyn AppendLog>,
    framer: LineFramer,
    cursor: Cursor,
    cancel: CancellationToken,
}

impl Stream {
    /// Open `name` for reading from the beginning and for writing.
    pub fn new(name: StreamName, log: Arc<dyn AppendLog>, policy: BackoffPolicy) -> Self {
        Self::starting_after(name, log, policy, 0)
    }

    /// Like [`Stream::new`], but reads only records with `id > last_id`.
    pub fn starting_after(
        name: StreamName,
        log: Arc<dyn AppendLog>,
        policy: BackoffPolicy,
        last_id: RecordId,
    ) -> Self {
        Self {
            name,
            log,
            framer: LineFramer::new(),
            cursor: Cursor::starting_after(last_id, policy),
            cancel: CancellationToken::new(),
        }
    }

    /// Attach a token that aborts pending and future reads once cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn name(&self) -> &StreamName {
        &self.name
    }

    /// Read-only view of this reader's cursor.
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Length of the next record if the last read deferred it because the
    /// buffer was too small. Reading with a buffer at least this large makes
    /// progress.
    pub fn pending_len(&self) -> Option<usize> {
        self.cursor.pending_len()
    }

    /// Append `buf` as one record per line.
    ///
    /// Returns `buf.len()` on success. Lines are inserted in order, so on error
    /// every line before the failing one is already stored and none after it
    /// is; treat the stream as failed.
    pub async fn write(&self, buf: &[u8]) -> Result<usize, StreamError> {
        for line in self.framer.frame(buf) {
            let id = self.log.insert(&self.name, &line).await?;
            trace!(stream = %self.name, id, len = line.len(), "line appended");
        }
        Ok(buf.len())
    }

    /// Append `line` as a single record, without framing or sanitizing.
    pub async fn append_line(&self, line: &[u8]) -> Result<RecordId, StreamError> {
        let id = self.log.insert(&self.name, line).await?;
        trace!(stream = %self.name, id, len = line.len(), "record appended");
        Ok(id)
    }

    /// Append the close sentinel. Readers report end-of-stream once they
    /// reach it.
    ///
    /// Calling this twice appends a second sentinel, which readers never see.
    /// Do not retry a failed close blindly: the sentinel may have landed.
    pub async fn close(&self) -> Result<(), StreamError> {
        let id = self.log.insert_close(&self.name).await?;
        info!(stream = %self.name, id, "stream closed");
        Ok(())
    }

    /// Raw records of this stream with `id > after`, including any sentinel.
    pub async fn lines(&self, after: RecordId) -> Result<Vec<LogRecord>, StreamError> {
        self.log.query(&self.name, after).await
    }

    /// Wait out the backoff delay, poll the log and copy whole records into
    /// `buf`.
    ///
    /// `Data(0)` means nothing new was available (or the next record is larger
    /// than `buf`, see [`Stream::pending_len`]); call again.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome, StreamError> {
        if self.cursor.is_closed() {
            return Ok(ReadOutcome::Eof(0));
        }

        self.cursor.begin_poll();
        let records = match self.poll().await {
            Ok(records) => records,
            Err(e) => {
                self.cursor.abort_poll();
                return Err(e);
            }
        };

        let outcome = self.cursor.deliver(&records, buf);
        debug!(
            stream = %self.name,
            records = records.len(),
            bytes = outcome.bytes(),
            eof = outcome.is_eof(),
            last_id = self.cursor.last_id(),
            next_delay_ms = self.cursor.delay().as_millis() as u64,
            "poll complete"
        );
        Ok(outcome)
    }

    async fn poll(&self) -> Result<Vec<LogRecord>, StreamError> {
        if self.cancel.is_cancelled() {
            return Err(StreamError::Cancelled);
        }

        let delay = self.cursor.delay();
        if !delay.is_zero() {
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(StreamError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        if self.cancel.is_cancelled() {
            return Err(StreamError::Cancelled);
        }
        self.log.query(&self.name, self.cursor.last_id()).await
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("name", &self.name)
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::append_log::MemoryLog;
    use crate::backoff::BackoffConfig;
    use crate::cursor::CursorState;
    use async_trait::async_trait;
    use std::time::Duration;

    fn fast_policy() -> BackoffPolicy {
        BackoffPolicy::new(BackoffConfig {
            initial_delay_ms: 1,
            max_delay_ms: 4,
            multiplier: 2.0,
        })
    }

    fn open(log: &Arc<MemoryLog>, name: &str) -> Stream {
        let log: Arc<dyn AppendLog> = log.clone();
        Stream::new(StreamName::new(name).unwrap(), log, fast_policy())
    }

    async fn texts(stream: &Stream) -> Vec<String> {
        stream
            .lines(0)
            .await
            .unwrap()
            .into_iter()
            .filter_map(|r| r.text)
            .map(|t| String::from_utf8(t).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn write_single_line() {
        let log = Arc::new(MemoryLog::new());
        let stream = open(&log, "stream");
        assert_eq!(stream.write(b"hello world").await.unwrap(), 11);
        assert_eq!(texts(&stream).await, vec!["hello world"]);
    }

    #[tokio::test]
    async fn write_splits_lines() {
        let log = Arc::new(MemoryLog::new());
        let stream = open(&log, "stream");
        assert_eq!(stream.write(b"hello\nworld").await.unwrap(), 11);
        assert_eq!(texts(&stream).await, vec!["hello\n", "world"]);
    }

    #[tokio::test]
    async fn append_line_is_not_framed() {
        let log = Arc::new(MemoryLog::new());
        let stream = open(&log, "stream");
        stream.append_line(b"a\nb").await.unwrap();
        assert_eq!(texts(&stream).await, vec!["a\nb"]);
    }

    #[tokio::test]
    async fn read_returns_available_records() {
        let log = Arc::new(MemoryLog::new());
        let mut stream = open(&log, "stream");
        stream.append_line(b"hello\n").await.unwrap();
        stream.append_line(b"world").await.unwrap();

        let mut buf = vec![0u8; 32 * 1024];
        let out = stream.read(&mut buf).await.unwrap();
        assert_eq!(out, ReadOutcome::Data(11));
        assert_eq!(&buf[..11], b"hello\nworld");
    }

    #[tokio::test]
    async fn read_after_eof_does_not_query() {
        let log = Arc::new(MemoryLog::new());
        let mut stream = open(&log, "s");
        stream.close().await.unwrap();

        let mut buf = [0u8; 8];
        assert_eq!(stream.read(&mut buf).await.unwrap(), ReadOutcome::Eof(0));
        assert_eq!(stream.read(&mut buf).await.unwrap(), ReadOutcome::Eof(0));
        assert_eq!(stream.cursor().state(), CursorState::Closed);
    }

    #[tokio::test]
    async fn cancelled_read_leaves_cursor_untouched() {
        let log = Arc::new(MemoryLog::new());
        let token = CancellationToken::new();
        let mut stream = open(&log, "s").with_cancellation(token.clone());
        stream.append_line(b"x").await.unwrap();

        token.cancel();
        let mut buf = [0u8; 8];
        let err = stream.read(&mut buf).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(stream.cursor().last_id(), 0);
        assert_eq!(stream.cursor().state(), CursorState::Idle);
    }

    #[tokio::test]
    async fn cancel_interrupts_backoff_sleep() {
        let log: Arc<dyn AppendLog> = Arc::new(MemoryLog::new());
        let slow = BackoffPolicy::new(BackoffConfig {
            initial_delay_ms: 60_000,
            max_delay_ms: 60_000,
            multiplier: 2.0,
        });
        let token = CancellationToken::new();
        let mut stream = Stream::new(StreamName::new("idle").unwrap(), log, slow)
            .with_cancellation(token.clone());

        let mut buf = [0u8; 8];
        // Empty poll: the next read would sleep for a minute.
        assert_eq!(stream.read(&mut buf).await.unwrap(), ReadOutcome::Data(0));
        assert_eq!(stream.cursor().delay(), Duration::from_secs(60));

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });
        let res = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .expect("cancellation did not interrupt the sleep");
        assert!(res.unwrap_err().is_cancelled());
        canceller.await.unwrap();
    }

    struct FailingLog;

    #[async_trait]
    impl AppendLog for FailingLog {
        async fn insert(&self, _: &StreamName, _: &[u8]) -> Result<RecordId, StreamError> {
            Err(StreamError::Storage("connection refused".into()))
        }

        async fn insert_close(&self, _: &StreamName) -> Result<RecordId, StreamError> {
            Err(StreamError::Storage("connection refused".into()))
        }

        async fn query(&self, _: &StreamName, _: RecordId) -> Result<Vec<LogRecord>, StreamError> {
            Err(StreamError::Decode("bad row".into()))
        }
    }

    #[tokio::test]
    async fn storage_errors_propagate() {
        let log: Arc<dyn AppendLog> = Arc::new(FailingLog);
        let mut stream = Stream::new(StreamName::new("s").unwrap(), log, fast_policy());

        assert!(matches!(stream.write(b"a\nb\n").await, Err(StreamError::Storage(_))));
        assert!(matches!(stream.close().await, Err(StreamError::Storage(_))));

        let mut buf = [0u8; 8];
        assert!(matches!(stream.read(&mut buf).await, Err(StreamError::Decode(_))));
        assert_eq!(stream.cursor().state(), CursorState::Idle);
    }

    /// Accepts `budget` inserts, then fails every call.
    struct FlakyLog {
        inner: MemoryLog,
        budget: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl AppendLog for FlakyLog {
        async fn insert(&self, stream: &StreamName, text: &[u8]) -> Result<RecordId, StreamError> {
            use std::sync::atomic::Ordering;
            if self
                .budget
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_err()
            {
                return Err(StreamError::Storage("connection reset".into()));
            }
            self.inner.insert(stream, text).await
        }

        async fn insert_close(&self, stream: &StreamName) -> Result<RecordId, StreamError> {
            self.inner.insert_close(stream).await
        }

        async fn query(&self, stream: &StreamName, after: RecordId) -> Result<Vec<LogRecord>, StreamError> {
            self.inner.query(stream, after).await
        }
    }

    #[tokio::test]
    async fn failed_write_keeps_leading_lines_only() {
        let log = Arc::new(FlakyLog {
            inner: MemoryLog::new(),
            budget: std::sync::atomic::AtomicUsize::new(2),
        });
        let stream = Stream::new(StreamName::new("s").unwrap(), log.clone(), fast_policy());

        let err = stream.write(b"one\ntwo\nthree\nfour\n").await.unwrap_err();
        assert!(matches!(err, StreamError::Storage(_)));
        assert_eq!(texts(&stream).await, vec!["one\n", "two\n"]);
    }
}
