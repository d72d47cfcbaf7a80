//! logstream-core — duplex byte streams over an append-only log.
//!
//! A producer writes text into a named stream; every line becomes one record
//! in an [`AppendLog`]. Consumers tail the same stream by polling, and see
//! end-of-stream once the producer appends the close sentinel.
//!
//! # Architecture
//!
//! ```text
//! LogStore::stream(name) → Stream
//!                            ├── LineFramer    (write: split on '\n', strip NUL)
//!                            ├── Cursor        (read: last id, poll delay, state)
//!                            │     └── BackoffPolicy
//!                            ├── close()       (append-only sentinel, text = NULL)
//!                            └── AppendLog     (memory / SQLite / Postgres)
//! ```

pub mod append_log;
pub mod backoff;
pub mod config;
pub mod cursor;
pub mod error;
pub mod framer;
pub mod pipe;
pub mod record;
pub mod store;
pub mod stream;

pub use append_log::{AppendLog, MemoryLog};
pub use backoff::{BackoffConfig, BackoffPolicy};
pub use config::{StreamConfig, StreamConfigBuilder};
pub use cursor::{Cursor, CursorState, ReadOutcome};
pub use error::StreamError;
pub use framer::LineFramer;
pub use record::{LogRecord, RecordId, StreamName};
pub use store::LogStore;
pub use stream::Stream;
pub use tokio_util::sync::CancellationToken;
