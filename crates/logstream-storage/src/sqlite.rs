//! SQLite append log.
//!
//! Stores every stream in a single table of a SQLite file.
//! Uses `sqlx` with WAL mode so readers can poll while a producer writes.
//!
//! # Usage
//! ```rust,no_run
//! use logstream_storage::sqlite::SqliteLog;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // File-backed (persistent)
//! let log = SqliteLog::open("./logs.db").await?;
//!
//! // In-memory (tests / ephemeral)
//! let log = SqliteLog::in_memory().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::debug;

use logstream_core::append_log::AppendLog;
use logstream_core::error::StreamError;
use logstream_core::record::{LogRecord, RecordId, StreamName};

use crate::{validate_table, DEFAULT_TABLE};

/// SQLite-backed append log.
pub struct SqliteLog {
    pool: SqlitePool,
    table: String,
}

impl SqliteLog {
    /// Open (or create) a SQLite database at `path`, using the default table.
    ///
    /// The path may be a plain file path (`"./logs.db"`) or a full
    /// SQLite URL (`"sqlite:./logs.db?mode=rwc"`).
    pub async fn open(path: &str) -> Result<Self, StreamError> {
        Self::open_with_table(path, DEFAULT_TABLE).await
    }

    /// Open (or create) a SQLite database at `path`, storing records in `table`.
    pub async fn open_with_table(path: &str, table: &str) -> Result<Self, StreamError> {
        let table = validate_table(table)?;
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let pool = SqlitePool::connect(&url)
            .await
            .map_err(|e| StreamError::Storage(e.to_string()))?;

        let log = Self { pool, table };
        log.init_schema().await?;
        Ok(log)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Pinned to one connection that never expires, since every SQLite
    /// connection to `:memory:` is a separate database.
    pub async fn in_memory() -> Result<Self, StreamError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StreamError::Storage(e.to_string()))?;

        let log = Self {
            pool,
            table: DEFAULT_TABLE.to_string(),
        };
        log.init_schema().await?;
        Ok(log)
    }

    /// Create the table and index and enable WAL mode.
    async fn init_schema(&self) -> Result<(), StreamError> {
        sqlx::query("PRAGMA journal_mode=WAL;")
            .execute(&self.pool)
            .await
            .map_err(|e| StreamError::Storage(e.to_string()))?;

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id     INTEGER PRIMARY KEY AUTOINCREMENT,
                stream TEXT    NOT NULL,
                text   BLOB
            );",
            table = self.table
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| StreamError::Storage(e.to_string()))?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_stream_id ON {table} (stream, id);",
            table = self.table
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| StreamError::Storage(e.to_string()))?;

        debug!(table = %self.table, "sqlite schema initialized");
        Ok(())
    }

    /// Total number of records across all streams, sentinels included.
    pub async fn record_count(&self) -> Result<u64, StreamError> {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS cnt FROM {}", self.table))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StreamError::Storage(e.to_string()))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| StreamError::Decode(e.to_string()))?;
        Ok(cnt as u64)
    }

    /// Names of all streams with at least one record, sorted.
    pub async fn stream_names(&self) -> Result<Vec<String>, StreamError> {
        let rows = sqlx::query(&format!(
            "SELECT DISTINCT stream FROM {} ORDER BY stream",
            self.table
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StreamError::Storage(e.to_string()))?;

        rows.iter()
            .map(|r| r.try_get::<String, _>("stream").map_err(|e| StreamError::Decode(e.to_string())))
            .collect()
    }

    async fn append(&self, stream: &StreamName, text: Option<&[u8]>) -> Result<RecordId, StreamError> {
        let result = sqlx::query(&format!(
            "INSERT INTO {} (stream, text) VALUES (?, ?)",
            self.table
        ))
        .bind(stream.as_str())
        .bind(text)
        .execute(&self.pool)
        .await
        .map_err(|e| StreamError::Storage(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }
}

fn decode_row(row: &SqliteRow, stream: &StreamName) -> Result<LogRecord, StreamError> {
    let id: i64 = row
        .try_get("id")
        .map_err(|e| StreamError::Decode(e.to_string()))?;
    let text: Option<Vec<u8>> = row
        .try_get("text")
        .map_err(|e| StreamError::Decode(e.to_string()))?;
    Ok(LogRecord {
        id,
        stream: stream.clone(),
        text,
    })
}

// ─── AppendLog impl ──────────────────────────────────────────────────────────

#[async_trait]
impl AppendLog for SqliteLog {
    async fn insert(&self, stream: &StreamName, text: &[u8]) -> Result<RecordId, StreamError> {
        self.append(stream, Some(text)).await
    }

    async fn insert_close(&self, stream: &StreamName) -> Result<RecordId, StreamError> {
        let id = self.append(stream, None).await?;
        debug!(stream = %stream, id, "close sentinel stored");
        Ok(id)
    }

    async fn query(
        &self,
        stream: &StreamName,
        after: RecordId,
    ) -> Result<Vec<LogRecord>, StreamError> {
        let rows = sqlx::query(&format!(
            "SELECT id, text FROM {} WHERE stream = ? AND id > ? ORDER BY id",
            self.table
        ))
        .bind(stream.as_str())
        .bind(after)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StreamError::Storage(e.to_string()))?;

        rows.iter().map(|row| decode_row(row, stream)).collect()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
