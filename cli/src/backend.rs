//! Picks an append-log backend from a database URL.

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use logstream_core::append_log::{AppendLog, MemoryLog};
use logstream_storage::postgres::{PostgresLog, PostgresOptions};
use logstream_storage::sqlite::SqliteLog;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Process-local; only useful with `pipe`.
    Memory,
    Sqlite(String),
    Postgres(String),
}

impl Backend {
    pub fn parse(url: &str) -> Result<Self> {
        if url == "memory" {
            Ok(Self::Memory)
        } else if url.starts_with("sqlite:") {
            Ok(Self::Sqlite(url.to_string()))
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Self::Postgres(url.to_string()))
        } else {
            bail!("unsupported database URL '{url}' (expected sqlite:..., postgres://... or memory)")
        }
    }

    pub async fn open(&self, table: &str) -> Result<Arc<dyn AppendLog>> {
        let log: Arc<dyn AppendLog> = match self {
            Self::Memory => Arc::new(MemoryLog::new()),
            Self::Sqlite(url) => Arc::new(
                SqliteLog::open_with_table(url, table)
                    .await
                    .with_context(|| format!("opening {url}"))?,
            ),
            Self::Postgres(url) => {
                let opts = PostgresOptions {
                    table: table.to_string(),
                    ..Default::default()
                };
                Arc::new(
                    PostgresLog::connect_with_options(url, opts)
                        .await
                        .context("connecting to postgres")?,
                )
            }
        };
        Ok(log)
    }
}
