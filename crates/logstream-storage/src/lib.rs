//! logstream-storage — pluggable append-log backends for logstream.
//!
//! Backends:
//! - [`MemoryLog`] — in-memory (dev/testing, no persistence), re-exported from core
//! - [`sqlite`] — SQLite via `sqlx` (embedded, single-file persistence)
//! - [`postgres`] — PostgreSQL via `sqlx`
//!
//! Every SQL backend stores all streams in one table (default [`DEFAULT_TABLE`]):
//!
//! | column   | meaning                                   |
//! |----------|-------------------------------------------|
//! | `id`     | auto-assigned, strictly increasing        |
//! | `stream` | stream name                               |
//! | `text`   | line bytes; `NULL` marks the close sentinel |

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use logstream_core::append_log::MemoryLog;

use logstream_core::error::StreamError;

/// Table used when none is configured.
pub const DEFAULT_TABLE: &str = "logs";

/// Check that `table` is a plain SQL identifier.
///
/// Table names are interpolated into SQL text, so anything beyond
/// `[A-Za-z_][A-Za-z0-9_]*` is rejected.
pub fn validate_table(table: &str) -> Result<String, StreamError> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(table.to_string())
    } else {
        Err(StreamError::InvalidTable(table.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_identifiers() {
        assert_eq!(validate_table("logs").unwrap(), "logs");
        assert_eq!(validate_table("_job_output2").unwrap(), "_job_output2");
    }

    #[test]
    fn rejects_anything_else() {
        for bad in ["", "2logs", "logs; DROP TABLE x", "public.logs", "log-lines"] {
            assert!(matches!(validate_table(bad), Err(StreamError::InvalidTable(_))), "{bad}");
        }
    }
}
