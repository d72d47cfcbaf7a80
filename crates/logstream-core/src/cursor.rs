//! Reader cursor — tracks a reader's position in a stream.
//!
//! The cursor knows:
//! - Which record was last copied out to the caller
//! - How long to wait before the next poll
//! - Whether the close sentinel has been reached
//!
//! It owns no I/O. [`Stream::read`](crate::stream::Stream::read) drives it
//! through `begin_poll` → query → `deliver`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backoff::BackoffPolicy;
use crate::record::{LogRecord, RecordId};

/// Where a reader is in its poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CursorState {
    /// Between reads.
    Idle,
    /// Waiting out the backoff delay or the query.
    Polling,
    /// Copying records into the caller's buffer.
    Delivering,
    /// The close sentinel was reached. Terminal.
    Closed,
}

impl std::fmt::Display for CursorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Polling => write!(f, "polling"),
            Self::Delivering => write!(f, "delivering"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Result of a single read.
///
/// `Data(0)` means "nothing new yet", not end-of-stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Bytes copied; the stream is still open.
    Data(usize),
    /// Bytes copied before the close sentinel; no more data will follow.
    Eof(usize),
}

impl ReadOutcome {
    /// Number of bytes copied into the buffer.
    pub fn bytes(&self) -> usize {
        match self {
            Self::Data(n) | Self::Eof(n) => *n,
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Eof(_))
    }
}

/// Per-reader position and poll delay. Never shared between readers.
#[derive(Debug, Clone)]
pub struct Cursor {
    last_id: RecordId,
    delay: Duration,
    state: CursorState,
    /// Length of the record that last failed to fit the caller's buffer.
    pending_len: Option<usize>,
    policy: BackoffPolicy,
}

impl Cursor {
    /// A cursor positioned before the first record.
    pub fn new(policy: BackoffPolicy) -> Self {
        Self::starting_after(0, policy)
    }

    /// A cursor that skips every record with `id <= last_id`.
    pub fn starting_after(last_id: RecordId, policy: BackoffPolicy) -> Self {
        Self {
            last_id,
            delay: Duration::ZERO,
            state: CursorState::Idle,
            pending_len: None,
            policy,
        }
    }

    /// Highest record id fully copied to the caller.
    pub fn last_id(&self) -> RecordId {
        self.last_id
    }

    /// Delay to wait before the next query.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == CursorState::Closed
    }

    /// Size of the next record if it was deferred for not fitting the buffer.
    pub fn pending_len(&self) -> Option<usize> {
        self.pending_len
    }

    /// Enter the polling phase.
    pub fn begin_poll(&mut self) {
        if !self.is_closed() {
            self.state = CursorState::Polling;
        }
    }

    /// Leave the polling phase without consuming anything (query failed or
    /// the read was cancelled).
    pub fn abort_poll(&mut self) {
        if self.state == CursorState::Polling {
            self.state = CursorState::Idle;
        }
    }

    /// Copy whole records from `records` into `buf`, advance the position and
    /// update the backoff delay.
    ///
    /// Stops at the close sentinel or at the first record that does not fit
    /// in the remaining space; that record is retried on the next poll.
    /// A poll that copies nothing backs off like an empty one, even when a
    /// record was deferred.
    pub fn deliver(&mut self, records: &[LogRecord], buf: &mut [u8]) -> ReadOutcome {
        if self.is_closed() {
            return ReadOutcome::Eof(0);
        }
        self.state = CursorState::Delivering;
        self.pending_len = None;

        let mut copied = 0;
        let mut found_data = false;
        let mut closed = false;

        for record in records {
            // last_id never moves backwards
            if record.id <= self.last_id {
                continue;
            }
            let Some(text) = record.text.as_deref() else {
                closed = true;
                break;
            };

            if text.len() > buf.len() - copied {
                self.pending_len = Some(text.len());
                break;
            }

            buf[copied..copied + text.len()].copy_from_slice(text);
            copied += text.len();
            self.last_id = record.id;
            found_data = true;
        }

        if closed {
            self.state = CursorState::Closed;
            return ReadOutcome::Eof(copied);
        }

        self.delay = self.policy.next_delay(self.delay, found_data);
        self.state = CursorState::Idle;
        ReadOutcome::Data(copied)
    }
}
