//! Poll backoff for readers.
//!
//! The first poll is immediate. Each empty poll grows the delay (zero →
//! `initial_delay` → ×`multiplier` …, capped at `max_delay`); any poll that
//! returns data resets it to zero.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the poll backoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Delay after the first empty poll, in milliseconds.
    pub initial_delay_ms: u64,
    /// Cap on the delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Growth factor applied on each consecutive empty poll.
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 10_000,
            multiplier: 2.0,
        }
    }
}

/// Stateless backoff policy — computes the next delay from the current one.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub config: BackoffConfig,
}

impl BackoffPolicy {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.config.initial_delay_ms).min(self.max_delay())
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.config.max_delay_ms)
    }

    /// Delay to use after a poll, given the delay before it.
    pub fn next_delay(&self, current: Duration, found_data: bool) -> Duration {
        if found_data {
            return Duration::ZERO;
        }
        if current.is_zero() {
            return self.initial_delay();
        }
        // multiplier < 1.0 would shrink the delay on an empty poll
        let factor = self.config.multiplier.max(1.0);
        let grown_ms = current.as_millis() as f64 * factor;
        let cap_ms = self.config.max_delay_ms as f64;
        Duration::from_millis(grown_ms.min(cap_ms) as u64)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}
