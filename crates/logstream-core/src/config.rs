//! Stream configuration and its fluent builder.
//!
//! # Example
//!
//! ```rust
//! use logstream_core::config::StreamConfigBuilder;
//!
//! let config = StreamConfigBuilder::new()
//!     .initial_delay_ms(250)
//!     .max_delay_ms(5_000)
//!     .build();
//! assert_eq!(config.backoff.multiplier, 2.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::backoff::{BackoffConfig, BackoffPolicy};

/// Configuration shared by every stream opened from a
/// [`LogStore`](crate::store::LogStore).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Reader poll backoff.
    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl StreamConfig {
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(self.backoff.clone())
    }
}

/// Fluent builder for `StreamConfig`.
#[derive(Default)]
pub struct StreamConfigBuilder {
    config: StreamConfig,
}

impl StreamConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: StreamConfig::default(),
        }
    }

    /// Delay after the first empty poll.
    pub fn initial_delay_ms(mut self, ms: u64) -> Self {
        self.config.backoff.initial_delay_ms = ms;
        self
    }

    /// Upper bound on the poll delay.
    pub fn max_delay_ms(mut self, ms: u64) -> Self {
        self.config.backoff.max_delay_ms = ms;
        self
    }

    /// Growth factor on consecutive empty polls.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.config.backoff.multiplier = multiplier;
        self
    }

    pub fn build(self) -> StreamConfig {
        self.config
    }
}
