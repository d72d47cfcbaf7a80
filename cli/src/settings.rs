//! CLI settings: optional JSON file plus flag overrides.
//!
//! ```json
//! {
//!   "log":    { "level": "info", "json": false },
//!   "stream": { "backoff": { "initial_delay_ms": 500, "max_delay_ms": 5000 } }
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use logstream_core::config::StreamConfig;

use crate::tracing_setup::LogConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub stream: StreamConfig,
}

impl Settings {
    /// Load settings from `path`, or defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Apply command-line overrides on top of the file.
    pub fn apply_overrides(
        &mut self,
        log_level: Option<String>,
        log_json: bool,
        poll_initial_ms: Option<u64>,
        poll_max_ms: Option<u64>,
    ) {
        if let Some(level) = log_level {
            self.log.level = level;
        }
        if log_json {
            self.log.json = true;
        }
        if let Some(ms) = poll_initial_ms {
            self.stream.backoff.initial_delay_ms = ms;
        }
        if let Some(ms) = poll_max_ms {
            self.stream.backoff.max_delay_ms = ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_file() {
        let settings =
            Settings::parse(r#"{ "stream": { "backoff": { "initial_delay_ms": 250 } } }"#).unwrap();
        assert_eq!(settings.stream.backoff.initial_delay_ms, 250);
        assert_eq!(settings.stream.backoff.max_delay_ms, 10_000);
        assert_eq!(settings.log, LogConfig::default());
    }

    #[test]
    fn flags_override_file() {
        let mut settings = Settings::parse(r#"{ "log": { "level": "info" } }"#).unwrap();
        settings.apply_overrides(Some("debug".into()), true, Some(5), None);
        assert_eq!(settings.log.level, "debug");
        assert!(settings.log.json);
        assert_eq!(settings.stream.backoff.initial_delay_ms, 5);
        assert_eq!(settings.stream.backoff.max_delay_ms, 10_000);
    }

    #[test]
    fn missing_file_path_means_defaults() {
        assert_eq!(Settings::load(None).unwrap(), Settings::default());
    }
}
