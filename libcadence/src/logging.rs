//! Logging setup shared by the Cadence binaries
//!
//! All diagnostics go to stderr so stdout stays free for summaries and
//! rendered heatmaps. Format and level come from `CADENCE_LOG_FORMAT` and
//! `CADENCE_LOG_LEVEL`; `RUST_LOG` still wins when set.
//!
//! ```no_run
//! use libcadence::logging::{LogFormat, LoggingConfig};
//!
//! libcadence::logging::init_default();
//! // or explicitly
//! # let _ = || {
//! LoggingConfig::new(LogFormat::Json, "debug", false).init();
//! # };
//! ```

use std::str::FromStr;
use tracing_subscriber::EnvFilter;

use crate::error::CadenceError;

pub const FORMAT_ENV: &str = "CADENCE_LOG_FORMAT";
pub const LEVEL_ENV: &str = "CADENCE_LOG_LEVEL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Plain lines without colour
    #[default]
    Text,
    /// One JSON object per event
    Json,
    /// Multi-line, coloured
    Pretty,
}

impl FromStr for LogFormat {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(CadenceError::InvalidInput(format!(
                "Invalid log format: '{}'. Valid options: text, json, pretty",
                s
            ))),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
            LogFormat::Pretty => "pretty",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: String,
    /// Forces `debug` regardless of `level`
    pub verbose: bool,
}

impl LoggingConfig {
    pub fn new(format: LogFormat, level: impl Into<String>, verbose: bool) -> Self {
        Self {
            format,
            level: level.into(),
            verbose,
        }
    }

    /// Read format and level from the environment
    ///
    /// Unknown formats fall back to text, a missing level to `info`.
    pub fn from_env(verbose: bool) -> Self {
        let format = std::env::var(FORMAT_ENV)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();
        let level = std::env::var(LEVEL_ENV).unwrap_or_else(|_| "info".to_string());
        Self::new(format, level, verbose)
    }

    fn effective_level(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.level
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(self.effective_level()))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }

    /// Install the global subscriber
    ///
    /// A second call is a no-op, which keeps tests that share a process happy.
    pub fn init(&self) {
        let filter = self.filter();
        let result = match self.format {
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .flatten_event(true)
                .with_current_span(true)
                .with_target(true)
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true)
                .try_init(),
            LogFormat::Text => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(false)
                .try_init(),
        };
        if result.is_err() {
            tracing::debug!("Logging already initialised");
        }
    }
}

/// Initialise from `CADENCE_LOG_FORMAT` / `CADENCE_LOG_LEVEL`
pub fn init_default() {
    LoggingConfig::from_env(false).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!(" JSON ".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);

        let err = "xml".parse::<LogFormat>().unwrap_err();
        assert!(err.to_string().contains("Invalid log format: 'xml'"));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_log_format_display() {
        assert_eq!(LogFormat::Json.to_string(), "json");
        assert_eq!(LogFormat::default().to_string(), "text");
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var(FORMAT_ENV, "json");
        std::env::set_var(LEVEL_ENV, "warn");

        assert_eq!(
            LoggingConfig::from_env(false),
            LoggingConfig::new(LogFormat::Json, "warn", false)
        );
        assert_eq!(LoggingConfig::from_env(true).effective_level(), "debug");

        std::env::set_var(FORMAT_ENV, "bogus");
        assert_eq!(LoggingConfig::from_env(false).format, LogFormat::Text);

        std::env::remove_var(FORMAT_ENV);
        std::env::remove_var(LEVEL_ENV);
        assert_eq!(
            LoggingConfig::from_env(false),
            LoggingConfig::new(LogFormat::Text, "info", false)
        );
    }
}
