//! Structured logging setup.
//!
//! Logs are emitted through `tracing`; this module installs the subscriber:
//! an `EnvFilter` built from the configured level (or `RUST_LOG`) and a JSON
//! or pretty `fmt` layer, optionally written through a non-blocking
//! `tracing-appender` worker.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `ROUTEWARD_LOG_LEVEL` | `info` | trace/debug/info/warn/error |
//! | `ROUTEWARD_LOG_FORMAT` | `json` | `json` or `pretty` |
//! | `ROUTEWARD_LOG_TARGET_FILTER` | unset | extra comma-separated directives |
//! | `ROUTEWARD_LOG_ASYNC` | `true` | buffer output on a worker thread |
//! | `ROUTEWARD_LOG_INCLUDE_LOCATION` | `false` | add file and line |

use crate::config::LoggingSettings;
use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub log_level: String,
    pub format: LogFormat,
    pub async_logging: bool,
    /// Comma-separated `EnvFilter` directives added on top of the level.
    pub target_filter: Option<String>,
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            async_logging: true,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Apply overrides from `lookup`, keyed by environment variable name.
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("ROUTEWARD_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(format) = lookup("ROUTEWARD_LOG_FORMAT") {
            self.format = LogFormat::parse(&format);
        }
        if let Some(filter) = lookup("ROUTEWARD_LOG_TARGET_FILTER") {
            self.target_filter = Some(filter);
        }
        if let Some(flag) = lookup("ROUTEWARD_LOG_ASYNC").and_then(|s| s.parse().ok()) {
            self.async_logging = flag;
        }
        if let Some(flag) = lookup("ROUTEWARD_LOG_INCLUDE_LOCATION").and_then(|s| s.parse().ok()) {
            self.include_location = flag;
        }
        self
    }

    /// Start from the `logging` section of the config file.
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        Self {
            log_level: settings.level.clone(),
            format: LogFormat::parse(&settings.format),
            ..Self::default()
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));
        if let Some(targets) = &self.target_filter {
            for directive in targets.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                match directive.parse() {
                    Ok(parsed) => filter = filter.add_directive(parsed),
                    Err(_) => eprintln!("Warning: invalid log filter directive: {directive}"),
                }
            }
        }
        filter
    }
}

/// Keeps the non-blocking writer alive. Drop it last to flush buffered
/// log lines.
#[must_use = "dropping the guard stops the async log writer"]
pub struct LoggingGuard {
    _worker: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<LoggingGuard> {
    let (writer, worker) = if config.async_logging {
        let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(writer), Some(guard))
    } else {
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout), None)
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(LoggingGuard { _worker: worker })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("invalid"), LogFormat::Json);
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let env: HashMap<&str, &str> = [
            ("ROUTEWARD_LOG_LEVEL", "debug"),
            ("ROUTEWARD_LOG_FORMAT", "pretty"),
            ("ROUTEWARD_LOG_ASYNC", "false"),
            ("ROUTEWARD_LOG_INCLUDE_LOCATION", "not-a-bool"),
        ]
        .into_iter()
        .collect();
        let config = LogConfig::default().with_overrides(|k| env.get(k).map(|v| (*v).to_string()));

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(!config.async_logging);
        assert!(!config.include_location);
    }

    #[test]
    fn test_level_parsing_falls_back_to_info() {
        let config = LogConfig {
            log_level: "chatty".into(),
            ..LogConfig::default()
        };
        assert_eq!(config.level(), Level::INFO);
    }

    #[test]
    fn test_from_settings() {
        let settings = LoggingSettings {
            level: "warn".into(),
            format: "pretty".into(),
            user_agent: false,
        };
        let config = LogConfig::from_settings(&settings);
        assert_eq!(config.level(), Level::WARN);
        assert_eq!(config.format, LogFormat::Pretty);
    }
}
