//! Tracing subscriber setup.
//!
//! Installs a console layer and, when a log directory is configured, a
//! non-blocking file layer. `RUST_LOG` overrides the configured level.
//!
//! # Example
//!
//! ```ignore
//! use cadstream::logging::{init_logging, LoggingConfig};
//!
//! let _guard = init_logging(&LoggingConfig::default().with_directory("/tmp/cadstream"))?;
//! tracing::info!("Logging ready");
//! ```

use std::path::PathBuf;

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Timestamp format for console and file output.
pub const LOG_TIMESTAMP_FORMAT: Rfc3339 = Rfc3339;

/// Default log file name inside the log directory.
pub const DEFAULT_LOG_FILE_NAME: &str = "cadstream.log";

/// Levels accepted in configuration.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for the log file; console only when `None`.
    pub directory: Option<PathBuf>,
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            directory: None,
            file_name: DEFAULT_LOG_FILE_NAME.to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Full path of the log file, if file logging is enabled.
    pub fn file_path(&self) -> Option<PathBuf> {
        self.directory.as_ref().map(|dir| dir.join(&self.file_name))
    }
}

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    #[error("Failed to create log directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("A global tracing subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Keeps the file writer flushing until dropped.
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Build the env filter: `RUST_LOG` when set, the configured level otherwise.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| LoggingError::InvalidFilter {
            filter: config.level.clone(),
            message: e.to_string(),
        }),
    }
}

fn timer() -> LocalTime<Rfc3339> {
    LocalTime::new(LOG_TIMESTAMP_FORMAT)
}

/// Install the global tracing subscriber.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let filter = env_filter(config)?;
    let console = fmt::layer().with_timer(timer()).with_target(false);

    let (file_layer, file_guard) = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory).map_err(|source| LoggingError::CreateDirectory {
                path: directory.clone(),
                source,
            })?;
            let appender = tracing_appender::rolling::never(directory, &config.file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_timer(timer())
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(LoggingGuard { _file: file_guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_are_rfc3339() {
        let stamp = time::OffsetDateTime::UNIX_EPOCH.format(&LOG_TIMESTAMP_FORMAT).unwrap();
        assert_eq!(stamp, "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_default_config_is_console_only() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.file_path(), None);
    }

    #[test]
    fn test_file_path_joins_directory() {
        let config = LoggingConfig::default().with_directory("/var/log/cadstream");
        assert_eq!(config.file_path(), Some(PathBuf::from("/var/log/cadstream/cadstream.log")));
    }

    #[test]
    fn test_configured_level_builds_filter() {
        if std::env::var_os("RUST_LOG").is_none() {
            let filter = env_filter(&LoggingConfig::default().with_level("cadstream=debug")).unwrap();
            assert!(filter.to_string().contains("cadstream=debug"));
        }
    }
}
