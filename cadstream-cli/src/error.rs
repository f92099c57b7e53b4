//! CLI error type.

use cadstream::config::ConfigError;
use cadstream::logging::LoggingError;
use cadstream::streaming::StreamError;
use cadstream::synthetic::GenerateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error("Failed to initialize logging: {0}")]
    Logging(#[from] LoggingError),

    #[error("Failed to open model source '{location}': {message}")]
    Source { location: String, message: String },

    #[error("Streaming failed: {0}")]
    Stream(#[from] StreamError),

    #[error("Failed to generate model: {0}")]
    Generate(#[from] GenerateError),

    #[error("Failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}
