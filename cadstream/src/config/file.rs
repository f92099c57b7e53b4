//! INI configuration file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::culling::DEFAULT_DETAILED_SECTOR_BUDGET;
use crate::decode::{AUTO_WORKER_COUNT, DEFAULT_GEOMETRY_CACHE_MB};
use crate::loading::DEFAULT_MAX_CONCURRENT_FETCHES;
use crate::logging::LoggingConfig;
use crate::source::{RetryPolicy, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_ATTEMPTS};
use crate::streaming::{StreamingConfig, DEFAULT_CAMERA_REST_MS, DEFAULT_UPDATE_INTERVAL_MS};

use super::ConfigKey;

/// Directory name under the home directory.
pub const CONFIG_DIR_NAME: &str = ".cadstream";

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Errors from loading, saving or editing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// `[streaming]` section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamingSettings {
    pub detailed_budget: usize,
    pub update_interval_ms: u64,
    pub camera_rest_ms: u64,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            detailed_budget: DEFAULT_DETAILED_SECTOR_BUDGET,
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            camera_rest_ms: DEFAULT_CAMERA_REST_MS,
        }
    }
}

/// `[decode]` section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeSettings {
    /// Worker threads; 0 uses every hardware thread.
    pub workers: usize,
    pub geometry_cache_mb: u64,
}

impl Default for DecodeSettings {
    fn default() -> Self {
        Self {
            workers: AUTO_WORKER_COUNT,
            geometry_cache_mb: DEFAULT_GEOMETRY_CACHE_MB,
        }
    }
}

/// `[fetch]` section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchSettings {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    /// Sector fetches allowed at once.
    pub max_concurrent: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            max_concurrent: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }
}

impl FetchSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        if self.max_attempts <= 1 {
            RetryPolicy::None
        } else {
            RetryPolicy::exponential(self.max_attempts).with_initial_delay(Duration::from_millis(self.retry_delay_ms))
        }
    }
}

/// Contents of `~/.cadstream/config.ini`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub streaming: StreamingSettings,
    pub decode: DecodeSettings,
    pub fetch: FetchSettings,
    /// `[logging]` section.
    pub logging: LoggingConfig,
}

/// `~/.cadstream`, or `./.cadstream` when there is no home directory.
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Default configuration file location.
pub fn config_file_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

impl ConfigFile {
    /// Load from the default location; a missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Read every known key present in `ini` over the defaults.
    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for key in ConfigKey::all() {
            if let Some(value) = ini.get_from(Some(key.section()), key.key_name()) {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    /// Render as INI; unset values are omitted.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section())).set(key.key_name(), value);
            }
        }
        ini
    }

    /// Save to the default location, creating the directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        self.to_ini().write_to_file(path).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Runtime configuration for a streaming session.
    pub fn streaming_config(&self) -> StreamingConfig {
        StreamingConfig::default()
            .with_detailed_budget(self.streaming.detailed_budget)
            .with_update_interval(Duration::from_millis(self.streaming.update_interval_ms))
            .with_camera_rest(Duration::from_millis(self.streaming.camera_rest_ms))
            .with_workers(self.decode.workers)
            .with_geometry_cache_mb(self.decode.geometry_cache_mb)
            .with_retry(self.fetch.retry_policy())
            .with_max_concurrent_fetches(self.fetch.max_concurrent)
    }
}
