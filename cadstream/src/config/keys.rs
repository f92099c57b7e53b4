//! Addressable configuration keys (`section.key`).

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::logging::LOG_LEVELS;

use super::{ConfigError, ConfigFile};

/// Every setting of [`ConfigFile`], addressable by `section.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    StreamingDetailedBudget,
    StreamingUpdateIntervalMs,
    StreamingCameraRestMs,
    DecodeWorkers,
    DecodeGeometryCacheMb,
    FetchMaxAttempts,
    FetchRetryDelayMs,
    FetchMaxConcurrent,
    LoggingLevel,
    LoggingDirectory,
    LoggingFileName,
}

const ALL_KEYS: [ConfigKey; 11] = [
    ConfigKey::StreamingDetailedBudget,
    ConfigKey::StreamingUpdateIntervalMs,
    ConfigKey::StreamingCameraRestMs,
    ConfigKey::DecodeWorkers,
    ConfigKey::DecodeGeometryCacheMb,
    ConfigKey::FetchMaxAttempts,
    ConfigKey::FetchRetryDelayMs,
    ConfigKey::FetchMaxConcurrent,
    ConfigKey::LoggingLevel,
    ConfigKey::LoggingDirectory,
    ConfigKey::LoggingFileName,
];

impl ConfigKey {
    /// All keys, grouped by section.
    pub fn all() -> &'static [ConfigKey] {
        &ALL_KEYS
    }

    pub fn section(&self) -> &'static str {
        match self {
            Self::StreamingDetailedBudget | Self::StreamingUpdateIntervalMs | Self::StreamingCameraRestMs => {
                "streaming"
            }
            Self::DecodeWorkers | Self::DecodeGeometryCacheMb => "decode",
            Self::FetchMaxAttempts | Self::FetchRetryDelayMs | Self::FetchMaxConcurrent => "fetch",
            Self::LoggingLevel | Self::LoggingDirectory | Self::LoggingFileName => "logging",
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            Self::StreamingDetailedBudget => "detailed_budget",
            Self::StreamingUpdateIntervalMs => "update_interval_ms",
            Self::StreamingCameraRestMs => "camera_rest_ms",
            Self::DecodeWorkers => "workers",
            Self::DecodeGeometryCacheMb => "geometry_cache_mb",
            Self::FetchMaxAttempts => "max_attempts",
            Self::FetchRetryDelayMs => "retry_delay_ms",
            Self::FetchMaxConcurrent => "max_concurrent",
            Self::LoggingLevel => "level",
            Self::LoggingDirectory => "directory",
            Self::LoggingFileName => "file_name",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as a string; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            Self::StreamingDetailedBudget => config.streaming.detailed_budget.to_string(),
            Self::StreamingUpdateIntervalMs => config.streaming.update_interval_ms.to_string(),
            Self::StreamingCameraRestMs => config.streaming.camera_rest_ms.to_string(),
            Self::DecodeWorkers => config.decode.workers.to_string(),
            Self::DecodeGeometryCacheMb => config.decode.geometry_cache_mb.to_string(),
            Self::FetchMaxAttempts => config.fetch.max_attempts.to_string(),
            Self::FetchRetryDelayMs => config.fetch.retry_delay_ms.to_string(),
            Self::FetchMaxConcurrent => config.fetch.max_concurrent.to_string(),
            Self::LoggingLevel => config.logging.level.clone(),
            Self::LoggingDirectory => config
                .logging
                .directory
                .as_ref()
                .map(|dir| dir.display().to_string())
                .unwrap_or_default(),
            Self::LoggingFileName => config.logging.file_name.clone(),
        }
    }

    /// Validate `value` and store it.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match self {
            Self::StreamingDetailedBudget => config.streaming.detailed_budget = self.parse(value)?,
            Self::StreamingUpdateIntervalMs => config.streaming.update_interval_ms = self.parse(value)?,
            Self::StreamingCameraRestMs => config.streaming.camera_rest_ms = self.parse(value)?,
            Self::DecodeWorkers => config.decode.workers = self.parse(value)?,
            Self::DecodeGeometryCacheMb => {
                config.decode.geometry_cache_mb = self.parse_positive(value)?;
            }
            Self::FetchMaxAttempts => config.fetch.max_attempts = self.parse_positive(value)? as u32,
            Self::FetchRetryDelayMs => config.fetch.retry_delay_ms = self.parse(value)?,
            Self::FetchMaxConcurrent => config.fetch.max_concurrent = self.parse_positive(value)? as usize,
            Self::LoggingLevel => {
                let level = value.to_ascii_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    return Err(self.invalid(value, format!("expected one of {}", LOG_LEVELS.join(", "))));
                }
                config.logging.level = level;
            }
            Self::LoggingDirectory => {
                config.logging.directory = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            Self::LoggingFileName => {
                if value.is_empty() {
                    return Err(self.invalid(value, "file name must not be empty"));
                }
                config.logging.file_name = value.to_string();
            }
        }
        Ok(())
    }

    fn parse<T>(&self, value: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        value.parse().map_err(|e: T::Err| self.invalid(value, e.to_string()))
    }

    fn parse_positive(&self, value: &str) -> Result<u64, ConfigError> {
        match self.parse::<u64>(value)? {
            0 => Err(self.invalid(value, "must be at least 1")),
            n if *self == Self::FetchMaxAttempts && n > u32::MAX as u64 => {
                Err(self.invalid(value, "too large"))
            }
            n => Ok(n),
        }
    }

    fn invalid(&self, value: &str, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_KEYS
            .iter()
            .copied()
            .find(|key| key.name() == s)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_names() {
        assert_eq!("decode.workers".parse::<ConfigKey>().unwrap(), ConfigKey::DecodeWorkers);
        assert!(matches!("decode.threads".parse::<ConfigKey>(), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<String> = ConfigKey::all().iter().map(ConfigKey::name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ConfigKey::all().len());
    }

    #[test]
    fn test_set_and_get() {
        let mut config = ConfigFile::default();
        ConfigKey::StreamingDetailedBudget.set(&mut config, " 7 ").unwrap();
        ConfigKey::LoggingLevel.set(&mut config, "WARN").unwrap();
        assert_eq!(ConfigKey::StreamingDetailedBudget.get(&config), "7");
        assert_eq!(ConfigKey::LoggingLevel.get(&config), "warn");
    }

    #[test]
    fn test_empty_directory_unsets() {
        let mut config = ConfigFile::default();
        ConfigKey::LoggingDirectory.set(&mut config, "/tmp/logs").unwrap();
        assert_eq!(config.logging.directory, Some(PathBuf::from("/tmp/logs")));
        ConfigKey::LoggingDirectory.set(&mut config, "").unwrap();
        assert_eq!(ConfigKey::LoggingDirectory.get(&config), "");
    }

    #[test]
    fn test_rejects_invalid_values() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::DecodeGeometryCacheMb.set(&mut config, "0").is_err());
        assert!(ConfigKey::FetchMaxAttempts.set(&mut config, "-1").is_err());
        assert!(ConfigKey::FetchMaxConcurrent.set(&mut config, "0").is_err());
        assert!(ConfigKey::LoggingLevel.set(&mut config, "loud").is_err());
        assert_eq!(config, ConfigFile::default());
    }
}
