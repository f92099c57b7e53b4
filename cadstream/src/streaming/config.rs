//! Streaming session configuration.

use std::time::Duration;

use crate::culling::{ClassifierConfig, DEFAULT_DETAILED_SECTOR_BUDGET};
use crate::decode::{DecodePoolConfig, DEFAULT_GEOMETRY_CACHE_MB};
use crate::loading::DEFAULT_MAX_CONCURRENT_FETCHES;
use crate::source::RetryPolicy;

/// Default minimum time between two applied camera updates (250ms).
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 250;

/// Default time the camera must be still before an update is applied (250ms).
pub const DEFAULT_CAMERA_REST_MS: u64 = 250;

/// Configuration for [`SectorStreamer`](super::SectorStreamer) and
/// [`StreamingDaemon`](super::StreamingDaemon).
#[derive(Clone, Debug)]
pub struct StreamingConfig {
    pub classifier: ClassifierConfig,
    pub decode: DecodePoolConfig,
    pub geometry_cache_mb: u64,
    pub retry: RetryPolicy,
    /// Sector fetches allowed at once, shared by both qualities.
    pub max_concurrent_fetches: usize,
    /// Minimum time between two applied camera updates.
    pub update_interval: Duration,
    /// How long the camera must be still before its state is applied.
    pub camera_rest: Duration,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            decode: DecodePoolConfig::default(),
            geometry_cache_mb: DEFAULT_GEOMETRY_CACHE_MB,
            retry: RetryPolicy::default(),
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            update_interval: Duration::from_millis(DEFAULT_UPDATE_INTERVAL_MS),
            camera_rest: Duration::from_millis(DEFAULT_CAMERA_REST_MS),
        }
    }
}

impl StreamingConfig {
    pub fn with_detailed_budget(mut self, budget: usize) -> Self {
        self.classifier = self.classifier.with_detailed_budget(budget);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.decode = self.decode.with_workers(workers);
        self
    }

    pub fn with_geometry_cache_mb(mut self, megabytes: u64) -> Self {
        self.geometry_cache_mb = megabytes;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = limit.max(1);
        self
    }

    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    pub fn with_camera_rest(mut self, rest: Duration) -> Self {
        self.camera_rest = rest;
        self
    }

    pub fn detailed_budget(&self) -> usize {
        self.classifier.detailed_budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StreamingConfig::default();
        assert_eq!(config.detailed_budget(), DEFAULT_DETAILED_SECTOR_BUDGET);
        assert_eq!(config.update_interval, Duration::from_millis(250));
        assert_eq!(config.camera_rest, Duration::from_millis(250));
        assert_eq!(config.retry.max_attempts(), 3);
        assert_eq!(config.max_concurrent_fetches, 50);
    }

    #[test]
    fn test_builders() {
        let config = StreamingConfig::default()
            .with_detailed_budget(5)
            .with_workers(2)
            .with_retry(RetryPolicy::None)
            .with_max_concurrent_fetches(0);
        assert_eq!(config.detailed_budget(), 5);
        assert_eq!(config.max_concurrent_fetches, 1);
        assert_eq!(config.decode.workers, 2);
        assert_eq!(config.retry, RetryPolicy::None);
    }
}
