//! Point-in-time telemetry.

use std::fmt;
use std::time::Duration;

/// Copy of [`StreamingMetrics`](super::StreamingMetrics) counters with
/// derived rates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub uptime: Duration,
    pub camera_updates: u64,
    pub requests_started: u64,
    pub consumed_detailed: u64,
    pub consumed_simple: u64,
    pub requests_discarded: u64,
    pub requests_cancelled: u64,
    pub requests_failed: u64,
    pub decode_jobs_dispatched: u64,
    pub decode_jobs_failed: u64,
    pub geometry_files_decoded: u64,
    pub geometry_files_failed: u64,
    pub geometry_cache_hits: u64,
}

impl TelemetrySnapshot {
    /// Sectors handed to the sink at either quality.
    pub fn sectors_consumed(&self) -> u64 {
        self.consumed_detailed + self.consumed_simple
    }

    /// Consumed sectors per second since the session started.
    pub fn sectors_per_second(&self) -> f64 {
        let secs = self.uptime.as_secs_f64();
        if secs > 0.0 {
            self.sectors_consumed() as f64 / secs
        } else {
            0.0
        }
    }

    /// Share of settled requests that failed.
    pub fn failure_rate(&self) -> f64 {
        let settled = self.sectors_consumed() + self.requests_failed;
        if settled == 0 {
            0.0
        } else {
            self.requests_failed as f64 / settled as f64
        }
    }

    /// Share of geometry file lookups served from the cache.
    pub fn cache_hit_rate(&self) -> f64 {
        let lookups = self.geometry_cache_hits + self.geometry_files_decoded + self.geometry_files_failed;
        if lookups == 0 {
            0.0
        } else {
            self.geometry_cache_hits as f64 / lookups as f64
        }
    }
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session: {:.1}s, {} camera updates", self.uptime.as_secs_f64(), self.camera_updates)?;
        writeln!(
            f,
            "Sectors: {} requested, {} detailed, {} simple, {} discarded ({} cancelled), {} failed",
            self.requests_started,
            self.consumed_detailed,
            self.consumed_simple,
            self.requests_discarded,
            self.requests_cancelled,
            self.requests_failed
        )?;
        write!(
            f,
            "Decode: {} jobs ({} failed), {} geometry files, {:.0}% cache hits",
            self.decode_jobs_dispatched,
            self.decode_jobs_failed,
            self.geometry_files_decoded,
            self.cache_hit_rate() * 100.0
        )
    }
}
