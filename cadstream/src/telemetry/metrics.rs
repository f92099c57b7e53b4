//! Atomic streaming counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::culling::Quality;

use super::TelemetrySnapshot;

/// Counters shared by every stage of a streaming session.
#[derive(Debug)]
pub struct StreamingMetrics {
    started_at: Instant,
    camera_updates: AtomicU64,
    requests_started: AtomicU64,
    consumed_detailed: AtomicU64,
    consumed_simple: AtomicU64,
    requests_discarded: AtomicU64,
    requests_cancelled: AtomicU64,
    requests_failed: AtomicU64,
    decode_jobs_dispatched: AtomicU64,
    decode_jobs_failed: AtomicU64,
    geometry_files_decoded: AtomicU64,
    geometry_files_failed: AtomicU64,
    geometry_cache_hits: AtomicU64,
}

impl Default for StreamingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            camera_updates: AtomicU64::new(0),
            requests_started: AtomicU64::new(0),
            consumed_detailed: AtomicU64::new(0),
            consumed_simple: AtomicU64::new(0),
            requests_discarded: AtomicU64::new(0),
            requests_cancelled: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            decode_jobs_dispatched: AtomicU64::new(0),
            decode_jobs_failed: AtomicU64::new(0),
            geometry_files_decoded: AtomicU64::new(0),
            geometry_files_failed: AtomicU64::new(0),
            geometry_cache_hits: AtomicU64::new(0),
        }
    }

    pub fn camera_updated(&self) {
        self.camera_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_started(&self) {
        self.requests_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_consumed(&self, quality: Quality) {
        match quality {
            Quality::Detailed => self.consumed_detailed.fetch_add(1, Ordering::Relaxed),
            Quality::Simple => self.consumed_simple.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// A tracked sector stopped being wanted.
    pub fn request_discarded(&self) {
        self.requests_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// An in-flight request was cancelled.
    pub fn request_cancelled(&self) {
        self.requests_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decode_job_dispatched(&self) {
        self.decode_jobs_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decode_job_failed(&self) {
        self.decode_jobs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn geometry_file_decoded(&self) {
        self.geometry_files_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn geometry_file_failed(&self) {
        self.geometry_files_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn geometry_cache_hit(&self) {
        self.geometry_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            uptime: self.started_at.elapsed(),
            camera_updates: self.camera_updates.load(Ordering::Relaxed),
            requests_started: self.requests_started.load(Ordering::Relaxed),
            consumed_detailed: self.consumed_detailed.load(Ordering::Relaxed),
            consumed_simple: self.consumed_simple.load(Ordering::Relaxed),
            requests_discarded: self.requests_discarded.load(Ordering::Relaxed),
            requests_cancelled: self.requests_cancelled.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            decode_jobs_dispatched: self.decode_jobs_dispatched.load(Ordering::Relaxed),
            decode_jobs_failed: self.decode_jobs_failed.load(Ordering::Relaxed),
            geometry_files_decoded: self.geometry_files_decoded.load(Ordering::Relaxed),
            geometry_files_failed: self.geometry_files_failed.load(Ordering::Relaxed),
            geometry_cache_hits: self.geometry_cache_hits.load(Ordering::Relaxed),
        }
    }
}
