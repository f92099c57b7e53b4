//! Streaming telemetry for observability and user feedback.
//!
//! Lock-free atomic counters are bumped by the coordinators and the decode
//! stage; views take point-in-time snapshots.
//!
//! # Architecture
//!
//! ```text
//! Coordinators ──┐
//! Decode pool  ──┼──► StreamingMetrics ─────► TelemetrySnapshot ─────► Views
//! Geometry cache ┘    (atomic counters)      (point-in-time copy)     (CLI, logs)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cadstream::telemetry::StreamingMetrics;
//! use std::sync::Arc;
//!
//! let metrics = Arc::new(StreamingMetrics::new());
//! metrics.request_started();
//! metrics.request_consumed(Quality::Detailed);
//!
//! let snapshot = metrics.snapshot();
//! println!("{}", snapshot);
//! ```

mod metrics;
mod snapshot;

pub use metrics::StreamingMetrics;
pub use snapshot::TelemetrySnapshot;
