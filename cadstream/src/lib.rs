//! cadstream - camera-driven level-of-detail streaming for sectored CAD models
//!
//! A model is split into a hierarchy of sectors, each available at two
//! qualities: full-detail triangle meshes and cheap instanced quads. As the
//! camera moves, the closest visible sectors are loaded in detail, the rest
//! of the visible tree as simple geometry, and sectors that fall out of view
//! are discarded, cancelling their loads if still in progress.
//!
//! # Architecture
//!
//! ```text
//!  CameraState ─► culling::QualityClassifier ─► WantedSectors
//!                                                  │       │
//!                                          detailed│       │simple
//!                                                  ▼       ▼
//!                         loading::SectorLoadCoordinator (×2)
//!                                 │ fetch          │ decode
//!                                 ▼                ▼
//!                     source::SceneFetcher   decode::DecodePool
//!                                 │                │
//!                      Directory / HTTP     worker threads
//! ```
//!
//! [`streaming::SectorStreamer`] wires these together for one model.

pub mod config;
pub mod culling;
pub mod decode;
pub mod geometry;
pub mod loading;
pub mod logging;
pub mod sector;
pub mod source;
pub mod streaming;
pub mod synthetic;
pub mod telemetry;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
