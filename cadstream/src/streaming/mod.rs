//! Streaming sessions.
//!
//! A [`SectorStreamer`] ties the pieces together for one model:
//!
//! ```text
//!  camera ─► StreamingDaemon ─► SectorStreamer::update
//!  (watch)   (rest + throttle)        │
//!                                     ▼
//!                             QualityClassifier
//!                               │           │
//!                        detailed set    simple set
//!                               ▼           ▼
//!                 SectorLoadCoordinator  SectorLoadCoordinator
//!                               │           │
//!                               └──► DecodePool ◄──┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cadstream::streaming::{SectorStreamer, Sinks, StreamingConfig, StreamingDaemon};
//!
//! let config = StreamingConfig::default();
//! let streamer = Arc::new(SectorStreamer::start(source, BincodeDecoder, sinks, &config).await?);
//! let daemon = StreamingDaemon::new(streamer.clone(), &config);
//! tokio::spawn(daemon.run(camera_rx, shutdown.clone()));
//! ```

mod config;
mod daemon;
mod error;
mod streamer;

pub use config::{StreamingConfig, DEFAULT_CAMERA_REST_MS, DEFAULT_UPDATE_INTERVAL_MS};
pub use daemon::StreamingDaemon;
pub use error::StreamError;
pub use streamer::{load_scene, CameraListener, SectorStreamer, Sinks};
