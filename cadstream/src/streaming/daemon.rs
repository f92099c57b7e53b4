//! Camera-driven streaming loop.
//!
//! The [`StreamingDaemon`] watches a camera channel and forwards camera
//! states to a [`CameraListener`] (normally a
//! [`SectorStreamer`](super::SectorStreamer)), rate limited in two ways:
//!
//! - the camera must have been still for `camera_rest` before its state is
//!   applied, so a moving camera does not start loads it will cancel a
//!   moment later;
//! - two applied updates are at least `update_interval` apart.
//!
//! # Example
//!
//! ```ignore
//! let (camera_tx, camera_rx) = tokio::sync::watch::channel(initial_camera);
//! let shutdown = CancellationToken::new();
//! let daemon = StreamingDaemon::new(streamer.clone(), &config);
//! tokio::spawn(daemon.run(camera_rx, shutdown.clone()));
//!
//! camera_tx.send(next_camera)?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::geometry::CameraState;

use super::{CameraListener, StreamingConfig};

/// Long-running task applying camera updates to a listener.
pub struct StreamingDaemon<L: ?Sized> {
    listener: Arc<L>,
    update_interval: Duration,
    camera_rest: Duration,
}

impl<L: CameraListener + ?Sized> StreamingDaemon<L> {
    pub fn new(listener: Arc<L>, config: &StreamingConfig) -> Self {
        Self {
            listener,
            update_interval: config.update_interval,
            camera_rest: config.camera_rest,
        }
    }

    /// Runs until `shutdown` is cancelled or the camera channel closes.
    ///
    /// The channel's current value counts as a fresh camera change. A change
    /// still waiting for its rest period when the channel closes is applied
    /// before returning. Returns the number of applied updates.
    pub async fn run(self, mut camera_rx: watch::Receiver<CameraState>, shutdown: CancellationToken) -> u64 {
        info!(
            update_interval_ms = self.update_interval.as_millis() as u64,
            camera_rest_ms = self.camera_rest.as_millis() as u64,
            "Streaming daemon starting"
        );

        let mut pending = true;
        let mut last_change = Instant::now();
        let mut last_update: Option<Instant> = None;
        let mut applied = 0u64;

        loop {
            let deadline = self.next_update_at(last_change, last_update);

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Streaming daemon shutting down");
                    break;
                }

                changed = camera_rx.changed() => {
                    if changed.is_err() {
                        if pending {
                            self.apply(&mut camera_rx);
                            applied += 1;
                        }
                        info!("Camera channel closed");
                        break;
                    }
                    pending = true;
                    last_change = Instant::now();
                }

                _ = tokio::time::sleep_until(deadline), if pending => {
                    self.apply(&mut camera_rx);
                    applied += 1;
                    pending = false;
                    last_update = Some(Instant::now());
                }
            }
        }

        info!(updates = applied, "Streaming daemon stopped");
        applied
    }

    fn next_update_at(&self, last_change: Instant, last_update: Option<Instant>) -> Instant {
        let rested = last_change + self.camera_rest;
        match last_update {
            Some(last) => rested.max(last + self.update_interval),
            None => rested,
        }
    }

    fn apply(&self, camera_rx: &mut watch::Receiver<CameraState>) {
        let camera = *camera_rx.borrow_and_update();
        debug!(position = ?camera.position, "Applying camera update");
        self.listener.camera_changed(&camera);
    }
}
