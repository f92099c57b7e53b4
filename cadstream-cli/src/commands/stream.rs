//! `stream` command: orbit a camera around a model and stream its sectors.
//!
//! There is no renderer here; sinks only count what they hold. The camera
//! loop publishes a new camera every frame and the [`StreamingDaemon`]
//! throttles those into classifier updates.

use std::f32::consts::TAU;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cadstream::config::ConfigFile;
use cadstream::decode::BincodeDecoder;
use cadstream::geometry::{Aabb, CameraState};
use cadstream::loading::{LoadSectorRequest, SectorSink};
use cadstream::logging::init_logging;
use cadstream::sector::SectorId;
use cadstream::streaming::{SectorStreamer, Sinks, StreamError, StreamingConfig, StreamingDaemon};
use glam::Vec3;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::CliError;

const FRAME_INTERVAL: Duration = Duration::from_millis(50);
const FRAMES_PER_ORBIT: u64 = 400;
const FIELD_OF_VIEW_DEGREES: f32 = 60.0;
const ASPECT_RATIO: f32 = 16.0 / 9.0;

pub struct StreamArgs {
    pub source: String,
    pub budget: Option<usize>,
    pub workers: Option<usize>,
    /// Stop after this many camera frames; run until Ctrl+C when unset.
    pub frames: Option<u64>,
}

pub fn run(args: StreamArgs) -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    let _logging = init_logging(&config.logging)?;

    let mut streaming = config.streaming_config();
    if let Some(budget) = args.budget {
        streaming = streaming.with_detailed_budget(budget);
    }
    if let Some(workers) = args.workers {
        streaming = streaming.with_workers(workers);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(stream(args, streaming))
}

async fn stream(args: StreamArgs, streaming: StreamingConfig) -> Result<(), CliError> {
    let source = cadstream::source::open(&args.source).map_err(|e| CliError::Source {
        location: args.source.clone(),
        message: e.to_string(),
    })?;

    let detailed = Arc::new(ResidentCounter::default());
    let simple = Arc::new(ResidentCounter::default());
    let sinks = Sinks {
        detailed: detailed.clone(),
        simple: simple.clone(),
    };

    println!("cadstream v{}", cadstream::VERSION);
    println!("Source: {}", source.describe());

    let streamer = Arc::new(SectorStreamer::start(source, BincodeDecoder, sinks, &streaming).await?);
    let bounds = streamer
        .tree()
        .root()
        .map(|root| root.bounds)
        .ok_or(StreamError::EmptyScene)?;
    println!(
        "Sectors: {} | detailed budget: {} | decode workers: {}",
        streamer.tree().len(),
        streaming.detailed_budget(),
        streamer.pool().worker_count()
    );
    println!("Press Ctrl+C to stop");
    println!();

    let orbit = Orbit::around(&bounds);
    let (camera_tx, camera_rx) = watch::channel(orbit.camera_at(0));
    let shutdown = CancellationToken::new();

    let signal = shutdown.clone();
    ctrlc::set_handler(move || signal.cancel())
        .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let daemon = tokio::spawn(StreamingDaemon::new(streamer.clone(), &streaming).run(camera_rx, shutdown.clone()));

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} sectors | {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut ticker = tokio::time::interval(FRAME_INTERVAL);
    let mut frame = 0u64;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }
        if args.frames.is_some_and(|last| frame >= last) {
            break;
        }
        if camera_tx.send(orbit.camera_at(frame)).is_err() {
            break;
        }
        frame += 1;

        let state = streamer.loading_state();
        progress.set_length(state.items_requested as u64);
        progress.set_position(state.items_loaded as u64);
        progress.set_message(format!(
            "{} detailed, {} simple resident",
            detailed.resident(),
            simple.resident()
        ));
    }

    shutdown.cancel();
    let updates = daemon.await.unwrap_or_default();
    progress.finish_and_clear();
    info!(frames = frame, updates, "Camera loop finished");

    streamer.clear();
    streamer.wait_until_settled().await;

    println!("Session Summary");
    println!("───────────────");
    print!("{}", streamer.metrics().snapshot());
    Ok(())
}

/// Sink that only counts the sectors it currently holds.
#[derive(Default)]
struct ResidentCounter {
    resident: AtomicU64,
}

impl ResidentCounter {
    fn resident(&self) -> u64 {
        self.resident.load(Ordering::Relaxed)
    }
}

impl<P: Send> SectorSink<P> for ResidentCounter {
    fn consume(&self, _id: SectorId, _payload: P) {
        self.resident.fetch_add(1, Ordering::Relaxed);
    }

    fn discard(&self, _id: SectorId, request: Option<&LoadSectorRequest>) {
        // In-flight discards were never consumed.
        if request.is_none() {
            self.resident.fetch_sub(1, Ordering::Relaxed);
        }
    }
}

/// Circular camera path around a bounding box, slightly above it.
struct Orbit {
    center: Vec3,
    radius: f32,
    height: f32,
}

impl Orbit {
    fn around(bounds: &Aabb) -> Self {
        let size = bounds.size();
        Self {
            center: bounds.center(),
            radius: size.length().max(1.0),
            height: size.y * 0.5,
        }
    }

    fn camera_at(&self, frame: u64) -> CameraState {
        let angle = TAU * (frame % FRAMES_PER_ORBIT) as f32 / FRAMES_PER_ORBIT as f32;
        let eye = self.center + Vec3::new(self.radius * angle.cos(), self.height, self.radius * angle.sin());
        CameraState::look_at(
            eye,
            self.center,
            FIELD_OF_VIEW_DEGREES.to_radians(),
            ASPECT_RATIO,
            0.1,
            self.radius * 4.0,
        )
    }
}
