//! The streaming session: classifier plus one coordinator per quality.

use std::sync::Arc;

use glam::Mat4;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::culling::{Quality, QualityClassifier, WantedSectors};
use crate::decode::{
    DecodePool, DetailedSectorDecoder, GeometryCache, NativeDecoder, SectorGeometry, SectorQuads,
    SimpleSectorDecoder,
};
use crate::geometry::CameraState;
use crate::loading::{LoadingState, SectorFetcher, SectorLoadCoordinator, SectorSink};
use crate::sector::{SceneMetadata, SectorTree, SCENE_FILE_NAME, SCENE_FORMAT_VERSION};
use crate::source::{ModelSource, RetryingFetcher, SceneFetcher};
use crate::telemetry::StreamingMetrics;

use super::{StreamError, StreamingConfig};

/// Receives camera states from the [`StreamingDaemon`](super::StreamingDaemon).
pub trait CameraListener: Send + Sync {
    fn camera_changed(&self, camera: &CameraState);
}

/// Fetch and parse `scene.json` from a source.
pub async fn load_scene(source: &dyn ModelSource) -> Result<SceneMetadata, StreamError> {
    let bytes = source.fetch_file(SCENE_FILE_NAME).await?;
    let scene = SceneMetadata::from_json(&bytes)?;
    if scene.version != SCENE_FORMAT_VERSION {
        return Err(StreamError::UnsupportedVersion {
            found: scene.version,
            expected: SCENE_FORMAT_VERSION,
        });
    }
    Ok(scene)
}

/// Sink pair receiving the two payload kinds.
pub struct Sinks {
    pub detailed: Arc<dyn SectorSink<SectorGeometry>>,
    pub simple: Arc<dyn SectorSink<SectorQuads>>,
}

/// A running streaming session for one model.
///
/// Created by [`SectorStreamer::start`], which loads the scene metadata and
/// primes the decode pool with the root sector's context. After that each
/// [`update`](Self::update) classifies the tree for a camera and hands the
/// wanted sets to the detailed and simple coordinators.
pub struct SectorStreamer<D: NativeDecoder> {
    tree: Arc<SectorTree>,
    model_matrix: Mat4,
    classifier: QualityClassifier,
    detailed: SectorLoadCoordinator<SectorGeometry>,
    simple: SectorLoadCoordinator<SectorQuads>,
    pool: Arc<DecodePool<D>>,
    cache: Arc<GeometryCache>,
    metrics: Arc<StreamingMetrics>,
}

impl<D: NativeDecoder> SectorStreamer<D> {
    /// Bootstrap a session: load the scene, start the decode pool, decode the
    /// root sector's context and prime the pool with it.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn start<S>(source: S, decoder: D, sinks: Sinks, config: &StreamingConfig) -> Result<Self, StreamError>
    where
        S: ModelSource + 'static,
    {
        let description = source.describe();
        let source: Arc<dyn ModelSource> = Arc::new(RetryingFetcher::new(source, config.retry.clone()));

        let scene = load_scene(source.as_ref()).await?;
        let tree = Arc::new(SectorTree::from_metadata(&scene)?);
        let root_id = tree.root().map(|root| root.id).ok_or(StreamError::EmptyScene)?;
        info!(source = %description, sectors = tree.len(), "Scene loaded");

        let metrics = Arc::new(StreamingMetrics::new());
        let pool = Arc::new(
            DecodePool::new(decoder, config.decode.clone())
                .map_err(StreamError::WorkerSpawn)?
                .with_metrics(metrics.clone()),
        );

        let detailed_fetcher = Arc::new(SceneFetcher::new(source.clone(), tree.clone(), Quality::Detailed));
        let simple_fetcher = Arc::new(SceneFetcher::new(source.clone(), tree.clone(), Quality::Simple));

        let root_bytes = detailed_fetcher.fetch_sector(root_id).await?;
        let context = pool.decode_root(root_bytes).await.map_err(|e| e.for_sector(root_id))?;
        pool.prime(context).await?;

        let cache = Arc::new(GeometryCache::with_megabytes(config.geometry_cache_mb));
        let detailed_decoder = DetailedSectorDecoder::new(pool.clone(), detailed_fetcher.clone())
            .with_cache(cache.clone())
            .with_metrics(metrics.clone());
        let simple_decoder = SimpleSectorDecoder::new(pool.clone());

        let fetch_slots = Arc::new(Semaphore::new(config.max_concurrent_fetches.max(1)));
        let detailed = SectorLoadCoordinator::new(
            Quality::Detailed,
            detailed_fetcher,
            Arc::new(detailed_decoder),
            sinks.detailed,
        )
        .with_metrics(metrics.clone())
        .with_fetch_slots(fetch_slots.clone());
        let simple = SectorLoadCoordinator::new(Quality::Simple, simple_fetcher, Arc::new(simple_decoder), sinks.simple)
            .with_metrics(metrics.clone())
            .with_fetch_slots(fetch_slots);

        info!(
            root = %root_id,
            workers = pool.worker_count(),
            detailed_budget = config.detailed_budget(),
            max_concurrent_fetches = config.max_concurrent_fetches,
            "Sector streamer started"
        );

        Ok(Self {
            tree,
            model_matrix: Mat4::IDENTITY,
            classifier: QualityClassifier::new(config.classifier.clone()),
            detailed,
            simple,
            pool,
            cache,
            metrics,
        })
    }

    /// Place the model in the world.
    pub fn with_model_matrix(mut self, model_matrix: Mat4) -> Self {
        self.model_matrix = model_matrix;
        self
    }

    /// Classify for `camera` and reconcile both coordinators.
    pub fn update(&self, camera: &CameraState) -> WantedSectors {
        self.metrics.camera_updated();
        let wanted = self.classifier.determine_sectors(&self.tree, camera, &self.model_matrix);
        debug!(
            detailed = wanted.detailed.len(),
            simple = wanted.simple.len(),
            "Camera update"
        );
        self.detailed.update(&wanted.detailed);
        self.simple.update(&wanted.simple);
        wanted
    }

    /// Discard everything currently loaded or loading.
    pub fn clear(&self) {
        self.detailed.clear();
        self.simple.clear();
    }

    /// Combined progress of both coordinators.
    pub fn loading_state(&self) -> LoadingState {
        self.detailed.loading_state().merge(self.simple.loading_state())
    }

    /// Wait until neither coordinator has a load in flight.
    pub async fn wait_until_settled(&self) {
        self.detailed.wait_until_settled().await;
        self.simple.wait_until_settled().await;
    }

    pub fn tree(&self) -> &SectorTree {
        &self.tree
    }

    pub fn detailed(&self) -> &SectorLoadCoordinator<SectorGeometry> {
        &self.detailed
    }

    pub fn simple(&self) -> &SectorLoadCoordinator<SectorQuads> {
        &self.simple
    }

    pub fn pool(&self) -> &DecodePool<D> {
        &self.pool
    }

    pub fn geometry_cache(&self) -> &GeometryCache {
        &self.cache
    }

    pub fn metrics(&self) -> &Arc<StreamingMetrics> {
        &self.metrics
    }
}

impl<D: NativeDecoder> CameraListener for SectorStreamer<D> {
    fn camera_changed(&self, camera: &CameraState) {
        self.update(camera);
    }
}
