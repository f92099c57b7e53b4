//! Sector decoders plugged into the load coordinators.
//!
//! ```text
//!  detailed bytes ─► pool.decode_sector ─► group by file ─┬─► cache / fetch+decode file 1 ─┐
//!                                                         ├─► cache / fetch+decode file 2 ─┼─► paint + group instances ─► SectorGeometry
//!                                                         └─► ...                         ─┘     (on pool)
//!
//!  simple bytes ───► pool.decode_quads ─► stride check ─► SectorQuads
//! ```
//!
//! Triangle meshes and instanced meshes of the same file share one load.
//! A geometry file that cannot be fetched or decoded is left out of the
//! sector and listed in [`SectorGeometry::failed_files`]; the rest of the
//! sector still loads. Errors in the sector file itself, or in painting,
//! fail the whole sector.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::loading::{BoxFuture, GeometryFetcher, LoadError, SectorDecoder};
use crate::sector::SectorId;
use crate::telemetry::StreamingMetrics;

use super::merge::{group_by_file, group_instances, paint_mesh};
use super::{
    DecodeError, DecodePool, GeometryCache, GeometryFile, NativeDecoder, SectorGeometry, SectorQuads, QUAD_STRIDE,
};

/// Decodes detailed sectors into painted triangle meshes.
pub struct DetailedSectorDecoder<D: NativeDecoder> {
    pool: Arc<DecodePool<D>>,
    cache: Arc<GeometryCache>,
    geometry: Arc<dyn GeometryFetcher>,
    metrics: Arc<StreamingMetrics>,
}

impl<D: NativeDecoder> DetailedSectorDecoder<D> {
    pub fn new(pool: Arc<DecodePool<D>>, geometry: Arc<dyn GeometryFetcher>) -> Self {
        Self {
            pool,
            cache: Arc::new(GeometryCache::default()),
            geometry,
            metrics: Arc::new(StreamingMetrics::new()),
        }
    }

    /// Use a shared geometry cache.
    pub fn with_cache(mut self, cache: Arc<GeometryCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<StreamingMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn cache(&self) -> &Arc<GeometryCache> {
        &self.cache
    }

    async fn load_geometry_file(&self, file_id: u64) -> Result<Arc<GeometryFile>, LoadError> {
        let (result, hit) = self
            .cache
            .get_or_load(file_id, async {
                let bytes = self.geometry.fetch_geometry_file(file_id).await?;
                let file = self
                    .pool
                    .decode_geometry_file(bytes)
                    .await
                    .map_err(|e| e.for_geometry_file(file_id))?;
                self.metrics.geometry_file_decoded();
                debug!(file_id, triangles = file.triangle_count(), "Geometry file decoded");
                Ok(file)
            })
            .await;
        if hit {
            self.metrics.geometry_cache_hit();
        }
        result
    }

    async fn decode(&self, id: SectorId, bytes: Bytes) -> Result<SectorGeometry, DecodeError> {
        let primitives = self.pool.decode_sector(bytes).await?;
        let triangle_groups = group_by_file(&primitives.triangle_meshes, |p| p.file_id);
        let instance_groups = group_by_file(&primitives.instance_meshes, |p| p.file_id);

        let file_ids: BTreeSet<u64> = triangle_groups.keys().chain(instance_groups.keys()).copied().collect();
        let loaded = join_all(file_ids.iter().map(|file_id| self.load_geometry_file(*file_id))).await;

        let mut files = BTreeMap::new();
        let mut failed_files = Vec::new();
        for (file_id, geometry) in file_ids.into_iter().zip(loaded) {
            match geometry {
                Ok(geometry) => {
                    files.insert(file_id, geometry);
                }
                Err(e) => {
                    warn!(sector = %id, file_id, error = %e, "Geometry file failed, leaving it out of sector");
                    self.metrics.geometry_file_failed();
                    failed_files.push(file_id);
                }
            }
        }

        let triangle_jobs = with_geometry(triangle_groups, &files);
        let instance_jobs = with_geometry(instance_groups, &files);

        let (triangle_meshes, instance_meshes) = self
            .pool
            .run(move || {
                let triangle_meshes = triangle_jobs
                    .into_iter()
                    .map(|(file_id, geometry, primitives)| paint_mesh(file_id, geometry, &primitives))
                    .collect::<Result<Vec<_>, _>>()?;
                let instance_meshes = instance_jobs
                    .into_iter()
                    .map(|(file_id, geometry, primitives)| group_instances(file_id, geometry, &primitives))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((triangle_meshes, instance_meshes))
            })
            .await?;

        Ok(SectorGeometry {
            sector_id: id,
            triangle_meshes,
            instance_meshes,
            failed_files,
        })
    }
}

/// Pair each file's primitives with its loaded geometry, skipping failed files.
fn with_geometry<T>(
    groups: BTreeMap<u64, Vec<T>>,
    files: &BTreeMap<u64, Arc<GeometryFile>>,
) -> Vec<(u64, Arc<GeometryFile>, Vec<T>)> {
    groups
        .into_iter()
        .filter_map(|(file_id, primitives)| files.get(&file_id).map(|geometry| (file_id, geometry.clone(), primitives)))
        .collect()
}

impl<D: NativeDecoder> SectorDecoder<SectorGeometry> for DetailedSectorDecoder<D> {
    fn decode_sector(&self, id: SectorId, bytes: Bytes) -> BoxFuture<'_, Result<SectorGeometry, DecodeError>> {
        Box::pin(async move { self.decode(id, bytes).await.map_err(|e| e.for_sector(id)) })
    }
}

/// Decodes simple sectors into packed quad instances.
pub struct SimpleSectorDecoder<D: NativeDecoder> {
    pool: Arc<DecodePool<D>>,
}

impl<D: NativeDecoder> SimpleSectorDecoder<D> {
    pub fn new(pool: Arc<DecodePool<D>>) -> Self {
        Self { pool }
    }
}

impl<D: NativeDecoder> SectorDecoder<SectorQuads> for SimpleSectorDecoder<D> {
    fn decode_sector(&self, id: SectorId, bytes: Bytes) -> BoxFuture<'_, Result<SectorQuads, DecodeError>> {
        Box::pin(async move {
            let buffer = self.pool.decode_quads(bytes).await.map_err(|e| e.for_sector(id))?;
            if buffer.len() % QUAD_STRIDE != 0 {
                return Err(DecodeError::InvalidQuadBuffer {
                    len: buffer.len(),
                    stride: QUAD_STRIDE,
                }
                .for_sector(id));
            }
            Ok(SectorQuads { sector_id: id, buffer })
        })
    }
}
