//! Shared geometry file cache using moka.
//!
//! Many detailed sectors reference the same geometry files. The cache keeps
//! decoded files keyed by file id, weighted by their heap size, so a file is
//! fetched and decoded once while it stays resident.
//!
//! Concurrent requests for the same missing file are coalesced: moka runs a
//! single loader and every waiter receives its result. A failed load is not
//! cached, so a later request retries it.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use moka::future::Cache;
use tracing::trace;

use crate::loading::LoadError;

use super::GeometryFile;

/// Default geometry cache size in megabytes.
pub const DEFAULT_GEOMETRY_CACHE_MB: u64 = 256;

/// Size-bounded cache of decoded geometry files.
pub struct GeometryCache {
    cache: Cache<u64, Arc<GeometryFile>>,
    max_size_bytes: u64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl GeometryCache {
    /// Create a cache holding at most `max_size_bytes` of geometry.
    pub fn new(max_size_bytes: u64) -> Self {
        let cache = Cache::builder()
            .weigher(|_file_id: &u64, file: &Arc<GeometryFile>| -> u32 {
                file.byte_size().min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes)
            .build();

        Self {
            cache,
            max_size_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Create a cache sized in megabytes.
    pub fn with_megabytes(megabytes: u64) -> Self {
        Self::new(megabytes * 1024 * 1024)
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Return the cached file, or run `load` once to produce it.
    ///
    /// The second value is true when the file came from the cache.
    pub async fn get_or_load<F>(&self, file_id: u64, load: F) -> (Result<Arc<GeometryFile>, LoadError>, bool)
    where
        F: Future<Output = Result<GeometryFile, LoadError>>,
    {
        let loaded = AtomicBool::new(false);
        let result = self
            .cache
            .try_get_with(file_id, async {
                loaded.store(true, Ordering::Release);
                load.await.map(Arc::new)
            })
            .await
            .map_err(|shared: Arc<LoadError>| (*shared).clone());

        let hit = result.is_ok() && !loaded.load(Ordering::Acquire);
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(file_id, "Geometry cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        (result, hit)
    }

    pub async fn contains(&self, file_id: u64) -> bool {
        self.cache.get(&file_id).await.is_some()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Bytes currently held, after pending maintenance.
    pub async fn size_bytes(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.weighted_size()
    }
}

impl Default for GeometryCache {
    fn default() -> Self {
        Self::with_megabytes(DEFAULT_GEOMETRY_CACHE_MB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::DecodeError;
    use std::sync::atomic::AtomicUsize;

    fn triangle() -> GeometryFile {
        GeometryFile {
            indices: vec![0, 1, 2],
            vertices: vec![0.0; 9],
            normals: None,
        }
    }

    #[tokio::test]
    async fn test_second_request_is_a_hit() {
        let cache = GeometryCache::default();
        let loads = AtomicUsize::new(0);

        let (first, hit) = cache
            .get_or_load(3, async {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(triangle())
            })
            .await;
        assert!(!hit);
        assert_eq!(first.unwrap().triangle_count(), 1);

        let (second, hit) = cache
            .get_or_load(3, async {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(triangle())
            })
            .await;
        assert!(hit);
        assert!(second.is_ok());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_load() {
        let cache = GeometryCache::default();
        let loads = &AtomicUsize::new(0);
        let load = move || async move {
            loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok(triangle())
        };

        let (a, b) = tokio::join!(cache.get_or_load(5, load()), cache.get_or_load(5, load()));
        assert!(a.0.is_ok() && b.0.is_ok());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a.0.unwrap(), &b.0.unwrap()));
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let cache = GeometryCache::default();
        let (failed, hit) = cache
            .get_or_load(9, async { Err(LoadError::Decode(DecodeError::InvalidGeometry("bad".into()))) })
            .await;
        assert!(!hit);
        assert!(matches!(failed, Err(LoadError::Decode(_))));
        assert!(!cache.contains(9).await);

        let (retried, _) = cache.get_or_load(9, async { Ok(triangle()) }).await;
        assert!(retried.is_ok());
        assert!(cache.contains(9).await);
    }

    #[tokio::test]
    async fn test_entries_are_weighted_by_size() {
        let cache = GeometryCache::default();
        let _ = cache.get_or_load(1, async { Ok(triangle()) }).await;
        assert_eq!(cache.size_bytes().await, triangle().byte_size() as u64);
    }
}
