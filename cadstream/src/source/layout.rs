//! Mapping from sector ids and geometry file ids to model file names.

use std::sync::Arc;

use bytes::Bytes;

use crate::culling::Quality;
use crate::loading::{BoxFuture, FetchError, GeometryFetcher, SectorFetcher};
use crate::sector::{SectorId, SectorTree};

use super::ModelSource;

/// File name of a shared geometry file.
pub fn geometry_file_name(file_id: u64) -> String {
    format!("mesh_{}.ctm", file_id)
}

/// Fetch delegate resolving sector ids through the scene metadata.
///
/// Detailed sectors read their index file, simple sectors their faces
/// file. Geometry files are named by [`geometry_file_name`].
pub struct SceneFetcher {
    source: Arc<dyn ModelSource>,
    tree: Arc<SectorTree>,
    quality: Quality,
}

impl SceneFetcher {
    pub fn new(source: Arc<dyn ModelSource>, tree: Arc<SectorTree>, quality: Quality) -> Self {
        Self { source, tree, quality }
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Name of the file holding `id` at this fetcher's quality.
    pub fn file_name(&self, id: SectorId) -> Result<&str, FetchError> {
        let metadata = self.tree.metadata(id).ok_or(FetchError::UnknownSector(id))?;
        match self.quality {
            Quality::Detailed => Ok(&metadata.index_file.file_name),
            Quality::Simple => metadata
                .faces_file
                .as_ref()
                .map(|faces| faces.file_name.as_str())
                .ok_or(FetchError::NoSimpleGeometry(id)),
        }
    }
}

impl SectorFetcher for SceneFetcher {
    fn fetch_sector(&self, id: SectorId) -> BoxFuture<'_, Result<Bytes, FetchError>> {
        Box::pin(async move {
            let name = self.file_name(id)?;
            self.source.fetch_file(name).await
        })
    }
}

impl GeometryFetcher for SceneFetcher {
    fn fetch_geometry_file(&self, file_id: u64) -> BoxFuture<'_, Result<Bytes, FetchError>> {
        Box::pin(async move {
            let name = geometry_file_name(file_id);
            self.source.fetch_file(&name).await
        })
    }
}
