//! Sector hierarchy of a streamed model.
//!
//! A model is partitioned into a tree of sectors, each covering a
//! sub-region of the model in model space. The tree is immutable once built.

mod metadata;
mod model;
mod sets;

pub use metadata::{
    FacesFile, IndexFile, MetadataError, SceneMetadata, SectorMetadata, SCENE_FILE_NAME,
    SCENE_FORMAT_VERSION,
};
pub use model::{PreOrder, Sector, SectorId, SectorTree};
pub use sets::{difference, intersection, union, SectorIdSet};
