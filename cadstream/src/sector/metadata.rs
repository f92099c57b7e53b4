//! Scene metadata (`scene.json`) and sector tree construction.
//!
//! The metadata file is a flat list of sectors with parent links. It is turned
//! into the immutable [`SectorTree`] once, when a model is opened.
//!
//! ```text
//! scene.json ──► SceneMetadata ──► SectorTree::from_metadata ──► SectorTree
//!                (flat, serde)       (validate + link)           (owned tree)
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Aabb;

use super::{Sector, SectorId, SectorTree};

/// Name of the metadata file at the root of a model directory.
pub const SCENE_FILE_NAME: &str = "scene.json";

/// Current metadata format version.
pub const SCENE_FORMAT_VERSION: u32 = 1;

/// Errors raised while parsing metadata or linking the sector tree.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Invalid scene metadata: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Scene metadata has no root sector")]
    NoRoot,

    #[error("Scene metadata has more than one root sector: {first} and {second}")]
    MultipleRoots { first: SectorId, second: SectorId },

    #[error("Duplicate sector id {0}")]
    DuplicateId(SectorId),

    #[error("{id} references unknown parent {parent}")]
    UnknownParent { id: SectorId, parent: SectorId },

    #[error("{0} has inverted bounds")]
    InvalidBounds(SectorId),

    #[error("{count} sectors are not reachable from the root")]
    Unreachable { count: usize },
}

/// Detailed payload file and the shared geometry files it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexFile {
    pub file_name: String,
    #[serde(default)]
    pub peripheral_files: Vec<String>,
}

/// Simple (instanced quads) payload file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacesFile {
    pub file_name: String,
}

/// One entry of the flat sector list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorMetadata {
    pub id: SectorId,
    #[serde(default)]
    pub parent_id: Option<SectorId>,
    pub path: String,
    #[serde(default)]
    pub depth: u32,
    pub bounding_box: Aabb,
    pub index_file: IndexFile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faces_file: Option<FacesFile>,
}

/// Parsed contents of `scene.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneMetadata {
    pub version: u32,
    pub max_tree_index: u32,
    pub sectors: Vec<SectorMetadata>,
}

impl SceneMetadata {
    /// Parse metadata from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self, MetadataError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serialize metadata as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, MetadataError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl SectorTree {
    /// Validate the flat sector list and link it into a tree.
    ///
    /// Children keep the order in which they appear in the list. An empty list
    /// yields an empty tree.
    pub fn from_metadata(scene: &SceneMetadata) -> Result<Self, MetadataError> {
        if scene.sectors.is_empty() {
            return Ok(SectorTree::empty());
        }

        let mut seen = HashSet::with_capacity(scene.sectors.len());
        let mut root: Option<&SectorMetadata> = None;
        for sector in &scene.sectors {
            if !seen.insert(sector.id) {
                return Err(MetadataError::DuplicateId(sector.id));
            }
            if !sector.bounding_box.is_valid() {
                return Err(MetadataError::InvalidBounds(sector.id));
            }
            if sector.parent_id.is_none() {
                if let Some(first) = root {
                    return Err(MetadataError::MultipleRoots {
                        first: first.id,
                        second: sector.id,
                    });
                }
                root = Some(sector);
            }
        }
        let root = root.ok_or(MetadataError::NoRoot)?;

        let mut children: HashMap<SectorId, Vec<&SectorMetadata>> = HashMap::new();
        for sector in &scene.sectors {
            if let Some(parent) = sector.parent_id {
                if !seen.contains(&parent) {
                    return Err(MetadataError::UnknownParent {
                        id: sector.id,
                        parent,
                    });
                }
                children.entry(parent).or_default().push(sector);
            }
        }

        let mut linked = 0usize;
        let tree = link(root, &children, &mut linked);
        if linked != scene.sectors.len() {
            return Err(MetadataError::Unreachable {
                count: scene.sectors.len() - linked,
            });
        }

        let metadata = scene
            .sectors
            .iter()
            .map(|sector| (sector.id, sector.clone()))
            .collect();
        Ok(SectorTree::from_parts(Some(tree), metadata))
    }
}

fn link(
    entry: &SectorMetadata,
    children: &HashMap<SectorId, Vec<&SectorMetadata>>,
    linked: &mut usize,
) -> Sector {
    *linked += 1;
    let kids = children
        .get(&entry.id)
        .map(|kids| kids.iter().map(|kid| link(kid, children, linked)).collect())
        .unwrap_or_default();
    Sector::leaf(entry.id, entry.path.clone(), entry.bounding_box).with_children(kids)
}
