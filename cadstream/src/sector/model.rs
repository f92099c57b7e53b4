//! Immutable sector tree.
//!
//! The tree is built once from scene metadata and never mutated. Children are
//! owned by their parent, so the whole hierarchy is a single value.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::Aabb;

use super::metadata::SectorMetadata;

/// Identifier of a sector, unique and stable within one loaded model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectorId(pub u32);

impl SectorId {
    /// Numeric value of the id.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sector#{}", self.0)
    }
}

impl From<u32> for SectorId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// A node of the spatial partition tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Sector {
    /// Unique sector id.
    pub id: SectorId,
    /// Hierarchical path, `"0/"` for the root.
    pub path: String,
    /// Bounds in model space. Children are assumed to lie within these.
    pub bounds: Aabb,
    /// Child sectors.
    pub children: Vec<Sector>,
}

impl Sector {
    /// Create a leaf sector.
    pub fn leaf(id: impl Into<SectorId>, path: impl Into<String>, bounds: Aabb) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            bounds,
            children: Vec::new(),
        }
    }

    /// Attach children, builder style.
    pub fn with_children(mut self, children: Vec<Sector>) -> Self {
        self.children = children;
        self
    }

    /// Returns true if the sector has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Depth-first, pre-order iterator over this sector and its descendants.
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }
}

/// Pre-order iterator over a sector subtree.
pub struct PreOrder<'a> {
    stack: Vec<&'a Sector>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a Sector;

    fn next(&mut self) -> Option<Self::Item> {
        let sector = self.stack.pop()?;
        // Reverse so the first child is visited next
        self.stack.extend(sector.children.iter().rev());
        Some(sector)
    }
}

/// The full sector hierarchy of a model plus per-sector file metadata.
#[derive(Debug, Clone, Default)]
pub struct SectorTree {
    root: Option<Sector>,
    metadata: HashMap<SectorId, SectorMetadata>,
}

impl SectorTree {
    /// Wrap an already built hierarchy without file metadata.
    pub fn new(root: Sector) -> Self {
        Self {
            root: Some(root),
            metadata: HashMap::new(),
        }
    }

    /// A tree with no sectors.
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(root: Option<Sector>, metadata: HashMap<SectorId, SectorMetadata>) -> Self {
        Self { root, metadata }
    }

    /// Root sector, if the tree is not empty.
    pub fn root(&self) -> Option<&Sector> {
        self.root.as_ref()
    }

    /// Number of sectors in the tree.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Returns true if the tree has no sectors.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Pre-order iterator over all sectors.
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder {
            stack: self.root.iter().collect(),
        }
    }

    /// Find a sector by id.
    pub fn get(&self, id: SectorId) -> Option<&Sector> {
        self.iter().find(|sector| sector.id == id)
    }

    /// File metadata for a sector, when the tree was built from a scene file.
    pub fn metadata(&self, id: SectorId) -> Option<&SectorMetadata> {
        self.metadata.get(&id)
    }
}
