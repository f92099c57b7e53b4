//! Synthetic models for demos and tests.
//!
//! Writes a complete model directory in the [`BincodeDecoder`] layout: a
//! `scene.json`, one detailed and one simple file per sector, and a set of
//! shared geometry files. Each detailed sector paints the first half of its
//! geometry file and places the second half twice as instances. The sector tree splits each box into `fanout`
//! slabs along the X axis, down to `depth` levels below the root.

use std::path::{Path, PathBuf};

use glam::Vec3;
use thiserror::Error;
use tracing::info;

use crate::decode::codec::{
    InstanceRecord, MeshFile, PaletteEntry, PrimitiveRecord, QuadFile, QuadRecord, SectorFile,
};
use crate::decode::BincodeDecoder;
use crate::geometry::Aabb;
use crate::sector::{
    FacesFile, IndexFile, MetadataError, SceneMetadata, SectorId, SectorMetadata, SCENE_FILE_NAME,
    SCENE_FORMAT_VERSION,
};
use crate::source::geometry_file_name;

/// Triangles in each generated geometry file.
const TRIANGLES_PER_FILE: u32 = 4;

/// Instanced placements per detailed sector.
const INSTANCES_PER_SECTOR: usize = 2;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode {what}: {source}")]
    Encode {
        what: String,
        #[source]
        source: bincode::Error,
    },

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

/// Shape of a generated model.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticModel {
    pub depth: u32,
    pub fanout: u32,
    /// Edge length of the root box.
    pub extent: f32,
    /// Number of shared geometry files sectors draw from.
    pub geometry_files: u64,
}

impl Default for SyntheticModel {
    fn default() -> Self {
        Self {
            depth: 3,
            fanout: 4,
            extent: 100.0,
            geometry_files: 8,
        }
    }
}

impl SyntheticModel {
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_fanout(mut self, fanout: u32) -> Self {
        self.fanout = fanout.max(1);
        self
    }

    pub fn with_geometry_files(mut self, count: u64) -> Self {
        self.geometry_files = count.max(1);
        self
    }

    /// Build the scene metadata without writing anything.
    pub fn scene(&self) -> SceneMetadata {
        let mut sectors = Vec::new();
        let root = Aabb::new(Vec3::ZERO, Vec3::splat(self.extent));
        self.push_sector(&mut sectors, None, 0, "0/".to_string(), root);
        let max_tree_index = sectors.len() as u32;
        SceneMetadata {
            version: SCENE_FORMAT_VERSION,
            max_tree_index,
            sectors,
        }
    }

    fn push_sector(
        &self,
        sectors: &mut Vec<SectorMetadata>,
        parent: Option<SectorId>,
        depth: u32,
        path: String,
        bounds: Aabb,
    ) {
        let id = SectorId(sectors.len() as u32);
        sectors.push(SectorMetadata {
            id,
            parent_id: parent,
            path: path.clone(),
            depth,
            bounding_box: bounds,
            index_file: IndexFile {
                file_name: format!("sector_{}.i3d", id.value()),
                peripheral_files: vec![geometry_file_name(self.file_for(id))],
            },
            faces_file: Some(FacesFile {
                file_name: format!("sector_{}.f3d", id.value()),
            }),
        });

        if depth >= self.depth {
            return;
        }
        let width = bounds.size().x / self.fanout as f32;
        for slab in 0..self.fanout {
            let min = Vec3::new(bounds.min.x + width * slab as f32, bounds.min.y, bounds.min.z);
            let max = Vec3::new(min.x + width, bounds.max.y, bounds.max.z);
            let child_path = format!("{}{}/", path, slab);
            self.push_sector(sectors, Some(id), depth + 1, child_path, Aabb::new(min, max));
        }
    }

    fn file_for(&self, id: SectorId) -> u64 {
        id.value() as u64 % self.geometry_files
    }

    /// Write the model into `dir`, creating it if needed.
    pub fn write(&self, dir: &Path) -> Result<SceneMetadata, GenerateError> {
        std::fs::create_dir_all(dir).map_err(|source| GenerateError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let scene = self.scene();

        let palette: Vec<PaletteEntry> = (0..=scene.max_tree_index)
            .map(|tree_index| PaletteEntry {
                tree_index,
                color: [(tree_index * 37 % 256) as u8, (tree_index * 91 % 256) as u8, 200, 255],
            })
            .collect();

        for sector in &scene.sectors {
            let tree_index = sector.id.value() + 1;
            let file_id = self.file_for(sector.id);
            let center = sector.bounding_box.center();
            let instances = (0..INSTANCES_PER_SECTOR)
                .map(|copy| InstanceRecord {
                    file_id,
                    tree_index,
                    triangle_offset: TRIANGLES_PER_FILE / 2,
                    triangle_count: TRIANGLES_PER_FILE / 2,
                    matrix: glam::Mat4::from_translation(center + Vec3::Z * copy as f32).to_cols_array(),
                })
                .collect();
            let detailed = SectorFile {
                palette: sector.parent_id.is_none().then(|| palette.clone()),
                primitives: vec![
                    PrimitiveRecord {
                        file_id,
                        tree_index,
                        triangle_count: TRIANGLES_PER_FILE / 2,
                    },
                    PrimitiveRecord {
                        file_id,
                        tree_index: 0,
                        triangle_count: TRIANGLES_PER_FILE / 2,
                    },
                ],
                instances,
            };
            let quads = QuadFile {
                instances: vec![QuadRecord {
                    position: center.to_array(),
                    tree_index,
                    normal: [0.0, 1.0, 0.0],
                    placement: glam::Mat4::from_translation(center).to_cols_array(),
                }],
            };

            let what = format!("sector {}", sector.id.value());
            write_file(dir, &sector.index_file.file_name, encoded(&what, BincodeDecoder::encode_sector(&detailed))?)?;
            if let Some(faces) = &sector.faces_file {
                write_file(dir, &faces.file_name, encoded(&what, BincodeDecoder::encode_quads(&quads))?)?;
            }
        }

        for file_id in 0..self.geometry_files {
            let mesh = mesh(file_id);
            let bytes = encoded(&format!("geometry file {}", file_id), BincodeDecoder::encode_geometry_file(&mesh))?;
            write_file(dir, &geometry_file_name(file_id), bytes)?;
        }

        let json = scene.to_json_pretty()?;
        write_file(dir, SCENE_FILE_NAME, json.into_bytes())?;
        info!(
            directory = %dir.display(),
            sectors = scene.sectors.len(),
            geometry_files = self.geometry_files,
            "Synthetic model written"
        );
        Ok(scene)
    }
}

/// A strip of triangles, offset by file id.
fn mesh(file_id: u64) -> MeshFile {
    let offset = file_id as f32;
    let vertex_count = TRIANGLES_PER_FILE + 2;
    let vertices = (0..vertex_count)
        .flat_map(|v| [offset + (v / 2) as f32, (v % 2) as f32, 0.0])
        .collect();
    let indices = (0..TRIANGLES_PER_FILE).flat_map(|t| [t, t + 1, t + 2]).collect();
    MeshFile {
        indices,
        vertices,
        normals: None,
    }
}

fn encoded(what: &str, result: Result<Vec<u8>, bincode::Error>) -> Result<Vec<u8>, GenerateError> {
    result.map_err(|source| GenerateError::Encode {
        what: what.to_string(),
        source,
    })
}

fn write_file(dir: &Path, name: &str, bytes: Vec<u8>) -> Result<(), GenerateError> {
    let path = dir.join(name);
    std::fs::write(&path, bytes).map_err(|source| GenerateError::Io { path, source })
}
