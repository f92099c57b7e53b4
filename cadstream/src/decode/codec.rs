//! Reference `NativeDecoder` built on serde + bincode.
//!
//! Each file starts with a four-byte magic followed by a bincode body:
//!
//! | File            | Magic  | Body          |
//! |-----------------|--------|---------------|
//! | Detailed sector | `CSEC` | [`SectorFile`] |
//! | Geometry file   | `CMSH` | [`MeshFile`]   |
//! | Simple sector   | `CQAD` | [`QuadFile`]   |
//!
//! The root sector carries the color palette that becomes the decode
//! context. Primitives and quads name a tree index; their color is looked
//! up in the palette.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{
    DecodeError, GeometryFile, InstancedMeshPrimitive, NativeDecoder, SectorPrimitives, TriangleMeshPrimitive,
    QUAD_STRIDE,
};

const SECTOR_MAGIC: &[u8; 4] = b"CSEC";
const MESH_MAGIC: &[u8; 4] = b"CMSH";
const QUAD_MAGIC: &[u8; 4] = b"CQAD";

/// Color of one tree index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub tree_index: u32,
    pub color: [u8; 4],
}

/// Triangle-mesh primitive as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimitiveRecord {
    pub file_id: u64,
    pub tree_index: u32,
    pub triangle_count: u32,
}

/// Instanced placement of a triangle range, as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub file_id: u64,
    pub tree_index: u32,
    pub triangle_offset: u32,
    pub triangle_count: u32,
    /// Column-major placement matrix.
    pub matrix: [f32; 16],
}

/// Detailed sector file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorFile {
    /// Present in the root sector only.
    pub palette: Option<Vec<PaletteEntry>>,
    pub primitives: Vec<PrimitiveRecord>,
    pub instances: Vec<InstanceRecord>,
}

/// Shared geometry file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshFile {
    pub indices: Vec<u32>,
    pub vertices: Vec<f32>,
    pub normals: Option<Vec<f32>>,
}

/// One simple-geometry instance as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadRecord {
    pub position: [f32; 3],
    pub tree_index: u32,
    pub normal: [f32; 3],
    /// Column-major placement matrix.
    pub placement: [f32; 16],
}

/// Simple sector file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuadFile {
    pub instances: Vec<QuadRecord>,
}

/// Decode context: tree index → RGBA color.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorPalette {
    colors: HashMap<u32, [u8; 4]>,
}

impl ColorPalette {
    pub fn from_entries(entries: &[PaletteEntry]) -> Self {
        Self {
            colors: entries.iter().map(|e| (e.tree_index, e.color)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    fn color(&self, what: &'static str, tree_index: u32) -> Result<[u8; 4], DecodeError> {
        self.colors
            .get(&tree_index)
            .copied()
            .ok_or_else(|| DecodeError::MissingField {
                what,
                field: format!("color for tree index {}", tree_index),
            })
    }
}

/// Decoder for the bincode file layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeDecoder;

impl BincodeDecoder {
    pub fn encode_sector(file: &SectorFile) -> Result<Vec<u8>, bincode::Error> {
        encode(SECTOR_MAGIC, file)
    }

    pub fn encode_geometry_file(file: &MeshFile) -> Result<Vec<u8>, bincode::Error> {
        encode(MESH_MAGIC, file)
    }

    pub fn encode_quads(file: &QuadFile) -> Result<Vec<u8>, bincode::Error> {
        encode(QUAD_MAGIC, file)
    }
}

impl NativeDecoder for BincodeDecoder {
    type Context = ColorPalette;

    fn decode_root(&self, bytes: &[u8]) -> Result<ColorPalette, DecodeError> {
        let file: SectorFile = decode(SECTOR_MAGIC, "root sector", bytes)?;
        let palette = file.palette.ok_or_else(|| DecodeError::MissingField {
            what: "root sector",
            field: "palette".to_string(),
        })?;
        Ok(ColorPalette::from_entries(&palette))
    }

    fn decode_sector(&self, context: &ColorPalette, bytes: &[u8]) -> Result<SectorPrimitives, DecodeError> {
        let file: SectorFile = decode(SECTOR_MAGIC, "sector", bytes)?;
        let triangle_meshes = file
            .primitives
            .iter()
            .map(|record| {
                Ok(TriangleMeshPrimitive {
                    file_id: record.file_id,
                    tree_index: record.tree_index,
                    color: context.color("sector", record.tree_index)?,
                    triangle_count: record.triangle_count,
                })
            })
            .collect::<Result<_, DecodeError>>()?;
        let instance_meshes = file
            .instances
            .iter()
            .map(|record| {
                Ok(InstancedMeshPrimitive {
                    file_id: record.file_id,
                    tree_index: record.tree_index,
                    color: context.color("sector", record.tree_index)?,
                    triangle_offset: record.triangle_offset,
                    triangle_count: record.triangle_count,
                    instance_matrix: record.matrix,
                })
            })
            .collect::<Result<_, DecodeError>>()?;
        Ok(SectorPrimitives {
            triangle_meshes,
            instance_meshes,
        })
    }

    fn decode_geometry_file(&self, bytes: &[u8]) -> Result<GeometryFile, DecodeError> {
        let file: MeshFile = decode(MESH_MAGIC, "geometry file", bytes)?;
        if file.vertices.len() % 3 != 0 {
            return Err(DecodeError::InvalidGeometry(format!(
                "{} vertex floats is not a multiple of 3",
                file.vertices.len()
            )));
        }
        if file.indices.len() % 3 != 0 {
            return Err(DecodeError::InvalidGeometry(format!(
                "{} indices is not a multiple of 3",
                file.indices.len()
            )));
        }
        if let Some(normals) = &file.normals {
            if normals.len() != file.vertices.len() {
                return Err(DecodeError::InvalidGeometry(format!(
                    "{} normal floats for {} vertex floats",
                    normals.len(),
                    file.vertices.len()
                )));
            }
        }
        Ok(GeometryFile {
            indices: file.indices,
            vertices: file.vertices,
            normals: file.normals,
        })
    }

    fn decode_quads(&self, context: &ColorPalette, bytes: &[u8]) -> Result<Vec<f32>, DecodeError> {
        let file: QuadFile = decode(QUAD_MAGIC, "quad file", bytes)?;
        let mut buffer = Vec::with_capacity(file.instances.len() * QUAD_STRIDE);
        for quad in &file.instances {
            let [r, g, b, _] = context.color("quad file", quad.tree_index)?;
            buffer.extend_from_slice(&quad.position);
            buffer.extend([r, g, b].map(|c| c as f32 / 255.0));
            buffer.extend_from_slice(&quad.normal);
            buffer.extend_from_slice(&quad.placement);
        }
        Ok(buffer)
    }
}

fn encode<T: Serialize>(magic: &[u8; 4], value: &T) -> Result<Vec<u8>, bincode::Error> {
    let mut out = magic.to_vec();
    bincode::serialize_into(&mut out, value)?;
    Ok(out)
}

fn decode<T: DeserializeOwned>(magic: &[u8; 4], what: &'static str, bytes: &[u8]) -> Result<T, DecodeError> {
    let body = bytes
        .strip_prefix(magic.as_slice())
        .ok_or_else(|| DecodeError::malformed(what, "unexpected file magic"))?;
    bincode::deserialize(body).map_err(|e| DecodeError::malformed(what, e))
}
