//! Decoded payload types.

use std::sync::Arc;

use crate::sector::SectorId;

/// Floats per simple-geometry instance: position (3), color (3), normal (3)
/// and a column-major 4×4 placement matrix (16).
pub const QUAD_STRIDE: usize = 25;

/// One triangle-mesh primitive of a detailed sector.
///
/// The primitive's triangles live in a shared geometry file; primitives of
/// the same file are laid out back to back, so the first triangle of a
/// primitive is the sum of the counts of the primitives before it.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMeshPrimitive {
    pub file_id: u64,
    pub tree_index: u32,
    /// RGBA color resolved from the root context.
    pub color: [u8; 4],
    pub triangle_count: u32,
}

/// One placement of a triangle range of a shared geometry file.
#[derive(Debug, Clone, PartialEq)]
pub struct InstancedMeshPrimitive {
    pub file_id: u64,
    pub tree_index: u32,
    pub color: [u8; 4],
    pub triangle_offset: u32,
    pub triangle_count: u32,
    /// Column-major placement matrix.
    pub instance_matrix: [f32; 16],
}

/// Raw primitive arrays of a decoded detailed sector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectorPrimitives {
    pub triangle_meshes: Vec<TriangleMeshPrimitive>,
    pub instance_meshes: Vec<InstancedMeshPrimitive>,
}

/// Decoded shared geometry file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryFile {
    /// Three indices per triangle.
    pub indices: Vec<u32>,
    /// Three floats per vertex.
    pub vertices: Vec<f32>,
    /// Three floats per vertex, when present.
    pub normals: Option<Vec<f32>>,
}

impl GeometryFile {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Approximate heap size, used to weigh cache entries.
    pub fn byte_size(&self) -> usize {
        self.indices.len() * 4
            + self.vertices.len() * 4
            + self.normals.as_ref().map_or(0, |normals| normals.len() * 4)
    }
}

/// Triangles of one sector drawn from one geometry file.
///
/// The geometry itself is shared between every sector that references the
/// file; colors and tree indices are painted per sector.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    pub file_id: u64,
    pub geometry: Arc<GeometryFile>,
    /// RGB per vertex.
    pub colors: Vec<u8>,
    /// Tree index per vertex.
    pub tree_indices: Vec<f32>,
}

/// Every placement of one triangle range within a geometry file.
#[derive(Debug, Clone, PartialEq)]
pub struct InstancedMesh {
    pub triangle_offset: u32,
    pub triangle_count: u32,
    /// 16 floats per instance, column-major.
    pub instance_matrices: Vec<f32>,
    /// RGBA per instance.
    pub colors: Vec<u8>,
    /// Tree index per instance.
    pub tree_indices: Vec<f32>,
}

impl InstancedMesh {
    pub fn instance_count(&self) -> usize {
        self.tree_indices.len()
    }
}

/// Instanced meshes of one sector drawn from one shared geometry file.
#[derive(Debug, Clone)]
pub struct InstancedMeshFile {
    pub file_id: u64,
    pub geometry: Arc<GeometryFile>,
    /// Ordered by triangle offset.
    pub instances: Vec<InstancedMesh>,
}

/// Full-detail payload of a sector.
#[derive(Debug, Clone)]
pub struct SectorGeometry {
    pub sector_id: SectorId,
    /// One mesh per referenced geometry file, ordered by file id.
    pub triangle_meshes: Vec<TriangleMesh>,
    /// One entry per geometry file with instances, ordered by file id.
    pub instance_meshes: Vec<InstancedMeshFile>,
    /// Geometry files that could not be loaded; their meshes are missing.
    pub failed_files: Vec<u64>,
}

impl SectorGeometry {
    /// Triangles of the non-instanced meshes.
    pub fn triangle_count(&self) -> usize {
        self.triangle_meshes
            .iter()
            .map(|mesh| mesh.geometry.triangle_count())
            .sum()
    }

    pub fn instance_count(&self) -> usize {
        self.instance_meshes
            .iter()
            .flat_map(|file| &file.instances)
            .map(InstancedMesh::instance_count)
            .sum()
    }
}

/// Simplified payload of a sector: packed quad instances.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorQuads {
    pub sector_id: SectorId,
    /// `QUAD_STRIDE` floats per instance.
    pub buffer: Vec<f32>,
}

impl SectorQuads {
    pub fn instance_count(&self) -> usize {
        self.buffer.len() / QUAD_STRIDE
    }

    /// Iterate over the packed instances.
    pub fn instances(&self) -> impl Iterator<Item = &[f32]> {
        self.buffer.chunks_exact(QUAD_STRIDE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_file_counts() {
        let file = GeometryFile {
            indices: vec![0, 1, 2, 2, 1, 3],
            vertices: vec![0.0; 12],
            normals: Some(vec![0.0; 12]),
        };
        assert_eq!(file.vertex_count(), 4);
        assert_eq!(file.triangle_count(), 2);
        assert_eq!(file.byte_size(), 6 * 4 + 12 * 4 + 12 * 4);
    }

    #[test]
    fn test_quad_instances() {
        let quads = SectorQuads {
            sector_id: SectorId(1),
            buffer: (0..QUAD_STRIDE * 2).map(|v| v as f32).collect(),
        };
        assert_eq!(quads.instance_count(), 2);
        let second: Vec<&[f32]> = quads.instances().collect();
        assert_eq!(second[1][0], QUAD_STRIDE as f32);
    }
}
