//! Per-sector painting of shared geometry.
//!
//! A detailed sector lists triangle-mesh primitives. Primitives of the same
//! geometry file are stored back to back, so primitive `k` of a file owns
//! the triangles starting at the sum of the counts of primitives `0..k`.
//! Painting writes each primitive's color and tree index onto the vertices
//! of its triangles, producing one [`TriangleMesh`] per file.
//!
//! Instanced primitives name their triangle range explicitly. Placements of
//! the same range are collected into one [`InstancedMesh`] so the range is
//! drawn once per sector with a matrix, color and tree index per instance.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{
    DecodeError, GeometryFile, InstancedMesh, InstancedMeshFile, InstancedMeshPrimitive, TriangleMesh,
    TriangleMeshPrimitive,
};

/// Group primitives by geometry file, keeping their order within a file.
pub fn group_by_file<T: Clone>(primitives: &[T], file_id: impl Fn(&T) -> u64) -> BTreeMap<u64, Vec<T>> {
    let mut groups: BTreeMap<u64, Vec<T>> = BTreeMap::new();
    for primitive in primitives {
        groups.entry(file_id(primitive)).or_default().push(primitive.clone());
    }
    groups
}

/// Collect the instanced primitives of `file_id` by triangle range.
///
/// Every primitive sharing an offset must also share its triangle count,
/// and the range must lie inside the geometry file.
pub fn group_instances(
    file_id: u64,
    geometry: Arc<GeometryFile>,
    primitives: &[InstancedMeshPrimitive],
) -> Result<InstancedMeshFile, DecodeError> {
    let triangle_count = geometry.triangle_count();
    let mut ranges: BTreeMap<u32, InstancedMesh> = BTreeMap::new();

    for primitive in primitives {
        let end = primitive.triangle_offset as usize + primitive.triangle_count as usize;
        if end > triangle_count {
            return Err(DecodeError::InvalidGeometry(format!(
                "instance of tree index {} ends at triangle {} but file {} has {}",
                primitive.tree_index, end, file_id, triangle_count
            )));
        }

        let mesh = ranges.entry(primitive.triangle_offset).or_insert_with(|| InstancedMesh {
            triangle_offset: primitive.triangle_offset,
            triangle_count: primitive.triangle_count,
            instance_matrices: Vec::new(),
            colors: Vec::new(),
            tree_indices: Vec::new(),
        });
        if mesh.triangle_count != primitive.triangle_count {
            return Err(DecodeError::InvalidGeometry(format!(
                "instances at triangle {} of file {} disagree on length ({} and {})",
                primitive.triangle_offset, file_id, mesh.triangle_count, primitive.triangle_count
            )));
        }
        mesh.instance_matrices.extend_from_slice(&primitive.instance_matrix);
        mesh.colors.extend_from_slice(&primitive.color);
        mesh.tree_indices.push(primitive.tree_index as f32);
    }

    Ok(InstancedMeshFile {
        file_id,
        geometry,
        instances: ranges.into_values().collect(),
    })
}

/// Paint `primitives` onto the shared `geometry` of `file_id`.
///
/// Vertices not covered by any primitive stay black with tree index 0.
pub fn paint_mesh(
    file_id: u64,
    geometry: Arc<GeometryFile>,
    primitives: &[TriangleMeshPrimitive],
) -> Result<TriangleMesh, DecodeError> {
    let vertex_count = geometry.vertex_count();
    let triangle_count = geometry.triangle_count();
    let mut colors = vec![0u8; vertex_count * 3];
    let mut tree_indices = vec![0f32; vertex_count];

    let mut first_triangle = 0usize;
    for primitive in primitives {
        let end = first_triangle + primitive.triangle_count as usize;
        if end > triangle_count {
            return Err(DecodeError::InvalidGeometry(format!(
                "primitive of tree index {} ends at triangle {} but file {} has {}",
                primitive.tree_index, end, file_id, triangle_count
            )));
        }

        let [r, g, b, _] = primitive.color;
        for index in &geometry.indices[first_triangle * 3..end * 3] {
            let vertex = *index as usize;
            if vertex >= vertex_count {
                return Err(DecodeError::InvalidGeometry(format!(
                    "index {} out of range for {} vertices in file {}",
                    vertex, vertex_count, file_id
                )));
            }
            colors[vertex * 3..vertex * 3 + 3].copy_from_slice(&[r, g, b]);
            tree_indices[vertex] = primitive.tree_index as f32;
        }
        first_triangle = end;
    }

    Ok(TriangleMesh {
        file_id,
        geometry,
        colors,
        tree_indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primitive(file_id: u64, tree_index: u32, color: [u8; 4], triangle_count: u32) -> TriangleMeshPrimitive {
        TriangleMeshPrimitive {
            file_id,
            tree_index,
            color,
            triangle_count,
        }
    }

    /// Two triangles sharing no vertices.
    fn two_triangles() -> Arc<GeometryFile> {
        Arc::new(GeometryFile {
            indices: vec![0, 1, 2, 3, 4, 5],
            vertices: vec![0.0; 18],
            normals: None,
        })
    }

    #[test]
    fn test_group_by_file_keeps_order() {
        let primitives = vec![
            primitive(2, 10, [0; 4], 1),
            primitive(1, 11, [0; 4], 1),
            primitive(2, 12, [0; 4], 1),
        ];
        let groups = group_by_file(&primitives, |p| p.file_id);
        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        let tree_indices: Vec<u32> = groups[&2].iter().map(|p| p.tree_index).collect();
        assert_eq!(tree_indices, vec![10, 12]);
    }

    #[test]
    fn test_paint_uses_running_triangle_offset() {
        let primitives = vec![
            primitive(1, 7, [255, 0, 0, 255], 1),
            primitive(1, 8, [0, 0, 255, 255], 1),
        ];
        let mesh = paint_mesh(1, two_triangles(), &primitives).unwrap();

        assert_eq!(&mesh.colors[0..9], &[255, 0, 0, 255, 0, 0, 255, 0, 0]);
        assert_eq!(&mesh.colors[9..18], &[0, 0, 255, 0, 0, 255, 0, 0, 255]);
        assert_eq!(mesh.tree_indices, vec![7.0, 7.0, 7.0, 8.0, 8.0, 8.0]);
    }

    #[test]
    fn test_uncovered_vertices_stay_unpainted() {
        let mesh = paint_mesh(1, two_triangles(), &[primitive(1, 3, [9, 9, 9, 9], 1)]).unwrap();
        assert_eq!(&mesh.colors[9..], &[0; 9]);
        assert_eq!(&mesh.tree_indices[3..], &[0.0; 3]);
    }

    #[test]
    fn test_primitive_past_end_of_file_is_rejected() {
        let primitives = vec![primitive(1, 7, [0; 4], 2), primitive(1, 8, [0; 4], 1)];
        assert!(matches!(
            paint_mesh(1, two_triangles(), &primitives),
            Err(DecodeError::InvalidGeometry(_))
        ));
    }

    fn instance(tree_index: u32, triangle_offset: u32, triangle_count: u32, x: f32) -> InstancedMeshPrimitive {
        let mut instance_matrix = [0.0; 16];
        instance_matrix[12] = x;
        InstancedMeshPrimitive {
            file_id: 1,
            tree_index,
            color: [tree_index as u8, 0, 0, 255],
            triangle_offset,
            triangle_count,
            instance_matrix,
        }
    }

    #[test]
    fn test_instances_are_grouped_by_triangle_range() {
        let primitives = vec![
            instance(5, 1, 1, 10.0),
            instance(3, 0, 1, 20.0),
            instance(6, 1, 1, 30.0),
        ];
        let file = group_instances(1, two_triangles(), &primitives).unwrap();

        assert_eq!(file.file_id, 1);
        let offsets: Vec<u32> = file.instances.iter().map(|m| m.triangle_offset).collect();
        assert_eq!(offsets, vec![0, 1]);

        let shared = &file.instances[1];
        assert_eq!(shared.instance_count(), 2);
        assert_eq!(shared.tree_indices, vec![5.0, 6.0]);
        assert_eq!(shared.colors, vec![5, 0, 0, 255, 6, 0, 0, 255]);
        assert_eq!(shared.instance_matrices.len(), 32);
        assert_eq!((shared.instance_matrices[12], shared.instance_matrices[28]), (10.0, 30.0));
        assert_eq!(file.instances[0].tree_indices, vec![3.0]);
    }

    #[test]
    fn test_instances_share_the_file_geometry() {
        let geometry = two_triangles();
        let file = group_instances(1, geometry.clone(), &[instance(1, 0, 2, 0.0)]).unwrap();
        assert!(Arc::ptr_eq(&file.geometry, &geometry));
    }

    #[test]
    fn test_instance_past_end_of_file_is_rejected() {
        let err = group_instances(1, two_triangles(), &[instance(1, 1, 2, 0.0)]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidGeometry(_)));
        assert!(err.to_string().contains("ends at triangle 3"));
    }

    #[test]
    fn test_instances_disagreeing_on_length_are_rejected() {
        let primitives = vec![instance(1, 0, 1, 0.0), instance(2, 0, 2, 0.0)];
        assert!(matches!(
            group_instances(1, two_triangles(), &primitives),
            Err(DecodeError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_index_out_of_range_is_rejected() {
        let geometry = Arc::new(GeometryFile {
            indices: vec![0, 1, 5],
            vertices: vec![0.0; 9],
            normals: None,
        });
        let err = paint_mesh(4, geometry, &[primitive(4, 1, [0; 4], 1)]).unwrap_err();
        assert!(err.to_string().contains("index 5"));
    }
}
