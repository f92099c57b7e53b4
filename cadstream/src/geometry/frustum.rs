//! View frustum extraction and box intersection tests.
//!
//! Planes are extracted from a combined clip matrix with the Gribb/Hartmann
//! method. The near plane uses the OpenGL clip convention (`-w <= z <= w`),
//! which is conservative for zero-to-one depth projections: nothing inside
//! the true frustum is ever reported as outside.

use glam::{Mat4, Vec3, Vec4};

use super::Aabb;

/// A plane `normal · p + d = 0` with a unit-length normal pointing inwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    fn from_vec4(v: Vec4) -> Self {
        let normal = v.truncate();
        let length = normal.length();
        if length > f32::EPSILON {
            Self {
                normal: normal / length,
                d: v.w / length,
            }
        } else {
            Self { normal, d: v.w }
        }
    }

    /// Signed distance from the plane; positive on the inner side.
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }
}

/// Six-plane view frustum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    planes: [Plane; 6],
}

impl Frustum {
    /// Extract the frustum from a `projection × view × model` matrix.
    ///
    /// The resulting planes live in whatever space the matrix maps from, so
    /// passing a matrix that includes the model transformation yields a
    /// frustum in model space.
    pub fn from_matrix(clip: Mat4) -> Self {
        let r0 = clip.row(0);
        let r1 = clip.row(1);
        let r2 = clip.row(2);
        let r3 = clip.row(3);

        Self {
            planes: [
                Plane::from_vec4(r3 + r0), // left
                Plane::from_vec4(r3 - r0), // right
                Plane::from_vec4(r3 + r1), // bottom
                Plane::from_vec4(r3 - r1), // top
                Plane::from_vec4(r3 + r2), // near
                Plane::from_vec4(r3 - r2), // far
            ],
        }
    }

    /// The six planes (left, right, bottom, top, near, far).
    pub fn planes(&self) -> &[Plane; 6] {
        &self.planes
    }

    /// Returns false only if the box lies entirely outside one of the planes.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            // Corner furthest along the plane normal
            let positive = Vec3::select(plane.normal.cmpge(Vec3::ZERO), aabb.max, aabb.min);
            plane.signed_distance(positive) >= 0.0
        })
    }

    /// Returns true if the point is inside all six planes.
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.signed_distance(point) >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Camera at the origin looking down -Z.
    fn forward_frustum() -> Frustum {
        let projection = Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 0.1, 100.0);
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        Frustum::from_matrix(projection * view)
    }

    #[test]
    fn test_box_in_front_intersects() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -11.0), Vec3::new(1.0, 1.0, -9.0));
        assert!(forward_frustum().intersects_aabb(&aabb));
    }

    #[test]
    fn test_box_behind_is_culled() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, 9.0), Vec3::new(1.0, 1.0, 11.0));
        assert!(!forward_frustum().intersects_aabb(&aabb));
    }

    #[test]
    fn test_box_beyond_far_plane_is_culled() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -300.0), Vec3::new(1.0, 1.0, -200.0));
        assert!(!forward_frustum().intersects_aabb(&aabb));
    }

    #[test]
    fn test_box_far_to_the_side_is_culled() {
        let aabb = Aabb::new(Vec3::new(50.0, -1.0, -11.0), Vec3::new(52.0, 1.0, -9.0));
        assert!(!forward_frustum().intersects_aabb(&aabb));
    }

    #[test]
    fn test_box_straddling_plane_intersects() {
        // Crosses the left plane
        let aabb = Aabb::new(Vec3::new(-20.0, -1.0, -11.0), Vec3::new(0.0, 1.0, -9.0));
        assert!(forward_frustum().intersects_aabb(&aabb));
    }

    #[test]
    fn test_box_enclosing_camera_intersects() {
        let aabb = Aabb::new(Vec3::splat(-500.0), Vec3::splat(500.0));
        assert!(forward_frustum().intersects_aabb(&aabb));
    }

    #[test]
    fn test_contains_point() {
        let frustum = forward_frustum();
        assert!(frustum.contains_point(Vec3::new(0.0, 0.0, -5.0)));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, 5.0)));
    }

    #[test]
    fn test_model_matrix_moves_frustum_into_model_space() {
        let projection = Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 0.1, 100.0);
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        // Model space is shifted 1000 units along +X in world space
        let model = Mat4::from_translation(Vec3::new(1000.0, 0.0, 0.0));
        let frustum = Frustum::from_matrix(projection * view * model);

        let in_model_space = Aabb::new(
            Vec3::new(-1001.0, -1.0, -11.0),
            Vec3::new(-999.0, 1.0, -9.0),
        );
        assert!(frustum.intersects_aabb(&in_model_space));

        let untransformed = Aabb::new(Vec3::new(-1.0, -1.0, -11.0), Vec3::new(1.0, 1.0, -9.0));
        assert!(!frustum.intersects_aabb(&untransformed));
    }
}
