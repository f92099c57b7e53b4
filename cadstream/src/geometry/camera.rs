//! Camera state snapshot consumed by the quality classifier.

use glam::{Mat4, Vec3};

use super::Frustum;

/// Immutable snapshot of the view camera in world space.
///
/// `world_matrix` is the camera's own transform (camera → world), i.e. the
/// inverse of the view matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    /// Camera position in world space.
    pub position: Vec3,
    /// Projection matrix.
    pub projection: Mat4,
    /// Camera-to-world transform.
    pub world_matrix: Mat4,
}

impl CameraState {
    /// Create a camera snapshot from its parts.
    pub fn new(position: Vec3, projection: Mat4, world_matrix: Mat4) -> Self {
        Self {
            position,
            projection,
            world_matrix,
        }
    }

    /// Perspective camera at `eye` looking at `target` (right-handed, Y up).
    pub fn look_at(eye: Vec3, target: Vec3, fov_y_radians: f32, aspect: f32, near: f32, far: f32) -> Self {
        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        Self {
            position: eye,
            projection: Mat4::perspective_rh_gl(fov_y_radians, aspect, near, far),
            world_matrix: view.inverse(),
        }
    }

    /// World-to-camera (view) matrix.
    pub fn view_matrix(&self) -> Mat4 {
        self.world_matrix.inverse()
    }

    /// Frustum in model space for the given model transformation.
    pub fn model_frustum(&self, model_matrix: &Mat4) -> Frustum {
        Frustum::from_matrix(self.projection * self.view_matrix() * *model_matrix)
    }

    /// Camera position expressed in model space.
    pub fn model_position(&self, model_matrix: &Mat4) -> Vec3 {
        model_matrix.inverse().transform_point3(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_look_at_world_matrix_places_camera() {
        let camera = CameraState::look_at(
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::ZERO,
            60f32.to_radians(),
            1.0,
            0.1,
            100.0,
        );
        let origin = camera.world_matrix.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(0.0, 0.0, 10.0)).length() < 1e-5);
    }

    #[test]
    fn test_model_position_applies_inverse_transform() {
        let camera = CameraState::look_at(Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO, 1.0, 1.0, 0.1, 100.0);
        let model = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0));
        let p = camera.model_position(&model);
        assert!(p.length() < 1e-5);
    }

    #[test]
    fn test_model_frustum_sees_origin() {
        let camera = CameraState::look_at(
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::ZERO,
            60f32.to_radians(),
            1.0,
            0.1,
            100.0,
        );
        let frustum = camera.model_frustum(&Mat4::IDENTITY);
        assert!(frustum.contains_point(Vec3::ZERO));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, 20.0)));
    }
}
