//! Axis-aligned bounding boxes in model space.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box given by its minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Create a bounding box from its corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Returns true if `min <= max` on every axis.
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    /// Center point of the box.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Edge lengths of the box.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns true if the point lies inside or on the boundary.
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Euclidean distance from `point` to the closest point of the box.
    ///
    /// Zero when the point is inside the box.
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        let closest = point.clamp(self.min, self.max);
        closest.distance(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::ZERO, Vec3::ONE)
    }

    #[test]
    fn test_center_and_size() {
        let aabb = Aabb::new(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(1.0, 4.0, 6.0));
        assert_eq!(aabb.center(), Vec3::new(0.0, 2.0, 4.0));
        assert_eq!(aabb.size(), Vec3::new(2.0, 4.0, 4.0));
    }

    #[test]
    fn test_is_valid() {
        assert!(unit_box().is_valid());
        assert!(!Aabb::new(Vec3::ONE, Vec3::ZERO).is_valid());
    }

    #[test]
    fn test_distance_inside_is_zero() {
        assert_eq!(unit_box().distance_to_point(Vec3::splat(0.5)), 0.0);
        assert!(unit_box().contains_point(Vec3::splat(0.5)));
    }

    #[test]
    fn test_distance_along_axis() {
        let d = unit_box().distance_to_point(Vec3::new(3.0, 0.5, 0.5));
        assert!((d - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_to_corner() {
        let d = unit_box().distance_to_point(Vec3::new(2.0, 2.0, 1.0));
        assert!((d - 2.0_f32.sqrt()).abs() < 1e-6);
    }
}
