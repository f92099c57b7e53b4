//! Spatial primitives shared by the sector model and the classifier.
//!
//! All math goes through `glam`. Sector bounds and frustum planes are kept in
//! model space; the camera is moved into model space once per update instead
//! of transforming every sector box.

mod aabb;
mod camera;
mod frustum;

pub use aabb::Aabb;
pub use camera::CameraState;
pub use frustum::{Frustum, Plane};
