//! Point types and related functionality

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A surface vertex: world-space position with an optional unit normal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Point3f,
    pub normal: Option<Vector3f>,
}

impl Vertex {
    /// Vertex without a normal
    pub fn new(position: Point3f) -> Self {
        Self { position, normal: None }
    }

    /// Vertex carrying a normal
    pub fn with_normal(position: Point3f, normal: Vector3f) -> Self {
        Self {
            position,
            normal: Some(normal),
        }
    }
}

impl Default for Vertex {
    fn default() -> Self {
        Self::new(Point3f::origin())
    }
}

/// Squared-distance comparison used by the surface equivalence check
pub fn points_approx_equal(a: &Point3f, b: &Point3f, epsilon: f32) -> bool {
    (a - b).norm_squared() < epsilon
}
