use crate::{Point3, Transform, Vector3};
use serde::{Deserialize, Serialize};

/// Half-line `origin + s * direction`, `s >= 0`, with `direction` of unit length.
///
/// Distances reported by raycasts are values of `s`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    pub origin: Point3,
    pub direction: Vector3,
}

impl Ray {
    pub fn new(origin: Point3, direction: Vector3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Ray from `from` aimed at `towards`.
    pub fn through(from: Point3, towards: Point3) -> Self {
        Self::new(from, towards - from)
    }

    pub fn at(&self, s: f64) -> Point3 {
        self.origin + self.direction * s
    }

    /// Signed distance of the projection of `point` onto the supporting line.
    pub fn parameter_of(&self, point: Point3) -> f64 {
        (point - self.origin).dot(self.direction)
    }

    /// Distance from `point` to the supporting line, ignoring which side of
    /// the origin it projects to.
    pub fn offset_of(&self, point: Point3) -> f64 {
        (point - self.origin).reject_from_normalized(self.direction).length()
    }

    pub fn transformed(&self, transform: &Transform) -> Self {
        Self::new(
            transform.transform_point(self.origin),
            transform.transform_vector(self.direction),
        )
    }
}
