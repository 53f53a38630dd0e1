use crate::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// An infinite line defined by a point and a direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Line {
    pub point: Point3,
    pub direction: Vector3,
}

impl Line {
    pub fn new(point: Point3, direction: Vector3) -> Self {
        Self { point, direction }
    }

    pub fn from_two_points(p1: Point3, p2: Point3) -> Self {
        Self::new(p1, p2 - p1)
    }

    pub fn at(&self, s: f64) -> Point3 {
        self.point + self.direction * s
    }

    pub fn projection_of_point(&self, point: Point3) -> Point3 {
        let d = self.direction;
        let s = (point - self.point).dot(d) / d.length_squared();
        self.at(s)
    }

    pub fn distance_to_point(&self, point: Point3) -> f64 {
        (point - self.projection_of_point(point)).length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::dvec3;

    #[test]
    fn test_projection() {
        let line = Line::from_two_points(dvec3(0.0, 0.0, 0.0), dvec3(2.0, 0.0, 0.0));
        let p = line.projection_of_point(dvec3(1.0, 3.0, 0.0));
        assert!((p - dvec3(1.0, 0.0, 0.0)).length() < 1e-12);
        assert!((line.distance_to_point(dvec3(1.0, 3.0, 4.0)) - 5.0).abs() < 1e-12);
    }
}
