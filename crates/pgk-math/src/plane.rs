use crate::{Line, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A plane in 3D space defined by a point and normal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Plane {
    pub origin: Point3,
    pub normal: Vector3,
}

impl Plane {
    pub fn new(origin: Point3, normal: Vector3) -> Self {
        Self {
            origin,
            normal: normal.normalize(),
        }
    }

    pub fn xy() -> Self {
        Self::new(Point3::ZERO, Vector3::Z)
    }

    pub fn xz() -> Self {
        Self::new(Point3::ZERO, Vector3::Y)
    }

    pub fn yz() -> Self {
        Self::new(Point3::ZERO, Vector3::X)
    }

    /// Plane through three points; `None` if they are collinear.
    pub fn from_three_points(p1: Point3, p2: Point3, p3: Point3) -> Option<Self> {
        let normal = (p2 - p1).cross(p3 - p1);
        if normal.length_squared() < 1e-24 {
            return None;
        }
        Some(Self::new(p1, normal))
    }

    /// Plane through `point` spanned by `v1` and `v2`.
    pub fn from_point_and_two_vectors(point: Point3, v1: Vector3, v2: Vector3) -> Option<Self> {
        let normal = v1.cross(v2);
        if normal.length_squared() < 1e-24 {
            return None;
        }
        Some(Self::new(point, normal))
    }

    /// Signed distance from a point to this plane.
    pub fn signed_distance(&self, point: Point3) -> f64 {
        (point - self.origin).dot(self.normal)
    }

    /// Side of the plane the point lies on: `1`, `-1`, or `0` within `eps`.
    pub fn side_of_point(&self, point: Point3, eps: f64) -> i8 {
        let d = self.signed_distance(point);
        if d > eps {
            1
        } else if d < -eps {
            -1
        } else {
            0
        }
    }

    /// Project a point onto this plane.
    pub fn project_point(&self, point: Point3) -> Point3 {
        point - self.normal * self.signed_distance(point)
    }

    /// Component of `v` lying in the plane.
    pub fn project_vector(&self, v: Vector3) -> Vector3 {
        v - self.normal * v.dot(self.normal)
    }

    /// Intersection point with a line; `None` if the line is parallel.
    pub fn intersect_line(&self, line: &Line) -> Option<Point3> {
        let denom = line.direction.dot(self.normal);
        if denom.abs() < 1e-12 {
            return None;
        }
        let s = (self.origin - line.point).dot(self.normal) / denom;
        Some(line.point + line.direction * s)
    }

    /// Intersection line with another plane; `None` if the planes are parallel.
    pub fn intersect_plane(&self, other: &Plane) -> Option<Line> {
        let direction = self.normal.cross(other.normal);
        let det = direction.length_squared();
        if det < 1e-24 {
            return None;
        }
        let d1 = self.normal.dot(self.origin);
        let d2 = other.normal.dot(other.origin);
        let point = (other.normal * d1 - self.normal * d2).cross(direction) / det;
        Some(Line::new(point, direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::dvec3;

    #[test]
    fn test_signed_distance() {
        let plane = Plane::xy();
        assert!((plane.signed_distance(dvec3(0.0, 0.0, 5.0)) - 5.0).abs() < 1e-10);
        assert!((plane.signed_distance(dvec3(0.0, 0.0, -3.0)) + 3.0).abs() < 1e-10);
        assert_eq!(plane.side_of_point(dvec3(1.0, 1.0, 1e-12), 1e-9), 0);
    }

    #[test]
    fn test_project_point() {
        let plane = Plane::xy();
        let projected = plane.project_point(dvec3(1.0, 2.0, 5.0));
        assert!((projected - dvec3(1.0, 2.0, 0.0)).length() < 1e-10);
    }

    #[test]
    fn test_intersect_line() {
        let plane = Plane::new(dvec3(0.0, 0.0, 1.0), dvec3(0.0, 0.0, 2.0));
        let line = Line::from_two_points(dvec3(0.0, 0.0, 0.0), dvec3(1.0, 1.0, 2.0));
        let p = plane.intersect_line(&line).unwrap();
        assert!((p - dvec3(0.5, 0.5, 1.0)).length() < 1e-12);
        let parallel = Line::new(dvec3(0.0, 0.0, 0.0), dvec3(1.0, 0.0, 0.0));
        assert!(plane.intersect_line(&parallel).is_none());
    }

    #[test]
    fn test_intersect_plane() {
        let line = Plane::xy().intersect_plane(&Plane::xz()).unwrap();
        assert!(line.direction.normalize().cross(dvec3(1.0, 0.0, 0.0)).length() < 1e-12);
        assert!(line.distance_to_point(dvec3(5.0, 0.0, 0.0)) < 1e-12);
    }
}
