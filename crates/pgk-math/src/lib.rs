//! PGK math primitives: vector aliases and analytic value types.

pub mod aabb;
pub mod circle;
pub mod line;
pub mod plane;
pub mod ray;
pub mod transform;

pub use glam::{dvec3, DMat3, DMat4, DQuat, DVec2, DVec3, DVec4};
pub use aabb::Aabb3;
pub use circle::CircleEquation;
pub use line::Line;
pub use plane::Plane;
pub use ray::Ray;
pub use transform::Transform;

pub type Point2 = DVec2;
pub type Point3 = DVec3;
pub type Vector2 = DVec2;
pub type Vector3 = DVec3;
/// Homogeneous (weighted) point `(w*x, w*y, w*z, w)`.
pub type HPoint = DVec4;

/// Unit vector orthogonal to `v` (`v` need not be normalized).
pub fn any_orthogonal(v: Vector3) -> Vector3 {
    let v = v.normalize_or_zero();
    let reference = if v.x.abs() < 0.9 { DVec3::X } else { DVec3::Y };
    v.cross(reference).normalize()
}

/// Signed angle from `a` to `b` around `axis`, in `(-PI, PI]`.
///
/// Computed as `acos` of the normalized projection, with the sign taken from
/// the orientation of `a x b` relative to `axis`.
pub fn signed_angle(a: Vector3, b: Vector3, axis: Vector3) -> f64 {
    let (a, b) = (a.normalize(), b.normalize());
    let cos = a.dot(b).clamp(-1.0, 1.0);
    let angle = cos.acos();
    if a.cross(b).dot(axis) < 0.0 {
        -angle
    } else {
        angle
    }
}

/// Evenly spaced values from `start` to `end` inclusive (numpy `linspace`).
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            let mut values: Vec<f64> = (0..count).map(|i| start + step * i as f64).collect();
            values[count - 1] = end;
            values
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_signed_angle() {
        let a = signed_angle(DVec3::X, DVec3::Y, DVec3::Z);
        assert!((a - FRAC_PI_2).abs() < 1e-12);
        let b = signed_angle(DVec3::Y, DVec3::X, DVec3::Z);
        assert!((b + FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_linspace_endpoints() {
        let ts = linspace(0.0, 1.0, 11);
        assert_eq!(ts.len(), 11);
        assert_eq!(ts[0], 0.0);
        assert_eq!(ts[10], 1.0);
        approx::assert_relative_eq!(ts[3], 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_any_orthogonal() {
        for v in [DVec3::X, DVec3::Y, DVec3::Z, dvec3(1.0, 2.0, 3.0)] {
            let o = any_orthogonal(v);
            assert!(o.dot(v).abs() < 1e-12);
            assert!((o.length() - 1.0).abs() < 1e-12);
        }
    }
}
