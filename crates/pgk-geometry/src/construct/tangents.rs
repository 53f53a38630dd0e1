//! Tangent lines between points and circles.

use std::f64::consts::TAU;

use pgk_core::{KernelError, Result};
use pgk_math::{signed_angle, Point3, Vector3};

use crate::curve::{Circle, Line};

/// Tangents from a point to a circle.
#[derive(Debug, Clone)]
pub struct PointCircleTangents {
    /// Tangent points on the circle.
    pub points: [Point3; 2],
    /// Segments from the point to each tangent point.
    pub lines: [Line; 2],
    /// Arc from `points[0]` to `points[1]` on the far side of the circle.
    pub arc: Circle,
}

/// Common tangents of two circles.
#[derive(Debug, Clone)]
pub struct CircleTangents {
    /// Segments from the first circle to the second.
    pub lines: [Line; 2],
    /// Arc on the first circle between the tangent points, away from the
    /// second circle.
    pub arc1: Circle,
    /// Arc on the second circle between the tangent points, away from the
    /// first circle.
    pub arc2: Circle,
}

/// Tangent lines from `point` to `circle`, which must share its plane.
pub fn point_circle_tangents(point: Point3, circle: &Circle, planar_tolerance: f64) -> Result<PointCircleTangents> {
    let n = circle.normal.normalize();
    let to_point = point - circle.center;
    let deviation = n.dot(to_point).abs();
    if deviation > planar_tolerance {
        return Err(KernelError::Coplanarity {
            message: "point does not lie in the circle plane".into(),
            deviation,
            tolerance: planar_tolerance,
        });
    }
    let d = to_point.length();
    if d <= circle.radius {
        return Err(KernelError::NoSolution(format!(
            "point at distance {d} is inside the circle of radius {}",
            circle.radius
        )));
    }
    let u = to_point / d;
    let v = n.cross(u);
    let alpha = (circle.radius / d).acos();
    let at = |angle: f64| circle.center + circle.radius * (angle.cos() * u + angle.sin() * v);
    let points = [at(alpha), at(-alpha)];
    let arc = arc_between(circle.center, n, circle.radius, points[0], points[1]);
    Ok(PointCircleTangents {
        points,
        lines: [Line::new(point, points[0]), Line::new(point, points[1])],
        arc,
    })
}

/// Outer tangents of two coplanar circles; needs `|r1 - r2| < d`.
pub fn two_circle_outer_tangents(first: &Circle, second: &Circle, planar_tolerance: f64) -> Result<CircleTangents> {
    let (n, u, v, d) = circle_pair_frame(first, second, planar_tolerance)?;
    let (r1, r2) = (first.radius, second.radius);
    if (r1 - r2).abs() >= d {
        return Err(KernelError::NoSolution(format!(
            "one circle contains the other (|{r1} - {r2}| >= {d})"
        )));
    }
    let phi = ((r1 - r2) / d).acos();
    let dir = |angle: f64| angle.cos() * u + angle.sin() * v;
    let a = [first.center + r1 * dir(phi), first.center + r1 * dir(-phi)];
    let b = [second.center + r2 * dir(phi), second.center + r2 * dir(-phi)];
    Ok(CircleTangents {
        lines: [Line::new(a[0], b[0]), Line::new(a[1], b[1])],
        arc1: arc_between(first.center, n, r1, a[0], a[1]),
        arc2: arc_between(second.center, n, r2, b[1], b[0]),
    })
}

/// Inner (crossing) tangents of two coplanar circles; needs `r1 + r2 < d`.
pub fn two_circle_inner_tangents(first: &Circle, second: &Circle, planar_tolerance: f64) -> Result<CircleTangents> {
    let (n, u, v, d) = circle_pair_frame(first, second, planar_tolerance)?;
    let (r1, r2) = (first.radius, second.radius);
    if r1 + r2 >= d {
        return Err(KernelError::NoSolution(format!("circles overlap ({r1} + {r2} >= {d})")));
    }
    let phi = ((r1 + r2) / d).acos();
    let dir = |angle: f64| angle.cos() * u + angle.sin() * v;
    let a = [first.center + r1 * dir(phi), first.center + r1 * dir(-phi)];
    let b = [second.center - r2 * dir(phi), second.center - r2 * dir(-phi)];
    Ok(CircleTangents {
        lines: [Line::new(a[0], b[0]), Line::new(a[1], b[1])],
        arc1: arc_between(first.center, n, r1, a[0], a[1]),
        arc2: arc_between(second.center, n, r2, b[0], b[1]),
    })
}

/// Plane normal, unit center direction, in-plane perpendicular and center
/// distance, after checking the circles share a plane.
fn circle_pair_frame(first: &Circle, second: &Circle, planar_tolerance: f64) -> Result<(Vector3, Vector3, Vector3, f64)> {
    let n = first.normal.normalize();
    let skew = n.cross(second.normal.normalize()).length();
    if skew > planar_tolerance {
        return Err(KernelError::Coplanarity {
            message: "circle normals are not parallel".into(),
            deviation: skew,
            tolerance: planar_tolerance,
        });
    }
    let offset = second.center - first.center;
    let d = offset.length();
    if d < f64::EPSILON {
        return Err(KernelError::NoSolution("circles are concentric".into()));
    }
    let u = offset / d;
    let deviation = n.dot(offset).abs();
    if deviation > planar_tolerance {
        return Err(KernelError::Coplanarity {
            message: "circle centers do not share a plane".into(),
            deviation,
            tolerance: planar_tolerance,
        });
    }
    Ok((n, u, n.cross(u), d))
}

/// Counter-clockwise arc about `normal` from `from` to `to`.
fn arc_between(center: Point3, normal: Vector3, radius: f64, from: Point3, to: Point3) -> Circle {
    let x_axis = (from - center).normalize();
    let sweep = signed_angle(from - center, to - center, normal).rem_euclid(TAU);
    Circle {
        center,
        normal,
        radius,
        x_axis,
        t_min: 0.0,
        t_max: sweep,
    }
}
