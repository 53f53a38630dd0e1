//! Analytic circle equation used by arc construction and tangent solvers.

use crate::{Plane, Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// A circle (or arc) in 3D: centre, radius, plane normal, start point and
/// swept angle. Angles are measured from `start` counter-clockwise around
/// `normal`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CircleEquation {
    pub center: Point3,
    pub radius: f64,
    pub normal: Vector3,
    pub start: Point3,
    pub arc_angle: f64,
}

impl CircleEquation {
    /// Full circle with `start` on the local X axis `x_axis`.
    pub fn new(center: Point3, radius: f64, normal: Vector3, x_axis: Vector3) -> Self {
        let normal = normal.normalize();
        let x = (x_axis - normal * x_axis.dot(normal)).normalize();
        Self {
            center,
            radius,
            normal,
            start: center + x * radius,
            arc_angle: TAU,
        }
    }

    /// Circle through three points; the arc runs from `p1` through `p2` to `p3`.
    /// `None` for collinear points.
    pub fn from_three_points(p1: Point3, p2: Point3, p3: Point3) -> Option<Self> {
        let u = p2 - p1;
        let v = p3 - p1;
        let w = u.cross(v);
        let w2 = w.length_squared();
        if w2 < 1e-24 {
            return None;
        }
        let center = p1 + (v.cross(w) * u.length_squared() + w.cross(u) * v.length_squared()) / (2.0 * w2);
        let normal = w.normalize();
        let radius = (p1 - center).length();
        let arc_angle = positive_angle(p1 - center, p3 - center, normal);
        Some(Self {
            center,
            radius,
            normal,
            start: p1,
            arc_angle,
        })
    }

    /// Arc starting at `start` with tangent direction `tangent` and ending at
    /// `end`. `None` if the tangent is parallel to the chord.
    pub fn from_start_end_tangent(start: Point3, end: Point3, tangent: Vector3) -> Option<Self> {
        let diff = end - start;
        let normal = tangent.cross(diff);
        if normal.length_squared() < 1e-24 || diff.length_squared() < 1e-24 {
            return None;
        }
        let normal = normal.normalize();
        let to_center = normal.cross(tangent.normalize());
        let radius = diff.length_squared() / (2.0 * to_center.dot(diff));
        let center = start + to_center * radius;
        let arc_angle = positive_angle(start - center, end - center, normal);
        Some(Self {
            center,
            radius: radius.abs(),
            normal,
            start,
            arc_angle,
        })
    }

    /// Osculating circle at `point` from the first and second derivatives.
    /// `None` where the curvature vanishes.
    pub fn from_two_derivatives(point: Point3, d1: Vector3, d2: Vector3) -> Option<Self> {
        let cross = d1.cross(d2);
        let cross_len = cross.length();
        if cross_len < 1e-12 {
            return None;
        }
        let speed = d1.length();
        let radius = speed.powi(3) / cross_len;
        let inward = cross.cross(d1).normalize();
        let center = point + inward * radius;
        Some(Self {
            center,
            radius,
            normal: cross / cross_len,
            start: point,
            arc_angle: TAU,
        })
    }

    pub fn plane(&self) -> Plane {
        Plane::new(self.center, self.normal)
    }

    /// Unit vector from the centre to the start point.
    pub fn x_axis(&self) -> Vector3 {
        (self.start - self.center).normalize()
    }

    pub fn y_axis(&self) -> Vector3 {
        self.normal.cross(self.x_axis())
    }

    pub fn point_at_angle(&self, theta: f64) -> Point3 {
        let vx = self.start - self.center;
        let vy = self.normal.cross(vx);
        self.center + vx * theta.cos() + vy * theta.sin()
    }

    /// Derivative of `point_at_angle` with respect to the angle.
    pub fn derivative_at_angle(&self, theta: f64) -> Vector3 {
        let vx = self.start - self.center;
        let vy = self.normal.cross(vx);
        vy * theta.cos() - vx * theta.sin()
    }

    pub fn end(&self) -> Point3 {
        self.point_at_angle(self.arc_angle)
    }

    pub fn arc_length(&self) -> f64 {
        self.radius * self.arc_angle.abs()
    }
}

/// Angle from `a` to `b` around `axis`, in `[0, TAU)`.
fn positive_angle(a: Vector3, b: Vector3, axis: Vector3) -> f64 {
    let angle = crate::signed_angle(a, b, axis);
    if angle < 0.0 {
        angle + TAU
    } else {
        angle
    }
}
