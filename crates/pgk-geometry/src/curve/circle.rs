//! Circle and circular arc curve.

use std::f64::consts::{FRAC_PI_2, TAU};

use pgk_core::{KernelError, Result};
use pgk_math::{any_orthogonal, CircleEquation, Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::{Curve, NurbsCurve};

/// A circle or arc in 3D space, parameterized by angle over
/// `[t_min, t_max]`.
///
/// `P(t) = center + radius * (cos(t) * x_axis + sin(t) * (normal x x_axis))`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point3,
    pub normal: Vector3,
    pub radius: f64,
    pub x_axis: Vector3,
    pub t_min: f64,
    pub t_max: f64,
}

impl Circle {
    /// Full circle with an arbitrary reference direction for `t = 0`.
    pub fn new(center: Point3, normal: Vector3, radius: f64) -> Self {
        let normal = normal.normalize();
        Self {
            center,
            normal,
            radius,
            x_axis: any_orthogonal(normal),
            t_min: 0.0,
            t_max: TAU,
        }
    }

    pub fn with_domain(mut self, t_min: f64, t_max: f64) -> Self {
        self.t_min = t_min;
        self.t_max = t_max;
        self
    }

    /// Arc starting at the equation's start point and sweeping its arc angle.
    pub fn from_equation(eq: &CircleEquation) -> Self {
        Self {
            center: eq.center,
            normal: eq.normal,
            radius: eq.radius,
            x_axis: eq.x_axis(),
            t_min: 0.0,
            t_max: eq.arc_angle,
        }
    }

    /// Arc from `p1` through `p2` to `p3`.
    pub fn by_three_points(p1: Point3, p2: Point3, p3: Point3) -> Result<Self> {
        CircleEquation::from_three_points(p1, p2, p3)
            .map(|eq| Self::from_equation(&eq))
            .ok_or_else(|| KernelError::Geometry("cannot fit a circle through collinear points".into()))
    }

    /// Arc from `start` to `end` leaving `start` along `tangent`.
    pub fn by_start_end_tangent(start: Point3, end: Point3, tangent: Vector3) -> Result<Self> {
        CircleEquation::from_start_end_tangent(start, end, tangent)
            .map(|eq| Self::from_equation(&eq))
            .ok_or_else(|| KernelError::Geometry("tangent is parallel to the chord".into()))
    }

    pub fn y_axis(&self) -> Vector3 {
        self.normal.cross(self.x_axis)
    }

    fn direction(&self, t: f64) -> Vector3 {
        t.cos() * self.x_axis + t.sin() * self.y_axis()
    }

    pub fn arc_angle(&self) -> f64 {
        self.t_max - self.t_min
    }
}

impl Curve for Circle {
    fn point_at(&self, t: f64) -> Point3 {
        self.center + self.radius * self.direction(t)
    }

    fn domain(&self) -> (f64, f64) {
        (self.t_min, self.t_max)
    }

    fn derivatives_at(&self, t: f64, n: usize) -> Vec<Vector3> {
        let mut result = Vec::with_capacity(n + 1);
        result.push(self.point_at(t));
        for k in 1..=n {
            result.push(self.radius * self.direction(t + k as f64 * FRAC_PI_2));
        }
        result
    }

    fn is_closed(&self) -> bool {
        (self.arc_angle().abs() - TAU).abs() < 1e-12
    }

    fn arc_length(&self, _resolution: usize) -> f64 {
        self.radius * self.arc_angle().abs()
    }

    /// Exact rational quadratic form, one Bezier piece per quarter turn.
    fn to_nurbs(&self) -> Result<NurbsCurve> {
        let sweep = self.arc_angle();
        if sweep.abs() < 1e-12 || self.radius <= 0.0 {
            return Err(KernelError::Geometry("degenerate arc".into()));
        }
        let n_arcs = (sweep.abs() / FRAC_PI_2 - 1e-9).ceil().max(1.0) as usize;
        let step = sweep / n_arcs as f64;
        let w = (0.5 * step).cos();

        let mut points = vec![self.point_at(self.t_min)];
        let mut weights = vec![1.0];
        for i in 0..n_arcs {
            let mid = self.t_min + (i as f64 + 0.5) * step;
            let end = self.t_min + (i + 1) as f64 * step;
            points.push(self.center + self.radius / w * self.direction(mid));
            weights.push(w);
            points.push(self.point_at(end));
            weights.push(1.0);
        }

        let mut knots = vec![self.t_min; 3];
        for i in 1..n_arcs {
            let k = self.t_min + (self.t_max - self.t_min) * i as f64 / n_arcs as f64;
            knots.push(k);
            knots.push(k);
        }
        knots.extend([self.t_max; 3]);
        NurbsCurve::new(2, knots, points, weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgk_math::{dvec3, linspace, DVec3};
    use std::f64::consts::PI;

    #[test]
    fn test_circle_radius() {
        let circle = Circle::new(dvec3(1.0, 2.0, 3.0), DVec3::Z, 5.0);
        for i in 0..16 {
            let t = i as f64 * TAU / 16.0;
            let p = circle.point_at(t);
            let dist = (p - circle.center).length();
            assert!((dist - 5.0).abs() < 1e-10, "Point at t={} not on circle: dist={}", t, dist);
            assert!((p.z - 3.0).abs() < 1e-10);
        }
        assert!(circle.is_closed());
    }

    #[test]
    fn test_analytic_derivatives() {
        let circle = Circle::new(DVec3::ZERO, DVec3::Z, 2.0);
        let d = circle.derivatives_at(0.7, 3);
        let numeric = super::super::numeric_derivatives(&circle, 0.7, 2, 1e-4);
        assert!((d[1] - numeric[1]).length() < 1e-6);
        assert!((d[2] - numeric[2]).length() < 1e-5);
        assert!((circle.curvature_at(0.7) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_three_points_arc() {
        let arc = Circle::by_three_points(dvec3(1.0, 0.0, 0.0), dvec3(0.0, 1.0, 0.0), dvec3(-1.0, 0.0, 0.0)).unwrap();
        assert!((arc.arc_angle() - PI).abs() < 1e-12);
        assert!((arc.point_at(arc.t_max) - dvec3(-1.0, 0.0, 0.0)).length() < 1e-12);
        assert!(Circle::by_three_points(DVec3::ZERO, DVec3::X, 2.0 * DVec3::X).is_err());
    }

    #[test]
    fn test_to_nurbs_is_exact() {
        for sweep in [0.5, FRAC_PI_2, 2.0, PI, 5.0, TAU] {
            let arc = Circle::new(dvec3(1.0, -1.0, 0.5), dvec3(1.0, 1.0, 1.0), 3.0).with_domain(0.3, 0.3 + sweep);
            let nurbs = arc.to_nurbs().unwrap();
            assert_eq!(nurbs.domain(), arc.domain());
            for t in linspace(0.3, 0.3 + sweep, 37) {
                let p = nurbs.point_at(t);
                assert!(((p - arc.center).length() - 3.0).abs() < 1e-10, "sweep {sweep}");
                assert!((p - arc.center).dot(arc.normal).abs() < 1e-10);
            }
            assert!((nurbs.point_at(0.3 + sweep) - arc.point_at(0.3 + sweep)).length() < 1e-10);
        }
    }
}
