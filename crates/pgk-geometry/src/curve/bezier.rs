//! Bezier curves, including segments built from boundary derivatives.

use pgk_core::{KernelError, Result};
use pgk_math::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::{Curve, NurbsCurve};

/// A polynomial Bezier curve over `[0, 1]`; degree is `control_points - 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BezierCurve {
    control_points: Vec<Point3>,
}

impl BezierCurve {
    pub fn new(control_points: Vec<Point3>) -> Result<Self> {
        if control_points.len() < 2 {
            return Err(KernelError::InvalidInput(
                "a Bezier curve needs at least two control points".into(),
            ));
        }
        Ok(Self { control_points })
    }

    /// Cubic segment from end points and end derivatives.
    pub fn from_tangents(p0: Point3, d0: Vector3, p1: Point3, d1: Vector3) -> Self {
        Self {
            control_points: vec![p0, p0 + d0 / 3.0, p1 - d1 / 3.0, p1],
        }
    }

    /// Quintic segment matching first and second derivatives at both ends.
    pub fn from_second_derivatives(
        p0: Point3,
        d0: Vector3,
        dd0: Vector3,
        p1: Point3,
        d1: Vector3,
        dd1: Vector3,
    ) -> Self {
        let a1 = p0 + d0 / 5.0;
        let a2 = dd0 / 20.0 + 2.0 * a1 - p0;
        let b1 = p1 - d1 / 5.0;
        let b2 = dd1 / 20.0 + 2.0 * b1 - p1;
        Self {
            control_points: vec![p0, a1, a2, b2, b1, p1],
        }
    }

    /// Septic segment matching derivatives up to the third at both ends.
    /// `start` and `end` hold the point followed by three derivatives.
    pub fn from_third_derivatives(start: [Vector3; 4], end: [Vector3; 4]) -> Self {
        let [p0, d0, dd0, ddd0] = start;
        let [p1, d1, dd1, ddd1] = end;
        let a1 = p0 + d0 / 7.0;
        let a2 = dd0 / 42.0 + 2.0 * a1 - p0;
        let a3 = ddd0 / 210.0 + 3.0 * a2 - 3.0 * a1 + p0;
        let b1 = p1 - d1 / 7.0;
        let b2 = dd1 / 42.0 + 2.0 * b1 - p1;
        let b3 = p1 - 3.0 * b1 + 3.0 * b2 - ddd1 / 210.0;
        Self {
            control_points: vec![p0, a1, a2, a3, b3, b2, b1, p1],
        }
    }

    pub fn degree(&self) -> usize {
        self.control_points.len() - 1
    }

    pub fn control_points(&self) -> &[Point3] {
        &self.control_points
    }

    /// Forward differences of a control polygon.
    fn differences(points: &[Point3]) -> Vec<Point3> {
        points.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

/// De Casteljau evaluation.
fn de_casteljau(points: &[Point3], t: f64) -> Point3 {
    let mut work = points.to_vec();
    let n = work.len();
    for level in 1..n {
        for i in 0..n - level {
            work[i] = work[i].lerp(work[i + 1], t);
        }
    }
    work[0]
}

impl Curve for BezierCurve {
    fn point_at(&self, t: f64) -> Point3 {
        de_casteljau(&self.control_points, t)
    }

    fn domain(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    fn derivatives_at(&self, t: f64, n: usize) -> Vec<Vector3> {
        let mut result = vec![Vector3::ZERO; n + 1];
        result[0] = self.point_at(t);
        let mut points = self.control_points.clone();
        let mut factor = 1.0;
        for slot in result.iter_mut().skip(1) {
            if points.len() < 2 {
                break;
            }
            factor *= (points.len() - 1) as f64;
            points = Self::differences(&points);
            *slot = factor * de_casteljau(&points, t);
        }
        result
    }

    fn to_nurbs(&self) -> Result<NurbsCurve> {
        let p = self.degree();
        let mut knots = vec![0.0; p + 1];
        knots.extend(vec![1.0; p + 1]);
        NurbsCurve::bspline(p, knots, self.control_points.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgk_math::dvec3;

    #[test]
    fn test_cubic_from_tangents() {
        let c = BezierCurve::from_tangents(
            dvec3(0.0, 0.0, 0.0),
            dvec3(3.0, 0.0, 0.0),
            dvec3(1.0, 1.0, 0.0),
            dvec3(0.0, 3.0, 0.0),
        );
        let d0 = c.derivatives_at(0.0, 1);
        let d1 = c.derivatives_at(1.0, 1);
        assert!((d0[1] - dvec3(3.0, 0.0, 0.0)).length() < 1e-12);
        assert!((d1[1] - dvec3(0.0, 3.0, 0.0)).length() < 1e-12);
        assert!((d1[0] - dvec3(1.0, 1.0, 0.0)).length() < 1e-12);
    }

    #[test]
    fn test_quintic_second_derivatives() {
        let (p0, d0, dd0) = (dvec3(0.0, 0.0, 0.0), dvec3(1.0, 2.0, 0.0), dvec3(0.0, -4.0, 1.0));
        let (p1, d1, dd1) = (dvec3(3.0, 0.0, 1.0), dvec3(2.0, 0.0, 0.0), dvec3(1.0, 1.0, 1.0));
        let c = BezierCurve::from_second_derivatives(p0, d0, dd0, p1, d1, dd1);
        assert_eq!(c.degree(), 5);
        let s = c.derivatives_at(0.0, 2);
        let e = c.derivatives_at(1.0, 2);
        assert!((s[1] - d0).length() < 1e-12 && (s[2] - dd0).length() < 1e-12);
        assert!((e[1] - d1).length() < 1e-12 && (e[2] - dd1).length() < 1e-12);
    }

    #[test]
    fn test_septic_third_derivatives() {
        let start = [dvec3(0.0, 0.0, 0.0), dvec3(1.0, 0.0, 0.0), dvec3(0.0, 1.0, 0.0), dvec3(0.0, 0.0, 6.0)];
        let end = [dvec3(2.0, 1.0, 0.0), dvec3(0.0, 1.0, 0.0), dvec3(-1.0, 0.0, 0.0), dvec3(1.0, 2.0, 3.0)];
        let c = BezierCurve::from_third_derivatives(start, end);
        assert_eq!(c.degree(), 7);
        let s = c.derivatives_at(0.0, 3);
        let e = c.derivatives_at(1.0, 3);
        for k in 0..4 {
            assert!((s[k] - start[k]).length() < 1e-9, "start derivative {k}");
            assert!((e[k] - end[k]).length() < 1e-9, "end derivative {k}");
        }
    }

    #[test]
    fn test_to_nurbs_matches() {
        let c = BezierCurve::new(vec![dvec3(0.0, 0.0, 0.0), dvec3(1.0, 2.0, 0.0), dvec3(2.0, 0.0, 1.0)]).unwrap();
        let n = c.to_nurbs().unwrap();
        for i in 0..=10 {
            let t = i as f64 / 10.0;
            assert!((n.point_at(t) - c.point_at(t)).length() < 1e-12);
            assert!((n.tangent_at(t) - c.tangent_at(t)).length() < 1e-12);
        }
        assert!(BezierCurve::new(vec![dvec3(0.0, 0.0, 0.0)]).is_err());
    }
}
