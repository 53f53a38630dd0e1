//! Natural cubic spline through points.

use pgk_core::{KernelError, Result, Tolerance};
use pgk_math::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::{Curve, NurbsCurve};
use crate::construct::ParamMetric;

/// C2 piecewise cubic through `points` with zero second derivative at both
/// ends, parametrized over `[0, 1]` by the chosen metric.
///
/// Derivatives use the numeric fallback of [`Curve`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CubicSpline {
    points: Vec<Point3>,
    params: Vec<f64>,
    /// Second derivatives at the points.
    moments: Vec<Vector3>,
}

impl CubicSpline {
    pub fn new(points: Vec<Point3>, metric: ParamMetric) -> Result<Self> {
        let params = metric.parameters(&points)?;
        Self::with_parameters(points, params)
    }

    pub fn with_parameters(points: Vec<Point3>, params: Vec<f64>) -> Result<Self> {
        if points.len() != params.len() || points.len() < 2 {
            return Err(KernelError::InvalidInput(format!(
                "{} points with {} parameters",
                points.len(),
                params.len()
            )));
        }
        if params.windows(2).any(|w| w[1] <= w[0]) {
            return Err(KernelError::InvalidInput(
                "spline parameters must be strictly increasing".into(),
            ));
        }
        let moments = natural_moments(&points, &params);
        Ok(Self {
            points,
            params,
            moments,
        })
    }

    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    fn segment(&self, t: f64) -> usize {
        let last = self.params.len() - 2;
        self.params.partition_point(|&p| p <= t).saturating_sub(1).min(last)
    }

    /// Exact first derivatives at both ends of segment `i`.
    fn end_derivatives(&self, i: usize) -> (Vector3, Vector3) {
        let h = self.params[i + 1] - self.params[i];
        let chord = (self.points[i + 1] - self.points[i]) / h;
        let (m0, m1) = (self.moments[i], self.moments[i + 1]);
        (chord - h * (2.0 * m0 + m1) / 6.0, chord + h * (m0 + 2.0 * m1) / 6.0)
    }
}

/// Solve the tridiagonal system for the second derivatives (Thomas
/// algorithm).
fn natural_moments(points: &[Point3], params: &[f64]) -> Vec<Vector3> {
    let n = points.len();
    let mut moments = vec![Vector3::ZERO; n];
    if n < 3 {
        return moments;
    }
    let h: Vec<f64> = params.windows(2).map(|w| w[1] - w[0]).collect();
    let m = n - 2;
    let mut diag = vec![0.0; m];
    let mut rhs = vec![Vector3::ZERO; m];
    for k in 0..m {
        let i = k + 1;
        diag[k] = 2.0 * (h[i - 1] + h[i]);
        rhs[k] = 6.0 * ((points[i + 1] - points[i]) / h[i] - (points[i] - points[i - 1]) / h[i - 1]);
    }
    for k in 1..m {
        let factor = h[k] / diag[k - 1];
        diag[k] -= factor * h[k];
        let prev = rhs[k - 1];
        rhs[k] -= factor * prev;
    }
    moments[m] = rhs[m - 1] / diag[m - 1];
    for k in (0..m - 1).rev() {
        moments[k + 1] = (rhs[k] - h[k + 1] * moments[k + 2]) / diag[k];
    }
    moments
}

impl Curve for CubicSpline {
    fn point_at(&self, t: f64) -> Point3 {
        let i = self.segment(t);
        let (t0, t1) = (self.params[i], self.params[i + 1]);
        let h = t1 - t0;
        let (a, b) = (t1 - t, t - t0);
        let (m0, m1) = (self.moments[i], self.moments[i + 1]);
        m0 * (a * a * a) / (6.0 * h)
            + m1 * (b * b * b) / (6.0 * h)
            + (self.points[i] - m0 * (h * h / 6.0)) * (a / h)
            + (self.points[i + 1] - m1 * (h * h / 6.0)) * (b / h)
    }

    fn domain(&self) -> (f64, f64) {
        (self.params[0], self.params[self.params.len() - 1])
    }

    /// Each span is converted to a cubic Bezier piece; the C0 knots between
    /// them are then removed, leaving the C2 cubic B-spline.
    fn to_nurbs(&self) -> Result<NurbsCurve> {
        let n_segments = self.points.len() - 1;
        let mut control_points = vec![self.points[0]];
        let mut knots = vec![self.params[0]; 4];
        for i in 0..n_segments {
            let h = self.params[i + 1] - self.params[i];
            let (d0, d1) = self.end_derivatives(i);
            control_points.push(self.points[i] + d0 * (h / 3.0));
            control_points.push(self.points[i + 1] - d1 * (h / 3.0));
            control_points.push(self.points[i + 1]);
            let copies = if i + 1 == n_segments { 4 } else { 3 };
            knots.extend(std::iter::repeat(self.params[i + 1]).take(copies));
        }
        NurbsCurve::bspline(3, knots, control_points)?.remove_excessive_knots(Tolerance::DEFAULT_LINEAR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgk_math::{dvec3, linspace};

    fn sample_points() -> Vec<Point3> {
        vec![
            dvec3(0.0, 0.0, 0.0),
            dvec3(1.0, 1.0, 0.0),
            dvec3(2.0, 0.0, 0.5),
            dvec3(3.0, -1.0, 0.0),
            dvec3(4.0, 0.0, 0.0),
        ]
    }

    #[test]
    fn test_passes_through_points() {
        let spline = CubicSpline::new(sample_points(), ParamMetric::Distance).unwrap();
        for (p, &t) in spline.points.iter().zip(&spline.params) {
            assert!((spline.point_at(t) - *p).length() < 1e-12);
        }
    }

    #[test]
    fn test_natural_end_conditions() {
        let spline = CubicSpline::new(sample_points(), ParamMetric::Centripetal).unwrap();
        assert!(spline.moments[0].length() < 1e-15);
        assert!(spline.moments[4].length() < 1e-15);
        let (_, d_left) = spline.end_derivatives(1);
        let (d_right, _) = spline.end_derivatives(2);
        assert!((d_left - d_right).length() < 1e-9);
    }

    #[test]
    fn test_to_nurbs_matches_and_is_smooth() {
        let spline = CubicSpline::new(sample_points(), ParamMetric::Distance).unwrap();
        let nurbs = spline.to_nurbs().unwrap();
        for t in linspace(0.0, 1.0, 41) {
            assert!((nurbs.point_at(t) - spline.point_at(t)).length() < 1e-6);
        }
        // Interior knots are left with multiplicity one.
        assert_eq!(nurbs.control_points().len(), 7);
    }

    #[test]
    fn test_two_points_is_a_line() {
        let spline = CubicSpline::new(vec![dvec3(0.0, 0.0, 0.0), dvec3(2.0, 0.0, 0.0)], ParamMetric::Uniform).unwrap();
        assert!((spline.point_at(0.25) - dvec3(0.5, 0.0, 0.0)).length() < 1e-12);
    }
}
