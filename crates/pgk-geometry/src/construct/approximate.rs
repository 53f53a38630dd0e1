//! Least-squares NURBS approximation of ordered points.

use nalgebra::DMatrix;
use pgk_core::{KernelError, Result};
use pgk_math::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::interpolate::{interpolate_nurbs_curve, InterpolationOptions};
use super::linear::solve_dense;
use super::ParamMetric;
use crate::curve::{Curve, NurbsCurve};
use crate::nurbs::KnotVector;

/// What an approximation should achieve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ApproximationTarget {
    /// Fit with exactly this many control points.
    ControlPoints(usize),
    /// Add control points until every input point is within the distance.
    Tolerance(f64),
}

/// Fit a B-spline of `degree` through the first and last point and as close
/// as possible, in the least-squares sense, to the others.
pub fn approximate_nurbs_curve(
    points: &[Point3],
    degree: usize,
    metric: ParamMetric,
    target: ApproximationTarget,
) -> Result<NurbsCurve> {
    if degree == 0 {
        return Err(KernelError::InvalidInput("approximation degree must be at least 1".into()));
    }
    let params = metric.parameters(points)?;
    let degree = degree.min(points.len() - 1);
    match target {
        ApproximationTarget::ControlPoints(count) => fit(points, &params, degree, count, metric),
        ApproximationTarget::Tolerance(tolerance) => {
            for count in degree + 1..=points.len() {
                let curve = fit(points, &params, degree, count, metric)?;
                let error = max_error(&curve, points, &params);
                log::trace!("approximation with {count} control points: error {error:e}");
                if error <= tolerance {
                    log::debug!("approximated {} points with {count} control points", points.len());
                    return Ok(curve);
                }
            }
            Err(KernelError::Geometry(format!(
                "approximation did not reach {tolerance:e} with {} control points",
                points.len()
            )))
        }
    }
}

fn max_error(curve: &NurbsCurve, points: &[Point3], params: &[f64]) -> f64 {
    points
        .iter()
        .zip(params)
        .map(|(p, &t)| (curve.point_at(t) - *p).length())
        .fold(0.0, f64::max)
}

/// Knots spread so every span holds at least one parameter.
fn approximation_knots(degree: usize, params: &[f64], count: usize) -> KnotVector {
    let m = params.len();
    let d = m as f64 / (count - degree) as f64;
    let mut knots = vec![params[0]; degree + 1];
    for j in 1..count - degree {
        let jd = j as f64 * d;
        let i = jd.floor() as usize;
        let alpha = jd - i as f64;
        knots.push((1.0 - alpha) * params[i - 1] + alpha * params[i]);
    }
    knots.extend(std::iter::repeat(params[m - 1]).take(degree + 1));
    KnotVector::new(knots)
}

fn fit(points: &[Point3], params: &[f64], degree: usize, count: usize, metric: ParamMetric) -> Result<NurbsCurve> {
    let m = points.len();
    if count <= degree || count > m {
        return Err(KernelError::InvalidInput(format!(
            "{count} control points for degree {degree} and {m} points"
        )));
    }
    if count == m {
        let options = InterpolationOptions {
            degree,
            metric,
            tknots: Some(params.to_vec()),
            ..InterpolationOptions::default()
        };
        return interpolate_nurbs_curve(points, &options);
    }
    let knots = approximation_knots(degree, params, count);
    let (first, last) = (points[0], points[m - 1]);
    let mut control_points = vec![first; count];
    control_points[count - 1] = last;
    let unknowns = count - 2;
    if unknowns > 0 {
        // Rows for the interior points, columns for the interior control points.
        let mut basis = DMatrix::zeros(m - 2, unknowns);
        let mut residuals = Vec::with_capacity(m - 2);
        for k in 1..m - 1 {
            let (span, values) = knots.basis_functions(degree, params[k]);
            let mut r = points[k];
            for (offset, &b) in values.iter().enumerate() {
                let i = span - degree + offset;
                if i == 0 {
                    r -= b * first;
                } else if i == count - 1 {
                    r -= b * last;
                } else {
                    basis[(k - 1, i - 1)] = b;
                }
            }
            residuals.push(r);
        }
        let normal = basis.transpose() * &basis;
        let rhs: Vec<Vector3> = (0..unknowns)
            .map(|i| {
                residuals
                    .iter()
                    .enumerate()
                    .fold(Vector3::ZERO, |acc, (k, r)| acc + basis[(k, i)] * *r)
            })
            .collect();
        let solved = solve_dense(normal, &rhs)?;
        control_points[1..count - 1].copy_from_slice(&solved);
    }
    NurbsCurve::bspline(degree, knots, control_points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgk_math::dvec3;

    fn noisy_arc() -> Vec<Point3> {
        (0..30)
            .map(|i| {
                let a = i as f64 / 29.0 * std::f64::consts::PI;
                let jitter = if i % 2 == 0 { 1e-3 } else { -1e-3 };
                dvec3(a.cos(), a.sin() + jitter, 0.0)
            })
            .collect()
    }

    #[test]
    fn test_fixed_count_keeps_endpoints() {
        let points = noisy_arc();
        let curve =
            approximate_nurbs_curve(&points, 3, ParamMetric::Distance, ApproximationTarget::ControlPoints(8)).unwrap();
        assert_eq!(curve.control_points().len(), 8);
        assert!((curve.point_at(0.0) - points[0]).length() < 1e-12);
        assert!((curve.point_at(1.0) - points[29]).length() < 1e-12);
        let params = ParamMetric::Distance.parameters(&points).unwrap();
        assert!(max_error(&curve, &points, &params) < 1e-2);
    }

    #[test]
    fn test_tolerance_target_grows_until_met() {
        let points = noisy_arc();
        let curve =
            approximate_nurbs_curve(&points, 3, ParamMetric::Distance, ApproximationTarget::Tolerance(5e-3)).unwrap();
        let params = ParamMetric::Distance.parameters(&points).unwrap();
        assert!(max_error(&curve, &points, &params) <= 5e-3);
        assert!(curve.control_points().len() < points.len());
    }

    #[test]
    fn test_full_count_interpolates() {
        let points = noisy_arc();
        let curve =
            approximate_nurbs_curve(&points, 3, ParamMetric::Centripetal, ApproximationTarget::ControlPoints(30)).unwrap();
        let params = ParamMetric::Centripetal.parameters(&points).unwrap();
        assert!(max_error(&curve, &points, &params) < 1e-6);
    }

    #[test]
    fn test_invalid_count() {
        let points = noisy_arc();
        assert!(approximate_nurbs_curve(&points, 3, ParamMetric::Distance, ApproximationTarget::ControlPoints(3)).is_err());
        assert!(approximate_nurbs_curve(&points, 3, ParamMetric::Distance, ApproximationTarget::ControlPoints(31)).is_err());
    }

    #[test]
    fn test_approximation_knots_are_clamped() {
        let params: Vec<f64> = (0..10).map(|i| i as f64 / 9.0).collect();
        let knots = approximation_knots(3, &params, 6);
        assert!(knots.is_clamped(3));
        assert_eq!(knots.len(), 10);
        assert!(knots.windows(2).all(|w| w[0] <= w[1]));
    }
}
