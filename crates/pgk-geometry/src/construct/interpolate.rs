//! NURBS interpolation through ordered points.

use std::sync::Arc;

use nalgebra::DMatrix;
use pgk_core::{ContentCache, ContentHasher, ContentKey, KernelError, Result};
use pgk_math::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::linear::{solve_dense, BandedMatrix};
use super::ParamMetric;
use crate::curve::NurbsCurve;
use crate::nurbs::{KnotVector, NurbsBackend};

/// Options for [`interpolate_nurbs_curve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolationOptions {
    /// Requested degree; lowered to `points - 1` when there are too few
    /// points.
    pub degree: usize,
    pub metric: ParamMetric,
    /// Close the curve through the first point again.
    pub cyclic: bool,
    /// Explicit parameters, one per point (one more for cyclic input, for
    /// the closing point). Overrides `metric`.
    pub tknots: Option<Vec<f64>>,
    pub backend: NurbsBackend,
}

impl Default for InterpolationOptions {
    fn default() -> Self {
        Self {
            degree: 3,
            metric: ParamMetric::Distance,
            cyclic: false,
            tknots: None,
            backend: NurbsBackend::Native,
        }
    }
}

impl InterpolationOptions {
    pub fn with_degree(degree: usize) -> Self {
        Self {
            degree,
            ..Self::default()
        }
    }

    pub fn content_key(&self, points: &[Point3]) -> ContentKey {
        let coords: Vec<f64> = points.iter().flat_map(|p| p.to_array()).collect();
        ContentHasher::new("interpolate_nurbs_curve")
            .usize(self.degree)
            .str(&format!("{:?}/{:?}", self.metric, self.backend))
            .bool(self.cyclic)
            .bool(self.tknots.is_some())
            .f64s(self.tknots.as_deref().unwrap_or(&[]))
            .f64s(&coords)
            .finish()
    }
}

/// NURBS curve of the requested degree passing through every point.
///
/// Knots come from the parameters by averaging, so the collocation matrix
/// is banded and solvable without pivoting.
pub fn interpolate_nurbs_curve(points: &[Point3], options: &InterpolationOptions) -> Result<NurbsCurve> {
    if options.degree == 0 {
        return Err(KernelError::InvalidInput("interpolation degree must be at least 1".into()));
    }
    if points.len() < 2 {
        return Err(KernelError::InvalidInput(format!(
            "need at least two points to interpolate, got {}",
            points.len()
        )));
    }
    if options.cyclic {
        return interpolate_cyclic(points, options);
    }
    let params = match &options.tknots {
        Some(ts) => checked_params(ts, points.len())?,
        None => options.metric.parameters(points)?,
    };
    let degree = options.degree.min(points.len() - 1);
    solve_collocation(points, &params, degree, options.backend)
}

/// [`interpolate_nurbs_curve`] through a caller-owned cache keyed by the
/// points and options.
pub fn interpolate_nurbs_curve_cached(
    points: &[Point3],
    options: &InterpolationOptions,
    cache: &mut ContentCache<NurbsCurve>,
) -> Result<Arc<NurbsCurve>> {
    let key = options.content_key(points);
    cache.get_or_try_insert_with(key, || interpolate_nurbs_curve(points, options))
}

fn checked_params(ts: &[f64], expected: usize) -> Result<Vec<f64>> {
    if ts.len() != expected {
        return Err(KernelError::InvalidInput(format!(
            "expected {expected} parameters, got {}",
            ts.len()
        )));
    }
    if ts.windows(2).any(|w| w[1] <= w[0]) {
        return Err(KernelError::InvalidInput("parameters must be strictly increasing".into()));
    }
    Ok(ts.to_vec())
}

/// Closed interpolation: the closed polygon is padded with `degree` points
/// from the other end on each side, interpolated, and cut back to `[t0, t1]`.
fn interpolate_cyclic(points: &[Point3], options: &InterpolationOptions) -> Result<NurbsCurve> {
    let mut open = points.to_vec();
    if open.len() > 2 && (open[0] - open[open.len() - 1]).length() < 1e-12 {
        open.pop();
    }
    let n = open.len();
    if n < 3 {
        return Err(KernelError::InvalidInput(format!(
            "cyclic interpolation needs at least three distinct points, got {n}"
        )));
    }
    let mut closed = open.clone();
    closed.push(open[0]);
    let params = match &options.tknots {
        Some(ts) => checked_params(ts, n + 1)?,
        None => options.metric.parameters(&closed)?,
    };
    let (t0, t1) = (params[0], params[n]);
    let period = t1 - t0;
    let degree = options.degree.min(n - 1);

    let mut ext_points = Vec::with_capacity(n + 1 + 2 * degree);
    let mut ext_params = Vec::with_capacity(n + 1 + 2 * degree);
    for i in n - degree..n {
        ext_points.push(open[i]);
        ext_params.push(params[i] - period);
    }
    ext_points.extend_from_slice(&closed);
    ext_params.extend_from_slice(&params);
    for i in 1..=degree {
        ext_points.push(open[i]);
        ext_params.push(params[i] + period);
    }
    log::trace!("cyclic interpolation: {n} points padded to {}", ext_points.len());
    solve_collocation(&ext_points, &ext_params, degree, options.backend)?.cut_segment(t0, t1, false)
}

fn solve_collocation(points: &[Point3], params: &[f64], degree: usize, backend: NurbsBackend) -> Result<NurbsCurve> {
    let knots = KnotVector::from_params(degree, params)?;
    let control_points = solve_collocation_rows(degree, &knots, params, points, backend)?;
    Ok(NurbsCurve::bspline(degree, knots, control_points)?.with_backend(backend))
}

/// Solve `N(params) X = rhs` for the coefficients of the B-spline basis on
/// `knots`, one right-hand row per parameter.
pub(crate) fn solve_collocation_rows(
    degree: usize,
    knots: &KnotVector,
    params: &[f64],
    rhs: &[Vector3],
    backend: NurbsBackend,
) -> Result<Vec<Vector3>> {
    let n = rhs.len();
    if params.len() != n || knots.len() != n + degree + 1 {
        return Err(KernelError::InvalidInput(format!(
            "collocation of {n} rows with {} parameters and {} knots",
            params.len(),
            knots.len()
        )));
    }
    match backend {
        NurbsBackend::Native => {
            let mut matrix = BandedMatrix::zeros(n, degree, degree);
            for (k, &t) in params.iter().enumerate() {
                let (span, basis) = knots.basis_functions(degree, t);
                for (r, &b) in basis.iter().enumerate() {
                    matrix.set(k, span - degree + r, b)?;
                }
            }
            let mut solution = rhs.to_vec();
            matrix.solve(&mut solution)?;
            Ok(solution)
        }
        #[cfg(feature = "dense-backend")]
        NurbsBackend::Dense => {
            let mut matrix = DMatrix::zeros(n, n);
            for (k, &t) in params.iter().enumerate() {
                let (span, basis) = knots.basis_functions(degree, t);
                for (r, &b) in basis.iter().enumerate() {
                    matrix[(k, span - degree + r)] = b;
                }
            }
            solve_dense(matrix, rhs)
        }
    }
}

/// Curve through every point with the given first derivative at each one.
///
/// Only degrees 2 and 3 are supported; each point contributes two control
/// points. With `cyclic`, the first point and tangent are repeated at the
/// end. The mixed value and derivative system is solved by dense LU.
pub fn interpolate_nurbs_curve_with_tangents(
    points: &[Point3],
    tangents: &[Vector3],
    options: &InterpolationOptions,
) -> Result<NurbsCurve> {
    if points.len() != tangents.len() {
        return Err(KernelError::InvalidInput(format!(
            "{} points but {} tangents",
            points.len(),
            tangents.len()
        )));
    }
    if points.len() < 2 {
        return Err(KernelError::InvalidInput(format!(
            "need at least two points to interpolate, got {}",
            points.len()
        )));
    }
    let (mut points, mut tangents) = (points.to_vec(), tangents.to_vec());
    if options.cyclic {
        points.push(points[0]);
        tangents.push(tangents[0]);
    }
    let params = match &options.tknots {
        Some(ts) => checked_params(ts, points.len())?,
        None => options.metric.parameters(&points)?,
    };
    let degree = options.degree;
    let knots = tangent_knots(degree, &params)?;

    let mut conditions = Vec::with_capacity(2 * points.len());
    for ((&t, &p), &d) in params.iter().zip(&points).zip(&tangents) {
        conditions.push((t, 0, p));
        conditions.push((t, 1, d));
    }
    let control_points = solve_mixed(degree, &knots, &conditions)?;
    Ok(NurbsCurve::bspline(degree, knots, control_points)?.with_backend(options.backend))
}

/// Curve through every point with prescribed first derivatives at the two
/// ends only.
pub fn interpolate_nurbs_curve_with_end_tangents(
    points: &[Point3],
    start_tangent: Vector3,
    end_tangent: Vector3,
    options: &InterpolationOptions,
) -> Result<NurbsCurve> {
    if points.len() < 2 {
        return Err(KernelError::InvalidInput(format!(
            "need at least two points to interpolate, got {}",
            points.len()
        )));
    }
    let mut points = points.to_vec();
    if options.cyclic {
        points.push(points[0]);
    }
    let params = match &options.tknots {
        Some(ts) => checked_params(ts, points.len())?,
        None => options.metric.parameters(&points)?,
    };
    let degree = options.degree;
    if degree < 2 || points.len() + 1 < degree {
        return Err(KernelError::InvalidInput(format!(
            "cannot fit degree {degree} through {} points with end tangents",
            points.len()
        )));
    }
    let (first, last) = (params[0], params[params.len() - 1]);
    let mut doubled = Vec::with_capacity(params.len() + 2);
    doubled.push(first);
    doubled.extend_from_slice(&params);
    doubled.push(last);
    let knots = KnotVector::from_params(degree, &doubled)?;

    let mut conditions: Vec<(f64, usize, Vector3)> = params.iter().zip(&points).map(|(&t, &p)| (t, 0, p)).collect();
    conditions.push((first, 1, start_tangent));
    conditions.push((last, 1, end_tangent));
    let control_points = solve_mixed(degree, &knots, &conditions)?;
    Ok(NurbsCurve::bspline(degree, knots, control_points)?.with_backend(options.backend))
}

/// Knots for one value and one derivative condition per parameter: two
/// control points per parameter, with the extra knots placed between the
/// parameters.
fn tangent_knots(degree: usize, u: &[f64]) -> Result<KnotVector> {
    let n = u.len();
    let (first, last) = (u[0], u[n - 1]);
    let mut knots = vec![first; degree + 1];
    match degree {
        2 => {
            for i in 1..n {
                knots.push(0.5 * (u[i - 1] + u[i]));
                if i < n - 1 {
                    knots.push(u[i]);
                }
            }
        }
        3 if n == 2 => {}
        3 => {
            knots.push(0.5 * (u[0] + u[1]));
            for i in 1..n - 2 {
                knots.push((2.0 * u[i] + u[i + 1]) / 3.0);
                knots.push((u[i] + 2.0 * u[i + 1]) / 3.0);
            }
            knots.push(0.5 * (u[n - 2] + u[n - 1]));
        }
        _ => {
            return Err(KernelError::InvalidInput(format!(
                "interpolation with tangents supports degrees 2 and 3, not {degree}"
            )))
        }
    }
    knots.extend(std::iter::repeat(last).take(degree + 1));
    Ok(KnotVector::new(knots))
}

/// Solve for control points from `(parameter, derivative order, value)`
/// conditions, one per control point.
fn solve_mixed(degree: usize, knots: &KnotVector, conditions: &[(f64, usize, Vector3)]) -> Result<Vec<Vector3>> {
    let n = conditions.len();
    if knots.len() != n + degree + 1 {
        return Err(KernelError::InvalidInput(format!(
            "{n} conditions do not match {} knots of degree {degree}",
            knots.len()
        )));
    }
    let mut matrix = DMatrix::zeros(n, n);
    for (k, &(t, order, _)) in conditions.iter().enumerate() {
        let (span, ders) = knots.basis_function_derivs(degree, t, order);
        for (r, &b) in ders[order].iter().enumerate() {
            matrix[(k, span - degree + r)] = b;
        }
    }
    let rhs: Vec<Vector3> = conditions.iter().map(|&(_, _, v)| v).collect();
    solve_dense(matrix, &rhs)
}
