//! Lofted NURBS surface through a sequence of curves.

use pgk_core::{KernelError, Result};
use pgk_math::{DVec4, Vector3};

use super::NurbsSurface;
use crate::construct::interpolate::solve_collocation_rows;
use crate::construct::ParamMetric;
use crate::curve::{unify_curves, NurbsCurve};
use crate::nurbs::{KnotVector, NurbsBackend};

/// Surface interpolating `curves` as its V iso-curves.
///
/// The curves are clamped and unified to a common degree and knot vector,
/// which become the U direction of the surface. Along V every column of
/// control points is interpolated at parameters averaged over all columns.
/// `degree_v` is lowered to `curves.len() - 1` when needed.
pub fn loft_nurbs_surface(curves: &[NurbsCurve], degree_v: usize, metric: ParamMetric) -> Result<NurbsSurface> {
    if curves.len() < 2 {
        return Err(KernelError::InvalidInput(format!(
            "loft needs at least 2 curves, got {}",
            curves.len()
        )));
    }
    if degree_v == 0 {
        return Err(KernelError::InvalidInput("loft degree must be at least 1".into()));
    }
    let clamped = curves.iter().map(NurbsCurve::clamped).collect::<Result<Vec<_>>>()?;
    let unified = unify_curves(&clamped)?;
    let degree_u = unified[0].degree();
    let knots_u = unified[0].knots().clone();
    let columns: Vec<Vec<DVec4>> = unified.iter().map(NurbsCurve::homogeneous).collect();
    let width = columns[0].len();
    if columns.iter().any(|c| c.len() != width) {
        return Err(KernelError::Geometry("curves could not be unified".into()));
    }

    let n = curves.len();
    let degree_v = degree_v.min(n - 1);
    let params = average_parameters(&unified, metric)?;
    let knots_v = KnotVector::from_params(degree_v, &params)?;
    log::debug!("loft of {n} curves: degree ({degree_u}, {degree_v}), {width} control points per curve");

    let mut net = Vec::with_capacity(width);
    for i in 0..width {
        let xyz: Vec<Vector3> = columns.iter().map(|c| c[i].truncate()).collect();
        let w: Vec<Vector3> = columns.iter().map(|c| Vector3::new(c[i].w, 0.0, 0.0)).collect();
        let xyz = solve_collocation_rows(degree_v, &knots_v, &params, &xyz, NurbsBackend::Native)?;
        let w = solve_collocation_rows(degree_v, &knots_v, &params, &w, NurbsBackend::Native)?;
        if let Some(bad) = w.iter().find(|w| w.x <= 0.0) {
            return Err(KernelError::Geometry(format!(
                "lofted weight {} is not positive; curve weights differ too much",
                bad.x
            )));
        }
        net.push(xyz.into_iter().zip(w).map(|(p, w)| p.extend(w.x)).collect());
    }
    NurbsSurface::from_homogeneous(degree_u, degree_v, knots_u, knots_v, &net)
}

/// Mean of the per-column parameterizations. Columns whose points coincide
/// are skipped.
fn average_parameters(curves: &[NurbsCurve], metric: ParamMetric) -> Result<Vec<f64>> {
    let n = curves.len();
    let width = curves[0].control_points().len();
    let mut sum = vec![0.0; n];
    let mut used = 0;
    for i in 0..width {
        let column: Vec<_> = curves.iter().map(|c| c.control_points()[i]).collect();
        if let Ok(ts) = metric.parameters(&column) {
            for (s, t) in sum.iter_mut().zip(ts) {
                *s += t;
            }
            used += 1;
        }
    }
    if used == 0 {
        return Err(KernelError::InvalidInput("all lofted curves coincide".into()));
    }
    Ok(sum.into_iter().map(|s| s / used as f64).collect())
}
