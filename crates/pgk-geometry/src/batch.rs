//! Parallel evaluation over many independent curves.

use pgk_core::Result;
use pgk_math::Point3;
use rayon::prelude::*;

use crate::curve::{Curve, NurbsCurve};

/// Evaluate every curve at the same parameters, one rayon task per curve.
pub fn evaluate_curves_parallel<C>(curves: &[C], ts: &[f64]) -> Vec<Vec<Point3>>
where
    C: Curve,
{
    curves.par_iter().map(|curve| curve.points_at(ts)).collect()
}

/// Checked evaluation: each curve yields its own result, so a parameter
/// outside one curve's domain does not abort the others.
pub fn try_evaluate_curves_parallel<C>(curves: &[C], ts: &[f64]) -> Vec<Result<Vec<Point3>>>
where
    C: Curve,
{
    curves
        .par_iter()
        .map(|curve| ts.iter().map(|&t| curve.try_point_at(t)).collect())
        .collect()
}

/// Apply a fallible NURBS operation to many curves in parallel, keeping
/// per-index outcomes.
pub fn map_curves_parallel<F, T>(curves: &[NurbsCurve], op: F) -> Vec<Result<T>>
where
    F: Fn(&NurbsCurve) -> Result<T> + Sync + Send,
    T: Send,
{
    curves.par_iter().map(op).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{CurveRef, Line};
    use pgk_math::{dvec3, linspace};
    use std::sync::Arc;

    fn lines() -> Vec<NurbsCurve> {
        (0..8)
            .map(|i| {
                Line::new(dvec3(0.0, i as f64, 0.0), dvec3(1.0, i as f64, 1.0))
                    .to_nurbs()
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let curves = lines();
        let ts = linspace(0.0, 1.0, 11);
        let parallel = evaluate_curves_parallel(&curves, &ts);
        for (curve, points) in curves.iter().zip(&parallel) {
            assert_eq!(&curve.points_at(&ts), points);
        }
    }

    #[test]
    fn test_trait_objects() {
        let curves: Vec<CurveRef> = vec![
            Arc::new(Line::new(dvec3(0.0, 0.0, 0.0), dvec3(2.0, 0.0, 0.0))),
            Arc::new(lines().remove(3)),
        ];
        let points = evaluate_curves_parallel(&curves, &[0.5]);
        assert!((points[0][0] - dvec3(1.0, 0.0, 0.0)).length() < 1e-12);
        assert!((points[1][0] - dvec3(0.5, 3.0, 0.5)).length() < 1e-12);
    }

    #[test]
    fn test_per_index_results() {
        let mut curves = lines();
        curves[2] = curves[2].reparametrize(0.0, 0.5).unwrap();
        let results = try_evaluate_curves_parallel(&curves, &[0.0, 0.75]);
        assert!(results[2].is_err());
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 7);

        let elevated = map_curves_parallel(&curves, |c| c.elevate_degree(2));
        assert!(elevated.iter().all(|r| r.as_ref().is_ok_and(|c| c.degree() == 3)));
    }
}
