//! Arc length parametrization by sampling.

use pgk_core::{KernelError, Result};
use pgk_math::{dvec3, linspace};
use serde::{Deserialize, Serialize};

use super::{CubicSpline, Curve};

/// Default number of samples along the curve.
pub const DEFAULT_LENGTH_RESOLUTION: usize = 50;

/// How parameters are recovered between sampled lengths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthInterpolation {
    #[default]
    Linear,
    /// Natural cubic spline through the `(length, t)` samples.
    Spline,
}

/// Maps lengths measured along a curve back to curve parameters.
///
/// Lengths are those of the polyline through `resolution` evenly spaced
/// samples, so they slightly underestimate the true arc length.
#[derive(Debug, Clone)]
pub struct CurveLengthSolver {
    ts: Vec<f64>,
    lengths: Vec<f64>,
    spline: Option<CubicSpline>,
}

impl CurveLengthSolver {
    pub fn new(curve: &dyn Curve, mode: LengthInterpolation, resolution: usize) -> Result<Self> {
        if resolution < 2 {
            return Err(KernelError::InvalidInput(format!(
                "length solver needs at least two samples, got {resolution}"
            )));
        }
        let (t_min, t_max) = curve.domain();
        let samples = linspace(t_min, t_max, resolution);
        let points = curve.points_at(&samples);

        // Stationary stretches add no length; keep only the first sample of
        // each so lengths stay strictly increasing.
        let mut ts = vec![samples[0]];
        let mut lengths = vec![0.0];
        let mut total = 0.0;
        for (w, &t) in points.windows(2).zip(&samples[1..]) {
            let step = (w[1] - w[0]).length();
            total += step;
            if step > f64::EPSILON * (1.0 + total) {
                ts.push(t);
                lengths.push(total);
            }
        }
        if ts.len() < 2 {
            return Err(KernelError::Geometry("curve has zero length".into()));
        }
        let last = ts.len() - 1;
        ts[last] = t_max;

        let spline = match mode {
            LengthInterpolation::Linear => None,
            LengthInterpolation::Spline => {
                let points = lengths.iter().zip(&ts).map(|(&l, &t)| dvec3(l, t, 0.0)).collect();
                Some(CubicSpline::with_parameters(points, lengths.clone())?)
            }
        };
        log::trace!("length solver: {} samples, total {total}", ts.len());
        Ok(Self { ts, lengths, spline })
    }

    pub fn total_length(&self) -> f64 {
        self.lengths[self.lengths.len() - 1]
    }

    /// Parameters at which the given lengths from the start are reached.
    /// Lengths outside `[0, total_length]` are clamped.
    pub fn solve(&self, lengths: &[f64]) -> Vec<f64> {
        let total = self.total_length();
        lengths
            .iter()
            .map(|&l| {
                let l = l.clamp(0.0, total);
                match &self.spline {
                    Some(spline) => spline.point_at(l).y,
                    None => interpolate(&self.lengths, &self.ts, l),
                }
            })
            .collect()
    }

    /// Polyline lengths from the start up to each of `ts`.
    pub fn lengths_at(&self, ts: &[f64]) -> Vec<f64> {
        ts.iter().map(|&t| interpolate(&self.ts, &self.lengths, t)).collect()
    }

    /// `count` parameters spaced evenly by length, ends included.
    pub fn uniform_parameters(&self, count: usize) -> Vec<f64> {
        self.solve(&linspace(0.0, self.total_length(), count.max(2)))
    }
}

/// Piecewise linear lookup of `x` in the increasing samples `xs`.
fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let last = xs.len() - 2;
    let i = xs.partition_point(|&v| v <= x).saturating_sub(1).min(last);
    let (x0, x1) = (xs[i], xs[i + 1]);
    let s = ((x - x0) / (x1 - x0)).clamp(0.0, 1.0);
    ys[i] + s * (ys[i + 1] - ys[i])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{Circle, Line, NurbsCurve};
    use pgk_math::DVec3;

    #[test]
    fn test_line_lengths_are_linear() {
        let line = Line::new(DVec3::ZERO, dvec3(4.0, 0.0, 0.0));
        let solver = CurveLengthSolver::new(&line, LengthInterpolation::Linear, 10).unwrap();
        assert!((solver.total_length() - 4.0).abs() < 1e-12);
        let ts = solver.solve(&[0.0, 1.0, 3.0, 9.0]);
        for (t, expected) in ts.iter().zip([0.0, 0.25, 0.75, 1.0]) {
            assert!((t - expected).abs() < 1e-12);
        }
        assert!((solver.lengths_at(&[0.5])[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_uneven_parametrization() {
        // Control points bunched at the start: parameter and length disagree.
        let curve = NurbsCurve::bspline(
            2,
            vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            vec![dvec3(0.0, 0.0, 0.0), dvec3(0.1, 0.0, 0.0), dvec3(1.0, 0.0, 0.0)],
        )
        .unwrap();
        for mode in [LengthInterpolation::Linear, LengthInterpolation::Spline] {
            let solver = CurveLengthSolver::new(&curve, mode, 200).unwrap();
            let ts = solver.uniform_parameters(5);
            for (i, p) in curve.points_at(&ts).iter().enumerate() {
                assert!((p.x - i as f64 * 0.25).abs() < 1e-3, "{mode:?} sample {i}: {p}");
            }
        }
    }

    #[test]
    fn test_circle_total_length() {
        let circle = Circle::new(DVec3::ZERO, DVec3::Z, 1.0);
        let solver = CurveLengthSolver::new(&circle, LengthInterpolation::Spline, 400).unwrap();
        assert!((solver.total_length() - std::f64::consts::TAU).abs() < 1e-3);
        let half = solver.solve(&[std::f64::consts::PI])[0];
        assert!((half - std::f64::consts::PI).abs() < 1e-3);
    }

    #[test]
    fn test_degenerate_curve() {
        let point = Line::new(DVec3::ONE, DVec3::ONE);
        assert!(CurveLengthSolver::new(&point, LengthInterpolation::Linear, 10).is_err());
        let line = Line::new(DVec3::ZERO, DVec3::X);
        assert!(CurveLengthSolver::new(&line, LengthInterpolation::Linear, 1).is_err());
    }
}
