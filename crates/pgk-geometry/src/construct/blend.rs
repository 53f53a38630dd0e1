//! Blending curves between the end of one curve and the start of another.

use std::sync::Arc;

use pgk_core::{KernelError, Result};
use pgk_math::Vector3;
use serde::{Deserialize, Serialize};

use crate::curve::{BezierCurve, BiArc, Curve, CurveRef, Line};

/// Continuity of a blend with both curves it joins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum BlendContinuity {
    /// Straight segment.
    #[default]
    C0,
    /// Cubic Bezier matching the scaled end tangents.
    C1,
    /// Biarc with the given handle ratio.
    C1Biarc { ratio: f64, planar_tolerance: f64 },
    /// Quintic Bezier matching first and second derivatives.
    C2,
    /// Septic Bezier matching derivatives up to the third.
    C3,
}

/// Curve from the end of `first` to the start of `second`.
///
/// `factor1` and `factor2` are speed factors for the two ends: derivative
/// `k` of each end is scaled by the factor raised to `k`, as if the curve
/// were reparametrized that much faster.
pub fn blend_curves(
    first: &dyn Curve,
    second: &dyn Curve,
    continuity: BlendContinuity,
    factor1: f64,
    factor2: f64,
) -> Result<CurveRef> {
    let (_, t1) = first.domain();
    let (t2, _) = second.domain();
    let order = match continuity {
        BlendContinuity::C0 => 0,
        BlendContinuity::C1 | BlendContinuity::C1Biarc { .. } => 1,
        BlendContinuity::C2 => 2,
        BlendContinuity::C3 => 3,
    };
    let scaled = |d: Vec<Vector3>, factor: f64| -> Vec<Vector3> {
        d.into_iter().enumerate().map(|(k, v)| factor.powi(k as i32) * v).collect()
    };
    let a = scaled(first.derivatives_at(t1, order), factor1);
    let b = scaled(second.derivatives_at(t2, order), factor2);
    if (a[0] - b[0]).length() < f64::EPSILON && order > 0 {
        return Err(KernelError::InvalidInput("blended curve ends coincide".into()));
    }
    log::trace!("blending with {continuity:?}");
    let curve: CurveRef = match continuity {
        BlendContinuity::C0 => Arc::new(Line::new(a[0], b[0])),
        BlendContinuity::C1 => Arc::new(BezierCurve::from_tangents(a[0], a[1], b[0], b[1])),
        BlendContinuity::C1Biarc {
            ratio,
            planar_tolerance,
        } => Arc::new(BiArc::calc(a[0], b[0], a[1], b[1], ratio, planar_tolerance)?),
        BlendContinuity::C2 => Arc::new(BezierCurve::from_second_derivatives(a[0], a[1], a[2], b[0], b[1], b[2])),
        BlendContinuity::C3 => Arc::new(BezierCurve::from_third_derivatives(
            [a[0], a[1], a[2], a[3]],
            [b[0], b[1], b[2], b[3]],
        )),
    };
    Ok(curve)
}
