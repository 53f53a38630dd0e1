//! Construction of curves and surfaces from points, tangents and circles.

pub mod approximate;
pub mod blend;
pub mod fillet;
pub mod interpolate;
pub(crate) mod linear;
pub mod tangents;

use pgk_core::{KernelError, Result};
use pgk_math::Point3;
use serde::{Deserialize, Serialize};

pub use approximate::{approximate_nurbs_curve, ApproximationTarget};
pub use blend::{blend_curves, BlendContinuity};
pub use fillet::{
    calc_fillet, fillet_nurbs_curve, fillet_polyline, limit_fillet_radii, CornerFillet, CurveFilletOptions,
    FilletShape, FilletedPolyline, PolylineFilletOptions,
};
pub use interpolate::{
    interpolate_nurbs_curve, interpolate_nurbs_curve_cached, interpolate_nurbs_curve_with_end_tangents,
    interpolate_nurbs_curve_with_tangents, InterpolationOptions,
};
pub use tangents::{
    point_circle_tangents, two_circle_inner_tangents, two_circle_outer_tangents, CircleTangents,
    PointCircleTangents,
};

/// How interpolation parameters are spaced between consecutive points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamMetric {
    /// Evenly spaced, ignoring point positions.
    Uniform,
    /// Chord length.
    #[default]
    Distance,
    /// Square root of the chord length.
    Centripetal,
    /// Sum of absolute coordinate differences.
    Manhattan,
    /// Largest absolute coordinate difference.
    Chebyshev,
    /// Absolute X difference.
    X,
    Y,
    Z,
}

impl ParamMetric {
    fn step(self, a: Point3, b: Point3) -> f64 {
        let d = b - a;
        match self {
            ParamMetric::Uniform => 1.0,
            ParamMetric::Distance => d.length(),
            ParamMetric::Centripetal => d.length().sqrt(),
            ParamMetric::Manhattan => d.x.abs() + d.y.abs() + d.z.abs(),
            ParamMetric::Chebyshev => d.abs().max_element(),
            ParamMetric::X => d.x.abs(),
            ParamMetric::Y => d.y.abs(),
            ParamMetric::Z => d.z.abs(),
        }
    }

    /// Cumulative parameters normalized onto `[0, 1]`.
    pub fn parameters(self, points: &[Point3]) -> Result<Vec<f64>> {
        if points.len() < 2 {
            return Err(KernelError::InvalidInput(format!(
                "need at least two points, got {}",
                points.len()
            )));
        }
        let mut params = Vec::with_capacity(points.len());
        let mut total = 0.0;
        params.push(0.0);
        for w in points.windows(2) {
            total += self.step(w[0], w[1]);
            params.push(total);
        }
        if total <= f64::EPSILON {
            return Err(KernelError::InvalidInput(format!(
                "points have zero total length under the {self:?} metric"
            )));
        }
        for t in &mut params {
            *t /= total;
        }
        let last = params.len() - 1;
        params[last] = 1.0;
        Ok(params)
    }
}
