//! Curve traits and implementations.

mod bezier;
mod biarc;
mod circle;
mod concat;
mod length;
mod line;
mod nurbs;
mod offset;
mod refinement;
mod segment;
mod spline;

use std::fmt;
use std::sync::Arc;

use pgk_core::{KernelError, Result};
use pgk_math::{linspace, Point3, Vector3};

pub use bezier::BezierCurve;
pub use biarc::BiArc;
pub use circle::Circle;
pub use concat::{concatenate_nurbs_curves, ConcatCurve};
pub use length::{CurveLengthSolver, LengthInterpolation, DEFAULT_LENGTH_RESOLUTION};
pub use line::Line;
pub use nurbs::{unify_curves, DegreeReductionOutcome, KnotRemovalOutcome, NurbsCurve, NurbsCurveData};
pub use offset::{offset_nurbs_curve, OffsetCurve};
pub use refinement::{distribute_int, refine_curve, RefineAlgorithm, RefineOptions, Refinement};
pub use segment::{CurveSegment, ReparametrizedCurve, ReversedCurve};
pub use spline::CubicSpline;

/// Shared handle to any curve.
pub type CurveRef = Arc<dyn Curve>;

/// Default step for numeric differentiation.
pub const DEFAULT_TANGENT_DELTA: f64 = 1e-3;

/// Below this `|C' x C''|` the curvature is treated as zero.
pub const ZERO_CURVATURE: f64 = 1e-10;

/// Unit tangent, principal normal and binormal at a curve point.
#[derive(Debug, Clone, Copy)]
pub struct FrenetFrame {
    pub tangent: Vector3,
    pub normal: Vector3,
    pub binormal: Vector3,
}

/// Trait for parametric curves in 3D space.
///
/// Only `point_at` and `domain` are required. Derivatives default to central
/// finite differences with step `tangent_delta()`, which is noticeably less
/// precise than the analytic derivatives most variants provide.
pub trait Curve: Send + Sync + fmt::Debug {
    /// Evaluate the curve at parameter `t`.
    fn point_at(&self, t: f64) -> Point3;

    /// Return the parameter domain `(t_min, t_max)`.
    fn domain(&self) -> (f64, f64);

    /// Evaluate the curve at many parameters.
    fn points_at(&self, ts: &[f64]) -> Vec<Point3> {
        ts.iter().map(|&t| self.point_at(t)).collect()
    }

    /// Step used by numeric differentiation.
    fn tangent_delta(&self) -> f64 {
        DEFAULT_TANGENT_DELTA
    }

    /// The point followed by derivatives of order `1..=n`.
    fn derivatives_at(&self, t: f64, n: usize) -> Vec<Vector3> {
        numeric_derivatives(self, t, n, self.tangent_delta())
    }

    /// First derivative at `t` (not normalized).
    fn tangent_at(&self, t: f64) -> Vector3 {
        self.derivatives_at(t, 1)[1]
    }

    fn tangents_at(&self, ts: &[f64]) -> Vec<Vector3> {
        ts.iter().map(|&t| self.tangent_at(t)).collect()
    }

    fn second_derivative_at(&self, t: f64) -> Vector3 {
        self.derivatives_at(t, 2)[2]
    }

    fn third_derivative_at(&self, t: f64) -> Vector3 {
        self.derivatives_at(t, 3)[3]
    }

    /// Exact (or best available) NURBS form of this curve.
    fn to_nurbs(&self) -> Result<NurbsCurve> {
        Err(KernelError::UnsupportedCurveType(
            std::any::type_name::<Self>().to_string(),
        ))
    }

    /// Whether the curve is closed (start == end).
    fn is_closed(&self) -> bool {
        let (a, b) = self.domain();
        (self.point_at(a) - self.point_at(b)).length() < 1e-9
    }

    /// Evaluate with a domain check.
    fn try_point_at(&self, t: f64) -> Result<Point3> {
        let (min, max) = self.domain();
        let eps = 1e-9 * (1.0 + (max - min).abs());
        if t < min - eps || t > max + eps {
            return Err(KernelError::Domain { t, min, max });
        }
        Ok(self.point_at(t))
    }

    fn curvature_at(&self, t: f64) -> f64 {
        let d = self.derivatives_at(t, 2);
        let speed = d[1].length();
        if speed < f64::EPSILON {
            return 0.0;
        }
        d[1].cross(d[2]).length() / speed.powi(3)
    }

    fn torsion_at(&self, t: f64) -> f64 {
        let d = self.derivatives_at(t, 3);
        let cross = d[1].cross(d[2]);
        let len2 = cross.length_squared();
        if len2 < ZERO_CURVATURE * ZERO_CURVATURE {
            return 0.0;
        }
        cross.dot(d[3]) / len2
    }

    /// Frenet frame at `t`; undefined where the curvature vanishes.
    fn frenet_frame_at(&self, t: f64) -> Result<FrenetFrame> {
        let d = self.derivatives_at(t, 2);
        let cross = d[1].cross(d[2]);
        if cross.length() < ZERO_CURVATURE * (1.0 + d[1].length_squared()) {
            return Err(KernelError::ZeroCurvature { t });
        }
        let tangent = d[1].normalize();
        let binormal = cross.normalize();
        Ok(FrenetFrame {
            tangent,
            normal: binormal.cross(tangent),
            binormal,
        })
    }

    /// Length of the polyline through `resolution` evenly spaced samples.
    fn arc_length(&self, resolution: usize) -> f64 {
        let (a, b) = self.domain();
        let points = self.points_at(&linspace(a, b, resolution.max(2)));
        points.windows(2).map(|w| (w[1] - w[0]).length()).sum()
    }
}

impl<C: Curve + ?Sized> Curve for Arc<C> {
    fn point_at(&self, t: f64) -> Point3 {
        (**self).point_at(t)
    }

    fn domain(&self) -> (f64, f64) {
        (**self).domain()
    }

    fn points_at(&self, ts: &[f64]) -> Vec<Point3> {
        (**self).points_at(ts)
    }

    fn tangent_delta(&self) -> f64 {
        (**self).tangent_delta()
    }

    fn derivatives_at(&self, t: f64, n: usize) -> Vec<Vector3> {
        (**self).derivatives_at(t, n)
    }

    fn tangent_at(&self, t: f64) -> Vector3 {
        (**self).tangent_at(t)
    }

    fn tangents_at(&self, ts: &[f64]) -> Vec<Vector3> {
        (**self).tangents_at(ts)
    }

    fn second_derivative_at(&self, t: f64) -> Vector3 {
        (**self).second_derivative_at(t)
    }

    fn third_derivative_at(&self, t: f64) -> Vector3 {
        (**self).third_derivative_at(t)
    }

    fn to_nurbs(&self) -> Result<NurbsCurve> {
        (**self).to_nurbs()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }

    fn try_point_at(&self, t: f64) -> Result<Point3> {
        (**self).try_point_at(t)
    }

    fn curvature_at(&self, t: f64) -> f64 {
        (**self).curvature_at(t)
    }

    fn torsion_at(&self, t: f64) -> f64 {
        (**self).torsion_at(t)
    }

    fn frenet_frame_at(&self, t: f64) -> Result<FrenetFrame> {
        (**self).frenet_frame_at(t)
    }

    fn arc_length(&self, resolution: usize) -> f64 {
        (**self).arc_length(resolution)
    }
}

/// Central finite differences of orders `1..=n`, with the stencil shifted to
/// stay inside the domain. Index 0 holds the point itself.
pub fn numeric_derivatives<C: Curve + ?Sized>(curve: &C, t: f64, n: usize, h: f64) -> Vec<Vector3> {
    let (a, b) = curve.domain();
    let mut result = Vec::with_capacity(n + 1);
    result.push(curve.point_at(t));
    for k in 1..=n {
        let half = 0.5 * k as f64 * h;
        let center = if b - a > 2.0 * half {
            t.clamp(a + half, b - half)
        } else {
            t
        };
        let mut sum = Vector3::ZERO;
        let mut coeff = 1.0;
        for i in 0..=k {
            let s = center + (0.5 * k as f64 - i as f64) * h;
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            sum += sign * coeff * curve.point_at(s);
            coeff = coeff * (k - i) as f64 / (i + 1) as f64;
        }
        result.push(sum / h.powi(k as i32));
    }
    result
}
