//! Offset curves: a fixed vector carried along a moving frame.

use std::sync::Arc;

use pgk_core::{KernelError, Result, Tolerance};
use pgk_math::{linspace, Point3, Vector3};

use super::{Curve, CurveRef, NurbsCurve};
use crate::construct::{interpolate_nurbs_curve, interpolate_nurbs_curve_with_tangents, InterpolationOptions};
use crate::frame::{CurveFrames, FrameAlgorithm};
use crate::nurbs::{NurbsBackend, KNOT_TOLERANCE};

/// Samples used by [`OffsetCurve::to_nurbs`].
const OFFSET_FIT_SAMPLES: usize = 64;

/// `C(t) + F(t) * offset`, where `F(t)` is the frame of the base curve and
/// `offset` is given in frame coordinates (normal, binormal, tangent).
///
/// Evaluated lazily and exactly. Derivatives are numeric.
#[derive(Debug, Clone)]
pub struct OffsetCurve {
    frames: CurveFrames,
    offset: Vector3,
}

impl OffsetCurve {
    pub fn new(curve: CurveRef, offset: Vector3, algorithm: FrameAlgorithm) -> Result<Self> {
        Ok(Self {
            frames: CurveFrames::new(curve, algorithm)?,
            offset,
        })
    }

    pub fn base(&self) -> &CurveRef {
        self.frames.curve()
    }

    pub fn offset(&self) -> Vector3 {
        self.offset
    }

    pub fn algorithm(&self) -> FrameAlgorithm {
        self.frames.algorithm()
    }

    fn offset_point(&self, t: f64) -> Result<Point3> {
        let frame = self.frames.frame_at(t)?;
        Ok(self.base().point_at(t) + frame * self.offset)
    }
}

impl Curve for OffsetCurve {
    /// Where the frame is undefined (Frenet at zero curvature) the base
    /// point is returned; use `try_point_at` to get the error instead.
    fn point_at(&self, t: f64) -> Point3 {
        match self.offset_point(t) {
            Ok(p) => p,
            Err(err) => {
                log::warn!("offset frame unavailable at {t}: {err}");
                self.base().point_at(t)
            }
        }
    }

    fn domain(&self) -> (f64, f64) {
        self.base().domain()
    }

    fn try_point_at(&self, t: f64) -> Result<Point3> {
        let (min, max) = self.domain();
        let eps = 1e-9 * (1.0 + (max - min).abs());
        if t < min - eps || t > max + eps {
            return Err(KernelError::Domain { t, min, max });
        }
        self.offset_point(t)
    }

    /// Cubic fit through evenly spaced offset points. Approximate.
    fn to_nurbs(&self) -> Result<NurbsCurve> {
        let (a, b) = self.domain();
        let ts = linspace(a, b, OFFSET_FIT_SAMPLES);
        let points = ts.iter().map(|&t| self.offset_point(t)).collect::<Result<Vec<_>>>()?;
        fit_through(&points, ts, 3, NurbsBackend::default(), Tolerance::DEFAULT_LINEAR)
    }
}

/// Offset a NURBS curve into another NURBS curve.
///
/// Offset points are taken at `src_ts` and interpolated with the degree of
/// `curve` using those parameters. For degrees 2 and 3 the offset tangents
/// `(1 - d * k) * T` are matched as well, where `d` is the offset along the
/// principal normal and `k` the curvature. Excessive knots are then removed
/// within `tolerance`. Without `src_ts`, the Greville parameters of `curve`
/// and the midpoints between them are used; more samples give a closer
/// offset.
pub fn offset_nurbs_curve(
    curve: &NurbsCurve,
    offset: Vector3,
    algorithm: FrameAlgorithm,
    src_ts: Option<&[f64]>,
    tolerance: f64,
) -> Result<NurbsCurve> {
    let mut ts = match src_ts {
        Some(ts) => ts.to_vec(),
        None => {
            let greville = curve.greville_parameters();
            let mut ts = Vec::with_capacity(2 * greville.len());
            for w in greville.windows(2) {
                ts.push(w[0]);
                ts.push(0.5 * (w[0] + w[1]));
            }
            ts.extend(greville.last());
            ts
        }
    };
    ts.sort_by(f64::total_cmp);
    ts.dedup_by(|x, y| (*x - *y).abs() <= KNOT_TOLERANCE);
    if ts.len() < 2 {
        return Err(KernelError::InvalidInput("offset needs at least two sample parameters".into()));
    }

    let frames = CurveFrames::new(Arc::new(curve.clone()), algorithm)?;
    let matrices = frames.frames_at(&ts)?;
    let shifts: Vec<Vector3> = matrices.iter().map(|m| *m * offset).collect();
    let points: Vec<Point3> = ts.iter().zip(&shifts).map(|(&t, d)| curve.point_at(t) + *d).collect();
    log::debug!("offsetting through {} samples with {algorithm:?}", ts.len());
    let degree = curve.degree();
    if !matches!(degree, 2 | 3) {
        return fit_through(&points, ts, degree, curve.backend(), tolerance);
    }

    let tangents: Vec<Vector3> = ts
        .iter()
        .zip(&shifts)
        .map(|(&t, shift)| {
            let tangent = curve.tangent_at(t);
            match curve.frenet_frame_at(t) {
                Ok(frame) => (1.0 - shift.dot(frame.normal) * curve.curvature_at(t)) * tangent,
                Err(_) => tangent,
            }
        })
        .collect();
    let options = InterpolationOptions {
        degree,
        tknots: Some(ts),
        backend: curve.backend(),
        ..InterpolationOptions::default()
    };
    interpolate_nurbs_curve_with_tangents(&points, &tangents, &options)?.remove_excessive_knots(tolerance)
}

fn fit_through(points: &[Point3], ts: Vec<f64>, degree: usize, backend: NurbsBackend, tolerance: f64) -> Result<NurbsCurve> {
    let options = InterpolationOptions {
        degree,
        tknots: Some(ts),
        backend,
        ..InterpolationOptions::default()
    };
    interpolate_nurbs_curve(points, &options)?.remove_excessive_knots(tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{Circle, Line};
    use pgk_math::{dvec3, DVec3};

    #[test]
    fn test_offset_circle_is_concentric() {
        let circle: CurveRef = Arc::new(Circle::new(DVec3::ZERO, DVec3::Z, 2.0));
        let offset = OffsetCurve::new(circle, dvec3(0.5, 0.0, 0.0), FrameAlgorithm::Frenet).unwrap();
        for t in linspace(0.0, 6.0, 13) {
            let p = offset.point_at(t);
            assert!((p.length() - 1.5).abs() < 1e-9);
            assert!(p.z.abs() < 1e-9);
        }
    }

    #[test]
    fn test_binormal_offset_lifts_planar_curve() {
        let circle: CurveRef = Arc::new(Circle::new(DVec3::ZERO, DVec3::Z, 1.0));
        let offset = OffsetCurve::new(circle, dvec3(0.0, 0.25, 0.0), FrameAlgorithm::PlaneNormal(DVec3::Z)).unwrap();
        assert!((offset.point_at(1.0).z - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_frenet_offset_of_line_reports_zero_curvature() {
        let line: CurveRef = Arc::new(Line::new(DVec3::ZERO, DVec3::X));
        let offset = OffsetCurve::new(line, DVec3::X, FrameAlgorithm::Frenet).unwrap();
        assert!(matches!(offset.try_point_at(0.5), Err(KernelError::ZeroCurvature { .. })));
        assert!((offset.point_at(0.5) - dvec3(0.5, 0.0, 0.0)).length() < 1e-12);
        assert!(matches!(offset.try_point_at(3.0), Err(KernelError::Domain { .. })));

        let shared: CurveRef = Arc::new(offset);
        assert!(matches!(shared.try_point_at(0.5), Err(KernelError::ZeroCurvature { .. })));
    }

    #[test]
    fn test_offset_nurbs_circle() {
        let circle = Circle::new(DVec3::ZERO, DVec3::Z, 2.0).to_nurbs().unwrap();
        let ts = linspace(0.0, std::f64::consts::TAU, 33);
        let result = offset_nurbs_curve(&circle, dvec3(-1.0, 0.0, 0.0), FrameAlgorithm::Frenet, Some(&ts), 1e-6).unwrap();
        assert_eq!(result.degree(), 2);
        let (a, b) = result.domain();
        for t in linspace(a, b, 401) {
            assert!((result.point_at(t).length() - 3.0).abs() < 2e-4);
        }
        for &t in &ts {
            let expected = 1.5 * circle.tangent_at(t);
            assert!((result.tangent_at(t) - expected).length() < 1e-3 * expected.length());
        }

        // Greville parameters and their midpoints.
        let coarse = offset_nurbs_curve(&circle, dvec3(-1.0, 0.0, 0.0), FrameAlgorithm::Frenet, None, 1e-6).unwrap();
        for t in linspace(a, b, 401) {
            assert!((coarse.point_at(t).length() - 3.0).abs() < 1.5e-3);
        }
    }

    #[test]
    fn test_offset_nurbs_line_is_straight() {
        let line = NurbsCurve::bspline(
            3,
            vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
            vec![dvec3(0.0, 0.0, 0.0), dvec3(1.0, 0.0, 0.0), dvec3(2.0, 0.0, 0.0), dvec3(3.0, 0.0, 0.0)],
        )
        .unwrap();
        // Track keeps the normal on +Y for a curve along X.
        let result = offset_nurbs_curve(&line, dvec3(1.0, 0.0, 0.0), FrameAlgorithm::Track, None, 1e-9).unwrap();
        for t in linspace(0.0, 1.0, 11) {
            let p = result.point_at(t);
            assert!((p - dvec3(3.0 * t, 1.0, 0.0)).length() < 1e-9);
        }
    }
}
