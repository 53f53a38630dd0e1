//! Moving frames along curves.
//!
//! A frame is a [`DMat3`] whose columns are `[normal, binormal, tangent]`,
//! all unit length and right-handed.

use pgk_core::{KernelError, Result};
use pgk_math::{any_orthogonal, linspace, DMat3, DQuat, DVec3, Vector3};
use serde::{Deserialize, Serialize};

use crate::curve::{Curve, CurveRef};

/// How the normal is chosen around the tangent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum FrameAlgorithm {
    /// Principal normal and binormal. Undefined at zero curvature.
    #[default]
    Frenet,
    /// Frenet frame rotated back by the accumulated torsion, so the frame
    /// does not twist about the tangent.
    ZeroTwist { resolution: usize },
    /// Householder reflection of the global frame taking Z onto the tangent.
    Householder,
    /// Normal follows the global X axis.
    Track,
    /// Shortest rotation taking Z onto the tangent.
    Diff,
    /// Normal propagated along the curve by projection onto successive
    /// normal planes.
    TrackNormal { resolution: usize },
    /// Binormal follows the given plane normal.
    PlaneNormal(Vector3),
}

/// Frame computer for one curve and algorithm.
///
/// Algorithms that integrate along the curve sample it once here.
#[derive(Debug, Clone)]
pub struct CurveFrames {
    curve: CurveRef,
    algorithm: FrameAlgorithm,
    ts: Vec<f64>,
    /// Twist angles for `ZeroTwist`, normals for `TrackNormal`.
    angles: Vec<f64>,
    normals: Vec<Vector3>,
}

impl CurveFrames {
    pub fn new(curve: CurveRef, algorithm: FrameAlgorithm) -> Result<Self> {
        let mut frames = Self {
            curve,
            algorithm,
            ts: Vec::new(),
            angles: Vec::new(),
            normals: Vec::new(),
        };
        match algorithm {
            FrameAlgorithm::ZeroTwist { resolution } => frames.integrate_twist(resolution)?,
            FrameAlgorithm::TrackNormal { resolution } => frames.propagate_normals(resolution)?,
            FrameAlgorithm::PlaneNormal(n) if n.length_squared() < f64::EPSILON => {
                return Err(KernelError::InvalidInput("plane normal must be non-zero".into()));
            }
            _ => {}
        }
        Ok(frames)
    }

    pub fn algorithm(&self) -> FrameAlgorithm {
        self.algorithm
    }

    pub fn curve(&self) -> &CurveRef {
        &self.curve
    }

    pub fn frame_at(&self, t: f64) -> Result<DMat3> {
        let tangent = unit_tangent(self.curve.as_ref(), t)?;
        match self.algorithm {
            FrameAlgorithm::Frenet => {
                let f = self.curve.frenet_frame_at(t)?;
                Ok(DMat3::from_cols(f.normal, f.binormal, f.tangent))
            }
            FrameAlgorithm::ZeroTwist { .. } => {
                let f = self.curve.frenet_frame_at(t)?;
                let angle = -self.interpolate_angle(t);
                let (sin, cos) = angle.sin_cos();
                let normal = cos * f.normal + sin * f.binormal;
                Ok(DMat3::from_cols(normal, f.tangent.cross(normal), f.tangent))
            }
            FrameAlgorithm::Householder => Ok(householder_frame(tangent)),
            FrameAlgorithm::Track => {
                let up = if tangent.cross(DVec3::X).length_squared() < 1e-12 {
                    DVec3::Y
                } else {
                    DVec3::X
                };
                let normal = (up - up.dot(tangent) * tangent).normalize();
                Ok(DMat3::from_cols(normal, tangent.cross(normal), tangent))
            }
            FrameAlgorithm::Diff => {
                let q = DQuat::from_rotation_arc(DVec3::Z, tangent);
                Ok(DMat3::from_cols(q * DVec3::X, q * DVec3::Y, tangent))
            }
            FrameAlgorithm::TrackNormal { .. } => {
                let guess = self.interpolate_normal(t);
                let normal = (guess - guess.dot(tangent) * tangent).try_normalize().unwrap_or_else(|| any_orthogonal(tangent));
                Ok(DMat3::from_cols(normal, tangent.cross(normal), tangent))
            }
            FrameAlgorithm::PlaneNormal(plane_normal) => {
                let binormal = (plane_normal - plane_normal.dot(tangent) * tangent)
                    .try_normalize()
                    .ok_or_else(|| KernelError::Geometry(format!("tangent at {t} is parallel to the plane normal")))?;
                Ok(DMat3::from_cols(binormal.cross(tangent), binormal, tangent))
            }
        }
    }

    pub fn frames_at(&self, ts: &[f64]) -> Result<Vec<DMat3>> {
        ts.iter().map(|&t| self.frame_at(t)).collect()
    }

    fn sample(&mut self, resolution: usize) -> Result<()> {
        if resolution < 2 {
            return Err(KernelError::InvalidInput(format!(
                "frame resolution must be at least 2, got {resolution}"
            )));
        }
        let (a, b) = self.curve.domain();
        self.ts = linspace(a, b, resolution);
        Ok(())
    }

    /// Trapezoid integral of torsion times speed.
    fn integrate_twist(&mut self, resolution: usize) -> Result<()> {
        self.sample(resolution)?;
        let rates: Vec<f64> = self
            .ts
            .iter()
            .map(|&t| self.curve.torsion_at(t) * self.curve.tangent_at(t).length())
            .collect();
        let mut total = 0.0;
        self.angles = Vec::with_capacity(self.ts.len());
        self.angles.push(0.0);
        for i in 1..self.ts.len() {
            total += 0.5 * (rates[i - 1] + rates[i]) * (self.ts[i] - self.ts[i - 1]);
            self.angles.push(total);
        }
        Ok(())
    }

    fn propagate_normals(&mut self, resolution: usize) -> Result<()> {
        self.sample(resolution)?;
        let curve = self.curve.as_ref();
        let t0 = self.ts[0];
        let tangent = unit_tangent(curve, t0)?;
        let mut normal = match curve.frenet_frame_at(t0) {
            Ok(f) => f.normal,
            Err(_) => any_orthogonal(tangent),
        };
        self.normals = Vec::with_capacity(self.ts.len());
        self.normals.push(normal);
        for &t in &self.ts[1..] {
            let tangent = unit_tangent(curve, t)?;
            normal = (normal - normal.dot(tangent) * tangent)
                .try_normalize()
                .unwrap_or_else(|| any_orthogonal(tangent));
            self.normals.push(normal);
        }
        log::trace!("propagated {} normals", self.normals.len());
        Ok(())
    }

    fn locate(&self, t: f64) -> (usize, f64) {
        let last = self.ts.len() - 2;
        let i = self.ts.partition_point(|&s| s <= t).saturating_sub(1).min(last);
        let s = ((t - self.ts[i]) / (self.ts[i + 1] - self.ts[i])).clamp(0.0, 1.0);
        (i, s)
    }

    fn interpolate_angle(&self, t: f64) -> f64 {
        let (i, s) = self.locate(t);
        self.angles[i] + s * (self.angles[i + 1] - self.angles[i])
    }

    fn interpolate_normal(&self, t: f64) -> Vector3 {
        let (i, s) = self.locate(t);
        self.normals[i].lerp(self.normals[i + 1], s)
    }
}

fn unit_tangent(curve: &dyn Curve, t: f64) -> Result<Vector3> {
    curve
        .tangent_at(t)
        .try_normalize()
        .ok_or_else(|| KernelError::Geometry(format!("degenerate tangent at {t}")))
}

fn householder_frame(tangent: Vector3) -> DMat3 {
    let v = DVec3::Z - tangent;
    let vv = v.length_squared();
    let reflect = |x: DVec3| {
        if vv < 1e-24 {
            x
        } else {
            x - v * (2.0 * v.dot(x) / vv)
        }
    };
    let normal = reflect(DVec3::X);
    DMat3::from_cols(normal, tangent.cross(normal), tangent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{Circle, Line};
    use pgk_math::dvec3;
    use std::sync::Arc;

    fn assert_orthonormal(m: &DMat3) {
        for axis in [m.x_axis, m.y_axis, m.z_axis] {
            assert!((axis.length() - 1.0).abs() < 1e-9);
        }
        assert!(m.x_axis.dot(m.y_axis).abs() < 1e-9);
        assert!((m.x_axis.cross(m.y_axis) - m.z_axis).length() < 1e-9);
    }

    fn helix() -> CurveRef {
        let points: Vec<_> = (0..40)
            .map(|i| {
                let t = i as f64 * 0.2;
                dvec3(t.cos(), t.sin(), 0.3 * t)
            })
            .collect();
        Arc::new(crate::curve::CubicSpline::new(points, crate::construct::ParamMetric::Distance).unwrap())
    }

    #[test]
    fn test_every_algorithm_gives_tangent_aligned_frames() {
        let curve = helix();
        for algorithm in [
            FrameAlgorithm::Frenet,
            FrameAlgorithm::ZeroTwist { resolution: 50 },
            FrameAlgorithm::Householder,
            FrameAlgorithm::Track,
            FrameAlgorithm::Diff,
            FrameAlgorithm::TrackNormal { resolution: 50 },
            FrameAlgorithm::PlaneNormal(DVec3::Z),
        ] {
            let frames = CurveFrames::new(curve.clone(), algorithm).unwrap();
            for t in [0.1, 0.5, 0.9] {
                let m = frames.frame_at(t).unwrap();
                assert_orthonormal(&m);
                let tangent = curve.tangent_at(t).normalize();
                assert!((m.z_axis - tangent).length() < 1e-9, "{algorithm:?}");
            }
        }
    }

    #[test]
    fn test_frenet_fails_on_a_line() {
        let line: CurveRef = Arc::new(Line::new(DVec3::ZERO, dvec3(1.0, 0.0, 0.0)));
        let frames = CurveFrames::new(line.clone(), FrameAlgorithm::Frenet).unwrap();
        assert!(matches!(frames.frame_at(0.5), Err(KernelError::ZeroCurvature { .. })));
        let track = CurveFrames::new(line, FrameAlgorithm::TrackNormal { resolution: 10 }).unwrap();
        assert!(track.frame_at(0.5).is_ok());
    }

    #[test]
    fn test_planar_curve_has_no_twist() {
        let circle: CurveRef = Arc::new(Circle::new(DVec3::ZERO, DVec3::Z, 2.0));
        let frenet = CurveFrames::new(circle.clone(), FrameAlgorithm::Frenet).unwrap();
        let zero = CurveFrames::new(circle, FrameAlgorithm::ZeroTwist { resolution: 20 }).unwrap();
        for t in [0.3, 2.0, 5.0] {
            let a = frenet.frame_at(t).unwrap();
            let b = zero.frame_at(t).unwrap();
            assert!((a.x_axis - b.x_axis).length() < 1e-6);
        }
    }

    #[test]
    fn test_plane_normal_binormal() {
        let circle: CurveRef = Arc::new(Circle::new(DVec3::ZERO, DVec3::Z, 1.0));
        let frames = CurveFrames::new(circle, FrameAlgorithm::PlaneNormal(DVec3::Z)).unwrap();
        let m = frames.frame_at(1.0).unwrap();
        assert!((m.y_axis - DVec3::Z).length() < 1e-9);
        // Normal points toward the center for a counter-clockwise circle.
        let inward = -dvec3(1.0f64.cos(), 1.0f64.sin(), 0.0);
        assert!((m.x_axis - inward).length() < 1e-9);
    }

    #[test]
    fn test_householder_identity_along_z() {
        let m = householder_frame(DVec3::Z);
        assert!((m.x_axis - DVec3::X).length() < 1e-12);
        assert!((m.y_axis - DVec3::Y).length() < 1e-12);
    }

    #[test]
    fn test_invalid_options() {
        let circle: CurveRef = Arc::new(Circle::new(DVec3::ZERO, DVec3::Z, 1.0));
        assert!(CurveFrames::new(circle.clone(), FrameAlgorithm::ZeroTwist { resolution: 1 }).is_err());
        assert!(CurveFrames::new(circle, FrameAlgorithm::PlaneNormal(DVec3::ZERO)).is_err());
    }
}
