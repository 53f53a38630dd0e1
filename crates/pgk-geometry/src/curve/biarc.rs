//! Biarc: two circular arcs joined with a common tangent.

use pgk_core::{KernelError, Result};
use pgk_math::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::{concatenate_nurbs_curves, Circle, Curve, NurbsCurve};

/// Two arcs meeting at `junction` with G1 continuity, matching the end points
/// and end tangents they were built from.
///
/// The domain is `[0, 1]`, split between the arcs in proportion to their
/// lengths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiArc {
    pub arc1: Circle,
    pub arc2: Circle,
    pub junction: Point3,
    /// Parameter of the junction.
    pub split: f64,
}

impl BiArc {
    /// Fit a biarc from `p0` (tangent `t0`) to `p1` (tangent `t1`).
    ///
    /// `p` is the ratio of the first tangent handle length to the second;
    /// `p = 1` is the symmetric solution. Fails with `Coplanarity` when the
    /// tangents and the chord do not lie in one plane within
    /// `planar_tolerance`.
    pub fn calc(p0: Point3, p1: Point3, t0: Vector3, t1: Vector3, p: f64, planar_tolerance: f64) -> Result<Self> {
        if p <= 0.0 {
            return Err(KernelError::InvalidInput(format!("handle ratio must be positive, got {p}")));
        }
        let v = p1 - p0;
        if v.length() < 1e-12 || t0.length() < 1e-12 || t1.length() < 1e-12 {
            return Err(KernelError::InvalidInput("degenerate biarc input".into()));
        }
        let t0 = t0.normalize();
        let t1 = t1.normalize();

        let deviation = t0.dot(t1.cross(v.normalize())).abs();
        if deviation > planar_tolerance {
            return Err(KernelError::Coplanarity {
                message: "biarc tangents and chord are not coplanar".into(),
                deviation,
                tolerance: planar_tolerance,
            });
        }

        let a = 2.0 * p * (t0.dot(t1) - 1.0);
        let b = -2.0 * (p * v.dot(t0) + v.dot(t1));
        let c = v.dot(v);
        let d = if a.abs() < 1e-12 {
            if b.abs() < 1e-12 {
                return Err(KernelError::NoSolution(
                    "parallel tangents perpendicular to the chord".into(),
                ));
            }
            -c / b
        } else {
            let disc = (b * b - 4.0 * a * c).max(0.0).sqrt();
            let r1 = (-b + disc) / (2.0 * a);
            let r2 = (-b - disc) / (2.0 * a);
            r1.max(r2)
        };
        if d <= 0.0 {
            return Err(KernelError::NoSolution("no positive handle length for biarc".into()));
        }

        let d1 = p * d;
        let d2 = d;
        let q1 = p0 + d1 * t0;
        let q2 = p1 - d2 * t1;
        let junction = (d2 * q1 + d1 * q2) / (d1 + d2);
        let tj = q2 - q1;

        let arc1 = Circle::by_start_end_tangent(p0, junction, t0)?;
        let arc2 = Circle::by_start_end_tangent(junction, p1, tj)?;
        let l1 = arc1.arc_length(0);
        let l2 = arc2.arc_length(0);
        log::trace!("biarc handles d1={d1} d2={d2}, arc lengths {l1} {l2}");
        Ok(Self {
            arc1,
            arc2,
            junction,
            split: l1 / (l1 + l2),
        })
    }

    /// Which arc `t` falls on and its angle parameter there, with the
    /// derivative of that angle with respect to `t`.
    fn locate(&self, t: f64) -> (&Circle, f64, f64) {
        if t <= self.split {
            let rate = self.arc1.arc_angle() / self.split;
            (&self.arc1, self.arc1.t_min + t * rate, rate)
        } else {
            let rate = self.arc2.arc_angle() / (1.0 - self.split);
            (&self.arc2, self.arc2.t_min + (t - self.split) * rate, rate)
        }
    }
}

impl Curve for BiArc {
    fn point_at(&self, t: f64) -> Point3 {
        let (arc, theta, _) = self.locate(t);
        arc.point_at(theta)
    }

    fn domain(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    fn derivatives_at(&self, t: f64, n: usize) -> Vec<Vector3> {
        let (arc, theta, rate) = self.locate(t);
        arc.derivatives_at(theta, n)
            .into_iter()
            .enumerate()
            .map(|(k, d)| d * rate.powi(k as i32))
            .collect()
    }

    fn arc_length(&self, _resolution: usize) -> f64 {
        self.arc1.arc_length(0) + self.arc2.arc_length(0)
    }

    fn to_nurbs(&self) -> Result<NurbsCurve> {
        let first = self.arc1.to_nurbs()?.reparametrize(0.0, self.split)?;
        let second = self.arc2.to_nurbs()?.reparametrize(0.0, 1.0 - self.split)?;
        concatenate_nurbs_curves(&[first, second], false, 0.0, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgk_math::{dvec3, linspace};

    #[test]
    fn test_symmetric_biarc_tangents() {
        let v0 = dvec3(3.0, 3.0, 0.0);
        let v1 = dvec3(3.0, 3.0, 0.0);
        let biarc = BiArc::calc(dvec3(0.0, 0.0, 0.0), dvec3(3.0, 0.0, 0.0), v0, v1, 1.0, 1e-6).unwrap();
        assert!((biarc.point_at(0.0) - dvec3(0.0, 0.0, 0.0)).length() < 1e-9);
        assert!((biarc.point_at(1.0) - dvec3(3.0, 0.0, 0.0)).length() < 1e-9);
        assert!((biarc.tangent_at(0.0).normalize() - v0.normalize()).length() < 1e-6);
        assert!((biarc.tangent_at(1.0).normalize() - v1.normalize()).length() < 1e-6);
        assert!((biarc.junction - dvec3(1.5, 0.0, 0.0)).length() < 1e-9);
        assert!((biarc.split - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_junction_is_g1() {
        let biarc = BiArc::calc(
            dvec3(0.0, 0.0, 0.0),
            dvec3(4.0, 1.0, 0.0),
            dvec3(1.0, 2.0, 0.0),
            dvec3(1.0, -0.5, 0.0),
            0.7,
            1e-6,
        )
        .unwrap();
        let s = biarc.split;
        let left = biarc.tangent_at(s - 1e-9).normalize();
        let right = biarc.tangent_at(s + 1e-9).normalize();
        assert!((left - right).length() < 1e-6);
        assert!((biarc.point_at(s) - biarc.junction).length() < 1e-9);
    }

    #[test]
    fn test_non_coplanar_rejected() {
        let err = BiArc::calc(
            dvec3(0.0, 0.0, 0.0),
            dvec3(3.0, 0.0, 0.0),
            dvec3(1.0, 1.0, 0.0),
            dvec3(1.0, 0.0, 1.0),
            1.0,
            1e-6,
        )
        .unwrap_err();
        assert!(matches!(err, KernelError::Coplanarity { .. }));
    }

    #[test]
    fn test_to_nurbs_matches() {
        let biarc = BiArc::calc(
            dvec3(0.0, 0.0, 0.0),
            dvec3(3.0, 0.0, 0.0),
            dvec3(1.0, 1.0, 0.0),
            dvec3(1.0, 1.0, 0.0),
            1.0,
            1e-6,
        )
        .unwrap();
        let nurbs = biarc.to_nurbs().unwrap();
        for t in linspace(0.0, 1.0, 21) {
            let p = nurbs.point_at(t);
            let on_arc1 = ((p - biarc.arc1.center).length() - biarc.arc1.radius).abs() < 1e-9;
            let on_arc2 = ((p - biarc.arc2.center).length() - biarc.arc2.radius).abs() < 1e-9;
            assert!(on_arc1 || on_arc2);
        }
        assert!((nurbs.point_at(0.5) - biarc.junction).length() < 1e-9);
    }
}
