//! Lazy views over another curve: a sub-range, a remapped domain, or the
//! reversed direction.

use pgk_core::{KernelError, Result};
use pgk_math::{Point3, Vector3};

use super::{Curve, CurveRef, NurbsCurve};

/// The part of `curve` between `t_min` and `t_max`, evaluated on demand.
#[derive(Debug, Clone)]
pub struct CurveSegment {
    curve: CurveRef,
    t_min: f64,
    t_max: f64,
    rescale: bool,
}

impl CurveSegment {
    /// With `rescale` the segment is parametrized over `[0, 1]`, otherwise
    /// over `[t_min, t_max]`.
    pub fn new(curve: CurveRef, t_min: f64, t_max: f64, rescale: bool) -> Result<Self> {
        let (a, b) = curve.domain();
        if t_max <= t_min {
            return Err(KernelError::InvalidInput(format!("empty segment [{t_min}, {t_max}]")));
        }
        let eps = 1e-9 * (1.0 + (b - a).abs());
        if t_min < a - eps || t_max > b + eps {
            let t = if t_min < a - eps { t_min } else { t_max };
            return Err(KernelError::Domain { t, min: a, max: b });
        }
        Ok(Self {
            curve,
            t_min,
            t_max,
            rescale,
        })
    }

    fn scale(&self) -> f64 {
        if self.rescale {
            self.t_max - self.t_min
        } else {
            1.0
        }
    }

    fn inner(&self, t: f64) -> f64 {
        if self.rescale {
            self.t_min + t * (self.t_max - self.t_min)
        } else {
            t
        }
    }
}

impl Curve for CurveSegment {
    fn point_at(&self, t: f64) -> Point3 {
        self.curve.point_at(self.inner(t))
    }

    fn domain(&self) -> (f64, f64) {
        if self.rescale {
            (0.0, 1.0)
        } else {
            (self.t_min, self.t_max)
        }
    }

    fn derivatives_at(&self, t: f64, n: usize) -> Vec<Vector3> {
        scale_derivatives(self.curve.derivatives_at(self.inner(t), n), self.scale())
    }

    /// The NURBS form of some curves (arcs) uses a different
    /// parametrization, so the cut parameters are located by projecting the
    /// segment end points onto it.
    fn to_nurbs(&self) -> Result<NurbsCurve> {
        let nurbs = self.curve.to_nurbs()?;
        let s_min = nurbs.closest_parameter(self.curve.point_at(self.t_min), self.t_min);
        let s_max = nurbs.closest_parameter(self.curve.point_at(self.t_max), self.t_max);
        let (a, b) = self.domain();
        nurbs.cut_segment(s_min, s_max, false)?.reparametrize(a, b)
    }
}

/// `curve` with its domain mapped affinely onto `[new_min, new_max]`.
#[derive(Debug, Clone)]
pub struct ReparametrizedCurve {
    curve: CurveRef,
    new_min: f64,
    new_max: f64,
}

impl ReparametrizedCurve {
    pub fn new(curve: CurveRef, new_min: f64, new_max: f64) -> Result<Self> {
        if new_max <= new_min {
            return Err(KernelError::InvalidInput(format!(
                "invalid target domain [{new_min}, {new_max}]"
            )));
        }
        Ok(Self {
            curve,
            new_min,
            new_max,
        })
    }

    /// d(inner parameter) / d(outer parameter).
    fn scale(&self) -> f64 {
        let (a, b) = self.curve.domain();
        (b - a) / (self.new_max - self.new_min)
    }

    fn inner(&self, t: f64) -> f64 {
        let (a, b) = self.curve.domain();
        a + (t - self.new_min) / (self.new_max - self.new_min) * (b - a)
    }
}

impl Curve for ReparametrizedCurve {
    fn point_at(&self, t: f64) -> Point3 {
        self.curve.point_at(self.inner(t))
    }

    fn domain(&self) -> (f64, f64) {
        (self.new_min, self.new_max)
    }

    fn derivatives_at(&self, t: f64, n: usize) -> Vec<Vector3> {
        scale_derivatives(self.curve.derivatives_at(self.inner(t), n), self.scale())
    }

    fn to_nurbs(&self) -> Result<NurbsCurve> {
        self.curve.to_nurbs()?.reparametrize(self.new_min, self.new_max)
    }
}

/// `curve` traversed from its end to its start over the same domain.
#[derive(Debug, Clone)]
pub struct ReversedCurve {
    curve: CurveRef,
}

impl ReversedCurve {
    pub fn new(curve: CurveRef) -> Self {
        Self { curve }
    }

    fn inner(&self, t: f64) -> f64 {
        let (a, b) = self.curve.domain();
        a + b - t
    }
}

impl Curve for ReversedCurve {
    fn point_at(&self, t: f64) -> Point3 {
        self.curve.point_at(self.inner(t))
    }

    fn domain(&self) -> (f64, f64) {
        self.curve.domain()
    }

    fn derivatives_at(&self, t: f64, n: usize) -> Vec<Vector3> {
        scale_derivatives(self.curve.derivatives_at(self.inner(t), n), -1.0)
    }

    fn to_nurbs(&self) -> Result<NurbsCurve> {
        Ok(self.curve.to_nurbs()?.reverse())
    }
}

/// Chain rule for `t -> s * t`: the k-th derivative scales by `s^k`.
fn scale_derivatives(ders: Vec<Vector3>, s: f64) -> Vec<Vector3> {
    ders.into_iter()
        .enumerate()
        .map(|(k, d)| d * s.powi(k as i32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Circle;
    use pgk_math::{dvec3, DVec3};
    use std::f64::consts::PI;
    use std::sync::Arc;

    fn circle() -> CurveRef {
        Arc::new(Circle::new(DVec3::ZERO, DVec3::Z, 2.0))
    }

    #[test]
    fn test_segment_rescaled() {
        let seg = CurveSegment::new(circle(), 0.0, PI, true).unwrap();
        assert_eq!(seg.domain(), (0.0, 1.0));
        assert!((seg.point_at(1.0) - circle().point_at(PI)).length() < 1e-12);
        let t = seg.tangent_at(0.5);
        assert!((t - circle().tangent_at(PI / 2.0) * PI).length() < 1e-12);
        assert!(CurveSegment::new(circle(), 1.0, 10.0, false).is_err());
    }

    #[test]
    fn test_segment_to_nurbs() {
        let seg = CurveSegment::new(circle(), 0.5, 2.5, false).unwrap();
        let nurbs = seg.to_nurbs().unwrap();
        assert_eq!(nurbs.domain(), (0.5, 2.5));
        for i in 0..=10 {
            let t = 0.5 + 0.2 * i as f64;
            assert!((nurbs.point_at(t).length() - 2.0).abs() < 1e-10);
        }
        assert!((nurbs.point_at(2.5) - seg.point_at(2.5)).length() < 1e-10);
    }

    #[test]
    fn test_reparametrized_chain_rule() {
        let re = ReparametrizedCurve::new(circle(), 0.0, 1.0).unwrap();
        let d = re.derivatives_at(0.25, 2);
        let inner = circle().derivatives_at(PI / 2.0, 2);
        assert!((d[0] - inner[0]).length() < 1e-12);
        assert!((d[1] - inner[1] * 2.0 * PI).length() < 1e-10);
        assert!((d[2] - inner[2] * 4.0 * PI * PI).length() < 1e-9);
    }

    #[test]
    fn test_reversed() {
        let rev = ReversedCurve::new(circle());
        assert!((rev.point_at(0.0) - dvec3(2.0, 0.0, 0.0)).length() < 1e-12);
        let t = rev.tangent_at(PI / 2.0);
        assert!((t + circle().tangent_at(3.0 * PI / 2.0)).length() < 1e-12);
        let nurbs = rev.to_nurbs().unwrap();
        assert!((nurbs.point_at(PI / 2.0) - rev.point_at(PI / 2.0)).length() < 1e-10);
    }
}
