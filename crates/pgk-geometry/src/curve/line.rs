//! Line segment curve.

use pgk_core::Result;
use pgk_math::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::{Curve, NurbsCurve};

/// A line segment from `start` to `end`, parameterized over `[t_min, t_max]`
/// (`[0, 1]` by default).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    pub start: Point3,
    pub end: Point3,
    pub t_min: f64,
    pub t_max: f64,
}

impl Line {
    pub fn new(start: Point3, end: Point3) -> Self {
        Self {
            start,
            end,
            t_min: 0.0,
            t_max: 1.0,
        }
    }

    pub fn with_domain(mut self, t_min: f64, t_max: f64) -> Self {
        self.t_min = t_min;
        self.t_max = t_max;
        self
    }

    fn velocity(&self) -> Vector3 {
        (self.end - self.start) / (self.t_max - self.t_min)
    }
}

impl Curve for Line {
    fn point_at(&self, t: f64) -> Point3 {
        self.start + (t - self.t_min) * self.velocity()
    }

    fn domain(&self) -> (f64, f64) {
        (self.t_min, self.t_max)
    }

    fn derivatives_at(&self, t: f64, n: usize) -> Vec<Vector3> {
        let mut result = vec![Vector3::ZERO; n + 1];
        result[0] = self.point_at(t);
        if n >= 1 {
            result[1] = self.velocity();
        }
        result
    }

    fn to_nurbs(&self) -> Result<NurbsCurve> {
        NurbsCurve::bspline(
            1,
            vec![self.t_min, self.t_min, self.t_max, self.t_max],
            vec![self.start, self.end],
        )
    }
}
