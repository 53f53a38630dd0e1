//! Spherical surface.

use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2, PI, TAU};

use pgk_core::{KernelError, Result};
use pgk_math::{DVec3, Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::{NurbsSurface, Surface};

/// A spherical surface parameterized by longitude `u` in `[0, 2*PI]` and
/// latitude `v` in `[-PI/2, PI/2]`.
///
/// Points are computed as:
/// `P(u, v) = center + radius * (cos(v)*cos(u), cos(v)*sin(u), sin(v))`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SphericalSurface {
    pub center: Point3,
    pub radius: f64,
}

impl SphericalSurface {
    pub fn new(center: Point3, radius: f64) -> Self {
        Self { center, radius }
    }

    fn direction(u: f64, v: f64) -> Vector3 {
        DVec3::new(v.cos() * u.cos(), v.cos() * u.sin(), v.sin())
    }
}

impl Surface for SphericalSurface {
    fn point_at(&self, u: f64, v: f64) -> Point3 {
        self.center + self.radius * Self::direction(u, v)
    }

    fn domain_u(&self) -> (f64, f64) {
        (0.0, TAU)
    }

    fn domain_v(&self) -> (f64, f64) {
        (-FRAC_PI_2, FRAC_PI_2)
    }

    fn partial_derivatives_at(&self, u: f64, v: f64) -> (Vector3, Vector3) {
        let r = self.radius;
        let su = r * DVec3::new(-v.cos() * u.sin(), v.cos() * u.cos(), 0.0);
        let sv = r * DVec3::new(-v.sin() * u.cos(), -v.sin() * u.sin(), v.cos());
        (su, sv)
    }

    /// Outward normal, also at the poles where `S_u` vanishes.
    fn normal_at(&self, u: f64, v: f64) -> Vector3 {
        Self::direction(u, v)
    }

    /// Exact rational biquadratic sphere: a full circle of four quarter arcs
    /// along U swept by a half meridian of two quarter arcs along V.
    fn to_nurbs(&self) -> Result<NurbsSurface> {
        if self.radius <= 0.0 {
            return Err(KernelError::Geometry(format!("sphere radius {} is not positive", self.radius)));
        }
        let w = FRAC_1_SQRT_2;
        let equator = [
            (1.0, 0.0, 1.0),
            (1.0, 1.0, w),
            (0.0, 1.0, 1.0),
            (-1.0, 1.0, w),
            (-1.0, 0.0, 1.0),
            (-1.0, -1.0, w),
            (0.0, -1.0, 1.0),
            (1.0, -1.0, w),
            (1.0, 0.0, 1.0),
        ];
        let meridian = [(0.0, -1.0, 1.0), (1.0, -1.0, w), (1.0, 0.0, 1.0), (1.0, 1.0, w), (0.0, 1.0, 1.0)];

        let mut control_points = Vec::with_capacity(equator.len());
        let mut weights = Vec::with_capacity(equator.len());
        for &(x, y, a) in &equator {
            control_points.push(
                meridian
                    .iter()
                    .map(|&(rho, z, _)| self.center + self.radius * DVec3::new(rho * x, rho * y, z))
                    .collect(),
            );
            weights.push(meridian.iter().map(|&(_, _, b)| a * b).collect());
        }
        let q = FRAC_PI_2;
        let knots_u = vec![0.0, 0.0, 0.0, q, q, PI, PI, 3.0 * q, 3.0 * q, TAU, TAU, TAU];
        let knots_v = vec![-q, -q, -q, 0.0, 0.0, q, q, q];
        NurbsSurface::new(2, 2, knots_u, knots_v, control_points, weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgk_math::linspace;

    #[test]
    fn test_spherical_points_on_sphere() {
        let sphere = SphericalSurface::new(DVec3::ZERO, 3.0);

        for i in 0..8 {
            for j in 0..4 {
                let u = i as f64 * PI / 4.0;
                let v = -PI / 2.0 + j as f64 * PI / 3.0;
                let dist = sphere.point_at(u, v).length();
                assert!((dist - 3.0).abs() < 1e-10, "u={u}, v={v}: dist={dist}");
            }
        }
    }

    #[test]
    fn test_spherical_poles() {
        let sphere = SphericalSurface::new(DVec3::ZERO, 1.0);
        assert!((sphere.point_at(0.0, PI / 2.0) - DVec3::Z).length() < 1e-10);
        assert!((sphere.point_at(0.0, -PI / 2.0) + DVec3::Z).length() < 1e-10);
        assert!((sphere.normal_at(1.0, PI / 2.0) - DVec3::Z).length() < 1e-10);
    }

    #[test]
    fn test_spherical_normal_outward() {
        let sphere = SphericalSurface::new(DVec3::new(1.0, 2.0, 3.0), 2.0);
        for i in 0..8 {
            let (u, v) = (i as f64 * PI / 4.0, 0.3);
            let expected = (sphere.point_at(u, v) - sphere.center).normalize();
            assert!((sphere.normal_at(u, v) - expected).length() < 1e-10);
        }
    }

    #[test]
    fn test_analytic_partials_match_differences() {
        let sphere = SphericalSurface::new(DVec3::ZERO, 2.0);
        let (u, v, h) = (0.7, -0.4, 1e-6);
        let (su, sv) = sphere.partial_derivatives_at(u, v);
        let du = (sphere.point_at(u + h, v) - sphere.point_at(u - h, v)) / (2.0 * h);
        let dv = (sphere.point_at(u, v + h) - sphere.point_at(u, v - h)) / (2.0 * h);
        assert!((su - du).length() < 1e-6);
        assert!((sv - dv).length() < 1e-6);
    }

    #[test]
    fn test_to_nurbs_lies_on_sphere() {
        let center = DVec3::new(1.0, -1.0, 0.5);
        let sphere = SphericalSurface::new(center, 1.5);
        let nurbs = sphere.to_nurbs().unwrap();
        for u in linspace(0.0, TAU, 17) {
            for v in linspace(-FRAC_PI_2, FRAC_PI_2, 9) {
                let r = (nurbs.point_at(u, v) - center).length();
                assert!((r - 1.5).abs() < 1e-9, "u={u}, v={v}: r={r}");
            }
        }
        for (u, v) in [(0.0, 0.0), (PI, 0.0), (FRAC_PI_2, FRAC_PI_2)] {
            assert!((nurbs.point_at(u, v) - sphere.point_at(u, v)).length() < 1e-9);
        }
    }
}
