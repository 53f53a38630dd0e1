//! Planar surface.

use pgk_core::{KernelError, Result};
use pgk_math::{DVec3, Plane, Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::{NurbsSurface, Surface};

/// A planar surface parameterized by `origin + u * u_axis + v * v_axis`.
///
/// The domain defaults to `[-1e6, 1e6]` in both u and v (effectively infinite).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanarSurface {
    pub origin: Point3,
    pub u_axis: Vector3,
    pub v_axis: Vector3,
    pub u_range: (f64, f64),
    pub v_range: (f64, f64),
}

impl PlanarSurface {
    pub fn new(origin: Point3, u_axis: Vector3, v_axis: Vector3) -> Self {
        Self {
            origin,
            u_axis,
            v_axis,
            u_range: (-1e6, 1e6),
            v_range: (-1e6, 1e6),
        }
    }

    /// XY plane centered at origin.
    pub fn xy() -> Self {
        Self::new(DVec3::ZERO, DVec3::X, DVec3::Y)
    }

    /// Planar surface spanning a [`Plane`] with orthonormal in-plane axes.
    pub fn from_plane(plane: &Plane) -> Self {
        let u_axis = pgk_math::any_orthogonal(plane.normal).normalize();
        let v_axis = plane.normal.cross(u_axis);
        Self::new(plane.origin, u_axis, v_axis)
    }

    pub fn with_domain(mut self, u_range: (f64, f64), v_range: (f64, f64)) -> Self {
        self.u_range = u_range;
        self.v_range = v_range;
        self
    }

    pub fn plane(&self) -> Plane {
        Plane::new(self.origin, self.normal_at(0.0, 0.0))
    }
}

impl Surface for PlanarSurface {
    fn point_at(&self, u: f64, v: f64) -> Point3 {
        self.origin + u * self.u_axis + v * self.v_axis
    }

    fn domain_u(&self) -> (f64, f64) {
        self.u_range
    }

    fn domain_v(&self) -> (f64, f64) {
        self.v_range
    }

    fn partial_derivatives_at(&self, _u: f64, _v: f64) -> (Vector3, Vector3) {
        (self.u_axis, self.v_axis)
    }

    /// Bilinear patch over the current domain.
    fn to_nurbs(&self) -> Result<NurbsSurface> {
        let ((u0, u1), (v0, v1)) = (self.u_range, self.v_range);
        if u1 <= u0 || v1 <= v0 {
            return Err(KernelError::InvalidInput(format!(
                "empty planar domain [{u0}, {u1}] x [{v0}, {v1}]"
            )));
        }
        let net = vec![
            vec![self.point_at(u0, v0), self.point_at(u0, v1)],
            vec![self.point_at(u1, v0), self.point_at(u1, v1)],
        ];
        NurbsSurface::bspline(1, 1, vec![u0, u0, u1, u1], vec![v0, v0, v1, v1], net)
    }
}
