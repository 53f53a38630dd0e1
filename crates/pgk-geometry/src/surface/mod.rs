//! Surface traits and implementations.

mod loft;
mod nurbs;
mod planar;
mod spherical;

use std::fmt;

use pgk_core::{KernelError, Result};
use pgk_math::{Point3, Vector3, DVec3};
use serde::{Deserialize, Serialize};

use crate::curve::DEFAULT_TANGENT_DELTA;

pub use loft::loft_nurbs_surface;
pub use nurbs::{NurbsSurface, NurbsSurfaceData, SurfaceEditOutcome};
pub use planar::PlanarSurface;
pub use spherical::SphericalSurface;

/// One of the two parameter directions of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceDirection {
    U,
    V,
}

impl SurfaceDirection {
    pub fn other(self) -> Self {
        match self {
            SurfaceDirection::U => SurfaceDirection::V,
            SurfaceDirection::V => SurfaceDirection::U,
        }
    }
}

/// Trait for parametric surfaces in 3D space.
pub trait Surface: Send + Sync + fmt::Debug {
    /// Evaluate the surface at parameters `(u, v)`.
    fn point_at(&self, u: f64, v: f64) -> Point3;

    /// Return the u-parameter domain `(u_min, u_max)`.
    fn domain_u(&self) -> (f64, f64);

    /// Return the v-parameter domain `(v_min, v_max)`.
    fn domain_v(&self) -> (f64, f64);

    fn points_at(&self, uvs: &[(f64, f64)]) -> Vec<Point3> {
        uvs.iter().map(|&(u, v)| self.point_at(u, v)).collect()
    }

    /// First partial derivatives `(S_u, S_v)`. Defaults to central
    /// differences.
    fn partial_derivatives_at(&self, u: f64, v: f64) -> (Vector3, Vector3) {
        let h = DEFAULT_TANGENT_DELTA;
        let (u0, u1) = self.domain_u();
        let (v0, v1) = self.domain_v();
        let uc = u.clamp(u0 + h, (u1 - h).max(u0 + h));
        let vc = v.clamp(v0 + h, (v1 - h).max(v0 + h));
        let su = (self.point_at(uc + h, v) - self.point_at(uc - h, v)) / (2.0 * h);
        let sv = (self.point_at(u, vc + h) - self.point_at(u, vc - h)) / (2.0 * h);
        (su, sv)
    }

    /// Unit normal `S_u x S_v`; `Z` where the surface is degenerate.
    fn normal_at(&self, u: f64, v: f64) -> Vector3 {
        let (su, sv) = self.partial_derivatives_at(u, v);
        su.cross(sv).try_normalize().unwrap_or(DVec3::Z)
    }

    /// Exact NURBS form of this surface.
    fn to_nurbs(&self) -> Result<NurbsSurface> {
        Err(KernelError::UnsupportedCurveType(
            std::any::type_name::<Self>().to_string(),
        ))
    }
}
