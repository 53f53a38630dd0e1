//! PGK intersection layer: bracketed root search, nonlinear solvers and the
//! curve/curve, curve/plane, curve/surface and ray casting queries built on
//! them.

pub mod curves;
pub mod implicit;
pub mod plane;
pub mod root;
pub mod solver;
pub mod surface;

pub use curves::{intersect_nurbs_curves, CurveCurveHit, CurveIntersectionOptions};
pub use implicit::{raycast_implicit, ImplicitHit, ImplicitRaycastOptions, ScalarField};
pub use plane::{intersect_curve_plane, PlaneIntersectionMethod, PlaneIntersectionOptions};
pub use solver::{solve_system, Bounds, NonlinearMethod, Solution};
pub use surface::{
    intersect_curve_surface, raycast_surface, CurveSurfaceHit, RayHit, SurfaceIntersectionOptions,
    SurfaceRaycastOptions,
};
