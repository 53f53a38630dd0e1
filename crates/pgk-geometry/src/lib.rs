//! PGK geometry: knot vectors, NURBS curves and surfaces, and the algorithms
//! that build, transform and sample them.

pub mod batch;
pub mod construct;
pub mod curve;
pub mod frame;
pub mod nurbs;
pub mod sampling;
pub mod surface;

pub use batch::evaluate_curves_parallel;
pub use curve::{Curve, CurveRef, NurbsCurve};
pub use frame::{CurveFrames, FrameAlgorithm};
pub use nurbs::{KnotVector, NurbsBackend};
pub use surface::{NurbsSurface, Surface, SurfaceDirection};
