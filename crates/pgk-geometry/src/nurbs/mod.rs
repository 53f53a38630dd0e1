//! NURBS core algorithms: knot vectors, rational evaluation, knot refinement
//! and degree change.

pub mod deboor;
pub mod degree;
pub mod knot;
pub mod refine;

pub use deboor::{from_homogeneous, to_homogeneous};
pub use knot::{basis_function_derivs, basis_functions, find_span, KnotVector, KNOT_TOLERANCE};
pub use refine::Rows;

use serde::{Deserialize, Serialize};

/// Linear solver used when a construction needs one.
///
/// The tag is chosen when a curve is built and carried by the result so
/// derived constructions keep using the same solver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NurbsBackend {
    /// Banded LU without pivoting on the collocation matrix.
    #[default]
    Native,
    /// Dense LU from `nalgebra`.
    #[cfg(feature = "dense-backend")]
    Dense,
}
