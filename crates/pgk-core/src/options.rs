//! Option structs shared by the iterative algorithms.

use serde::{Deserialize, Serialize};

/// Iteration budget for bounded numerical loops.
///
/// Every iterative algorithm in the kernel stops after `max_iterations`
/// steps; reaching the cap without meeting `tolerance` is reported as an
/// error, never retried.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl SolverOptions {
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
        }
    }

    pub fn with_accuracy(mut self, accuracy: i32) -> Self {
        self.tolerance = 10f64.powi(-accuracy);
        self
    }
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-6,
        }
    }
}

/// What a search does when it finds nothing for one of its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OnFailure {
    /// Return an error.
    Fail,
    /// Leave the input out of the result.
    #[default]
    Skip,
    /// Abandon the whole search and report "nothing".
    ReturnNone,
}
