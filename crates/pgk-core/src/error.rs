use thiserror::Error;

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("Unsupported curve type: {0} can not be converted to NURBS")]
    UnsupportedCurveType(String),

    #[error("Coplanarity error: {message} (deviation {deviation:e}, tolerance {tolerance:e})")]
    Coplanarity {
        message: String,
        deviation: f64,
        tolerance: f64,
    },

    #[error("Knot {knot} can not be removed: error {error:e} exceeds tolerance {tolerance:e} ({removed} of {requested} removed)")]
    KnotRemoval {
        knot: f64,
        requested: usize,
        removed: usize,
        error: f64,
        tolerance: f64,
    },

    #[error("Degree reduction from {from} to {to} is not possible: error {error:e} exceeds tolerance {tolerance:e}")]
    DegreeReduction {
        from: usize,
        to: usize,
        error: f64,
        tolerance: f64,
    },

    #[error("Solver diverged after {iterations} iterations (residual {residual:e}): {message}")]
    SolverDiverged {
        message: String,
        iterations: usize,
        residual: f64,
    },

    #[error("Parameter {t} is outside of domain [{min}, {max}]")]
    Domain { t: f64, min: f64, max: f64 },

    #[error("Curve has zero curvature at t = {t}")]
    ZeroCurvature { t: f64 },

    #[error("Curves #{first} and #{second} do not meet: distance {distance:e} > {max_rho:e}")]
    CurveCoincidence {
        first: usize,
        second: usize,
        distance: f64,
        max_rho: f64,
    },

    #[error("No solution: {0}")]
    NoSolution(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Geometry error: {0}")]
    Geometry(String),
}

impl KernelError {
    /// Whether this error reports a tolerance that could not be met by a
    /// numerical inverse operation (knot removal, degree reduction).
    pub fn is_tolerance_failure(&self) -> bool {
        matches!(
            self,
            KernelError::KnotRemoval { .. } | KernelError::DegreeReduction { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, KernelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerance_failure_family() {
        let e = KernelError::DegreeReduction {
            from: 3,
            to: 2,
            error: 0.1,
            tolerance: 1e-3,
        };
        assert!(e.is_tolerance_failure());
        assert!(!KernelError::NoSolution("x".into()).is_tolerance_failure());
    }

    #[test]
    fn test_coincidence_message_names_indices() {
        let e = KernelError::CurveCoincidence {
            first: 2,
            second: 3,
            distance: 0.5,
            max_rho: 1e-6,
        };
        let msg = e.to_string();
        assert!(msg.contains("#2"));
        assert!(msg.contains("#3"));
    }
}
