//! Nonlinear solvers for square 3x3 systems `F(x) = 0`.

use nalgebra::{Matrix3, Vector3};
use pgk_core::{KernelError, Result, SolverOptions};
use serde::{Deserialize, Serialize};

/// Iteration scheme used by [`solve_system`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NonlinearMethod {
    /// Full Newton steps with the analytic Jacobian.
    #[default]
    Newton,
    /// Damped Gauss-Newton with an adaptive damping factor.
    LevenbergMarquardt,
    /// Jacobian evaluated once, then updated by Broyden's rank-one rule.
    Broyden,
}

/// Axis-aligned box the unknowns are kept in during iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vector3<f64>,
    pub max: Vector3<f64>,
}

impl Bounds {
    pub fn new(min: Vector3<f64>, max: Vector3<f64>) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, x: Vector3<f64>) -> Vector3<f64> {
        x.zip_zip_map(&self.min, &self.max, |v, lo, hi| v.clamp(lo, hi))
    }

    pub fn contains(&self, x: &Vector3<f64>, eps: f64) -> bool {
        (0..3).all(|i| x[i] >= self.min[i] - eps && x[i] <= self.max[i] + eps)
    }
}

/// A converged solution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solution {
    pub x: Vector3<f64>,
    /// `|F(x)|` at the solution.
    pub residual: f64,
    pub iterations: usize,
}

/// Solve `F(x) = 0` starting from `x0`.
///
/// `value` evaluates `F` and `jacobian` its derivative matrix. Converges
/// when `|F(x)| <= options.tolerance`; reaching `options.max_iterations`
/// first is a `SolverDiverged` error. With `bounds`, every iterate is
/// clamped into the box.
pub fn solve_system<F, J>(
    value: F,
    jacobian: J,
    x0: Vector3<f64>,
    method: NonlinearMethod,
    bounds: Option<&Bounds>,
    options: &SolverOptions,
) -> Result<Solution>
where
    F: Fn(&Vector3<f64>) -> Vector3<f64>,
    J: Fn(&Vector3<f64>) -> Matrix3<f64>,
{
    let project = |x: Vector3<f64>| bounds.map_or(x, |b| b.clamp(x));
    let mut x = project(x0);
    let mut fx = value(&x);
    let mut lambda = 1e-3;
    let mut broyden: Option<Matrix3<f64>> = None;

    for iteration in 0..options.max_iterations {
        let residual = fx.norm();
        if residual <= options.tolerance {
            log::trace!("{method:?} converged after {iteration} iterations, residual {residual:e}");
            return Ok(Solution { x, residual, iterations: iteration });
        }
        match method {
            NonlinearMethod::Newton => {
                let step = jacobian(&x).lu().solve(&(-fx)).ok_or_else(|| singular(iteration, residual))?;
                x = project(x + step);
                fx = value(&x);
            }
            NonlinearMethod::LevenbergMarquardt => {
                let j = jacobian(&x);
                let jtj = j.transpose() * j;
                let gradient = j.transpose() * fx;
                let damped = jtj + Matrix3::from_diagonal(&jtj.diagonal().map(|d| lambda * (d + 1e-12)));
                let step = damped.lu().solve(&(-gradient)).ok_or_else(|| singular(iteration, residual))?;
                let trial = project(x + step);
                let f_trial = value(&trial);
                if f_trial.norm() < residual {
                    x = trial;
                    fx = f_trial;
                    lambda = (lambda * 0.1).max(1e-12);
                } else {
                    lambda *= 10.0;
                    if lambda > 1e12 {
                        break;
                    }
                }
            }
            NonlinearMethod::Broyden => {
                let j = broyden.unwrap_or_else(|| jacobian(&x));
                let step = j.lu().solve(&(-fx)).ok_or_else(|| singular(iteration, residual))?;
                let next = project(x + step);
                let f_next = value(&next);
                let dx = next - x;
                let df = f_next - fx;
                let denom = dx.norm_squared();
                broyden = Some(if denom > 0.0 {
                    j + (df - j * dx) * dx.transpose() / denom
                } else {
                    jacobian(&next)
                });
                x = next;
                fx = f_next;
            }
        }
    }
    let residual = fx.norm();
    if residual <= options.tolerance {
        return Ok(Solution { x, residual, iterations: options.max_iterations });
    }
    Err(KernelError::SolverDiverged {
        message: format!("{method:?} stopped at {:?}", x.as_slice()),
        iterations: options.max_iterations,
        residual,
    })
}

fn singular(iteration: usize, residual: f64) -> KernelError {
    KernelError::SolverDiverged {
        message: "singular Jacobian".into(),
        iterations: iteration,
        residual,
    }
}
