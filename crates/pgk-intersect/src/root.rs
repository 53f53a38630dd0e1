//! Bracketed scalar root finding.

use pgk_core::{KernelError, Result, SolverOptions};

/// Ridder's method on `[a, b]`, where `f(a)` and `f(b)` differ in sign.
///
/// Stops once successive estimates, or the bracket itself, are closer than
/// `options.tolerance`.
pub fn ridder<F>(f: F, a: f64, b: f64, options: &SolverOptions) -> Result<f64>
where
    F: Fn(f64) -> f64,
{
    let (mut a, mut b) = (a, b);
    let (mut fa, mut fb) = (f(a), f(b));
    if fa == 0.0 {
        return Ok(a);
    }
    if fb == 0.0 {
        return Ok(b);
    }
    if fa.signum() == fb.signum() {
        return Err(KernelError::NoSolution(format!(
            "f({a}) = {fa} and f({b}) = {fb} do not bracket a root"
        )));
    }

    let mut previous = f64::NAN;
    for iteration in 0..options.max_iterations {
        let m = 0.5 * (a + b);
        let fm = f(m);
        let s = (fm * fm - fa * fb).sqrt();
        if fm == 0.0 || s == 0.0 {
            return Ok(m);
        }
        let direction = if fa > fb { 1.0 } else { -1.0 };
        let x = m + (m - a) * direction * fm / s;
        let fx = f(x);
        if fx == 0.0 || (x - previous).abs() <= options.tolerance {
            log::trace!("ridder converged after {} iterations at {x}", iteration + 1);
            return Ok(x);
        }
        previous = x;

        if fm.signum() != fx.signum() {
            (a, fa, b, fb) = (m, fm, x, fx);
        } else if fa.signum() != fx.signum() {
            (b, fb) = (x, fx);
        } else {
            (a, fa) = (x, fx);
        }
        if (b - a).abs() <= options.tolerance {
            return Ok(0.5 * (a + b));
        }
    }
    Err(KernelError::SolverDiverged {
        message: format!("ridder on [{a}, {b}]"),
        iterations: options.max_iterations,
        residual: f(previous).abs(),
    })
}

/// Plain bisection on a sign-changing bracket.
pub fn bisect<F>(f: F, a: f64, b: f64, options: &SolverOptions) -> Result<f64>
where
    F: Fn(f64) -> f64,
{
    let (mut a, mut b) = (a, b);
    let mut fa = f(a);
    let fb = f(b);
    if fa == 0.0 {
        return Ok(a);
    }
    if fb == 0.0 {
        return Ok(b);
    }
    if fa.signum() == fb.signum() {
        return Err(KernelError::NoSolution(format!(
            "f({a}) = {fa} and f({b}) = {fb} do not bracket a root"
        )));
    }
    for _ in 0..options.max_iterations {
        let m = 0.5 * (a + b);
        if (b - a).abs() <= 2.0 * options.tolerance {
            return Ok(m);
        }
        let fm = f(m);
        if fm == 0.0 {
            return Ok(m);
        }
        if fm.signum() == fa.signum() {
            (a, fa) = (m, fm);
        } else {
            b = m;
        }
    }
    Err(KernelError::SolverDiverged {
        message: format!("bisection on [{a}, {b}]"),
        iterations: options.max_iterations,
        residual: (b - a).abs(),
    })
}

/// Consecutive sample intervals over which `values` changes sign, as index
/// pairs. Exact zeros are reported separately and never bracket.
pub fn sign_changes(values: &[f64]) -> (Vec<usize>, Vec<(usize, usize)>) {
    let zeros = values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v == 0.0)
        .map(|(i, _)| i)
        .collect();
    let brackets = values
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[0] * w[1] < 0.0)
        .map(|(i, _)| (i, i + 1))
        .collect();
    (zeros, brackets)
}
