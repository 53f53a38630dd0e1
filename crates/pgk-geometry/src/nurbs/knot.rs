//! Knot vectors and B-spline basis functions.

use pgk_core::{KernelError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Default tolerance when comparing knot values.
pub const KNOT_TOLERANCE: f64 = 1e-9;

/// Find the knot span index for parameter `t` in the knot vector.
///
/// Returns the index `i` such that `knots[i] <= t < knots[i+1]`,
/// with special handling for the upper boundary.
///
/// # Arguments
/// * `degree` - Degree of the B-spline
/// * `knots` - The knot vector
/// * `n` - Number of control points minus 1
/// * `t` - Parameter value
pub fn find_span(degree: usize, knots: &[f64], n: usize, t: f64) -> usize {
    if t >= knots[n + 1] {
        return n;
    }
    if t <= knots[degree] {
        return degree;
    }

    let mut low = degree;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;

    while t < knots[mid] || t >= knots[mid + 1] {
        if t < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }

    mid
}

/// Compute the non-vanishing basis functions at parameter `t`.
///
/// Returns `degree + 1` values N_{span-degree,degree}(t) through
/// N_{span,degree}(t).
pub fn basis_functions(degree: usize, knots: &[f64], span: usize, t: f64) -> Vec<f64> {
    let mut n = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];

    n[0] = 1.0;

    for j in 1..=degree {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;

        for r in 0..j {
            let temp = n[r] / (right[r + 1] + left[j - r]);
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }

        n[j] = saved;
    }

    n
}

/// Compute the non-vanishing basis functions and their derivatives up to
/// order `n_derivs` at parameter `t`.
///
/// `result[k][j]` is the k-th derivative of N_{span-degree+j,degree}(t).
/// Orders above `degree` are identically zero.
#[allow(clippy::needless_range_loop)]
pub fn basis_function_derivs(
    degree: usize,
    knots: &[f64],
    span: usize,
    t: f64,
    n_derivs: usize,
) -> Vec<Vec<f64>> {
    let p = degree;
    let mut ndu = vec![vec![0.0; p + 1]; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];
    ndu[0][0] = 1.0;

    for j in 1..=p {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;
        for r in 0..j {
            // Lower triangle holds knot differences.
            ndu[j][r] = right[r + 1] + left[j - r];
            let temp = ndu[r][j - 1] / ndu[j][r];
            ndu[r][j] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        ndu[j][j] = saved;
    }

    let mut ders = vec![vec![0.0; p + 1]; n_derivs + 1];
    for j in 0..=p {
        ders[0][j] = ndu[j][p];
    }

    let top = n_derivs.min(p);
    let mut a = vec![vec![0.0; p + 1]; 2];
    for r in 0..=p {
        let (mut s1, mut s2) = (0usize, 1usize);
        a[0][0] = 1.0;
        for k in 1..=top {
            let mut d = 0.0;
            let rk = r as isize - k as isize;
            let pk = p - k;
            if r >= k {
                let rk = rk as usize;
                a[s2][0] = a[s1][0] / ndu[pk + 1][rk];
                d = a[s2][0] * ndu[rk][pk];
            }
            let j1 = if rk >= -1 { 1 } else { (-rk) as usize };
            let j2 = if (r as isize - 1) <= pk as isize { k - 1 } else { p - r };
            for j in j1..=j2 {
                let idx = (rk + j as isize) as usize;
                a[s2][j] = (a[s1][j] - a[s1][j - 1]) / ndu[pk + 1][idx];
                d += a[s2][j] * ndu[idx][pk];
            }
            if r <= pk {
                a[s2][k] = -a[s1][k - 1] / ndu[pk + 1][r];
                d += a[s2][k] * ndu[r][pk];
            }
            ders[k][r] = d;
            std::mem::swap(&mut s1, &mut s2);
        }
    }

    let mut factor = p as f64;
    for k in 1..=top {
        for j in 0..=p {
            ders[k][j] *= factor;
        }
        factor *= (p - k) as f64;
    }

    ders
}

/// An ordered, non-decreasing sequence of knots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnotVector(Vec<f64>);

impl KnotVector {
    /// Wrap raw knots without validation.
    pub fn new(knots: Vec<f64>) -> Self {
        Self(knots)
    }

    /// Uniform knot vector on `[0, 1]` for `n_points` control points.
    ///
    /// Clamped vectors repeat each end knot `degree + 1` times and space the
    /// interior knots evenly; unclamped vectors space every knot evenly.
    pub fn uniform(degree: usize, n_points: usize, clamped: bool) -> Result<Self> {
        if degree == 0 || n_points <= degree {
            return Err(KernelError::InvalidInput(format!(
                "need more than {degree} control points for degree {degree}, got {n_points}"
            )));
        }
        let m = n_points + degree + 1;
        if !clamped {
            let last = (m - 1) as f64;
            return Ok(Self((0..m).map(|i| i as f64 / last).collect()));
        }
        let n_spans = n_points - degree;
        let mut knots = Vec::with_capacity(m);
        knots.extend(std::iter::repeat(0.0).take(degree));
        knots.extend((0..=n_spans).map(|i| i as f64 / n_spans as f64));
        knots.extend(std::iter::repeat(1.0).take(degree));
        Ok(Self(knots))
    }

    /// Clamped knot vector from interpolation parameters by the averaging
    /// technique.
    pub fn from_params(degree: usize, params: &[f64]) -> Result<Self> {
        let n_points = params.len();
        if degree == 0 || n_points <= degree {
            return Err(KernelError::InvalidInput(format!(
                "need more than {degree} parameters for degree {degree}, got {n_points}"
            )));
        }
        let first = params[0];
        let last = params[n_points - 1];
        let mut knots = vec![first; degree + 1];
        for j in 1..n_points - degree {
            let sum: f64 = params[j..j + degree].iter().sum();
            knots.push(sum / degree as f64);
        }
        knots.extend(std::iter::repeat(last).take(degree + 1));
        Ok(Self(knots))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }

    pub fn first(&self) -> f64 {
        self.0[0]
    }

    pub fn last(&self) -> f64 {
        self.0[self.0.len() - 1]
    }

    /// Number of knots equal to `value` within `tolerance`.
    pub fn find_multiplicity(&self, value: f64, tolerance: f64) -> usize {
        self.0.iter().filter(|&&k| (k - value).abs() <= tolerance).count()
    }

    pub fn find_span(&self, degree: usize, t: f64) -> usize {
        find_span(degree, &self.0, self.0.len() - degree - 2, t)
    }

    pub fn basis_functions(&self, degree: usize, t: f64) -> (usize, Vec<f64>) {
        let span = self.find_span(degree, t);
        (span, basis_functions(degree, &self.0, span, t))
    }

    pub fn basis_function_derivs(&self, degree: usize, t: f64, n_derivs: usize) -> (usize, Vec<Vec<f64>>) {
        let span = self.find_span(degree, t);
        (span, basis_function_derivs(degree, &self.0, span, t, n_derivs))
    }

    /// Parameter domain of a curve of the given degree.
    pub fn domain(&self, degree: usize) -> (f64, f64) {
        (self.0[degree], self.0[self.0.len() - degree - 1])
    }

    /// `per_span` evenly spaced parameters in every non-empty knot span of
    /// the domain, followed by the domain end.
    pub fn span_samples(&self, degree: usize, per_span: usize) -> Vec<f64> {
        let (a, b) = self.domain(degree);
        let breaks: Vec<f64> = self
            .distinct()
            .into_iter()
            .map(|(k, _)| k)
            .filter(|&k| k >= a - KNOT_TOLERANCE && k <= b + KNOT_TOLERANCE)
            .collect();
        let mut ts = Vec::with_capacity(breaks.len() * per_span + 1);
        for w in breaks.windows(2) {
            for i in 0..per_span {
                ts.push(w[0] + (w[1] - w[0]) * i as f64 / per_span as f64);
            }
        }
        ts.push(b);
        ts
    }

    /// Map knots linearly onto `[0, 1]`.
    pub fn normalize(&self) -> Self {
        self.rescale(0.0, 1.0)
    }

    /// Map knots linearly so the first knot becomes `new_min` and the last
    /// `new_max`.
    pub fn rescale(&self, new_min: f64, new_max: f64) -> Self {
        let (a, b) = (self.first(), self.last());
        let span = b - a;
        if span.abs() < f64::EPSILON {
            return Self(vec![new_min; self.0.len()]);
        }
        self.remap(a, b, new_min, new_max)
    }

    /// Affine map sending `from_min` to `to_min` and `from_max` to `to_max`
    /// exactly.
    pub fn remap(&self, from_min: f64, from_max: f64, to_min: f64, to_max: f64) -> Self {
        let width = from_max - from_min;
        Self(
            self.0
                .iter()
                .map(|&k| to_min + (k - from_min) / width * (to_max - to_min))
                .collect(),
        )
    }

    /// Mirror the knot vector so that it parametrizes the reversed curve.
    pub fn reverse(&self) -> Self {
        let (a, b) = (self.first(), self.last());
        Self(self.0.iter().rev().map(|&k| a + b - k).collect())
    }

    /// Whether both ends repeat `degree + 1` times.
    pub fn is_clamped(&self, degree: usize) -> bool {
        let n = self.0.len();
        if n < 2 * (degree + 1) {
            return false;
        }
        let (a, b) = (self.first(), self.last());
        self.0[..=degree].iter().all(|&k| (k - a).abs() <= KNOT_TOLERANCE)
            && self.0[n - degree - 1..].iter().all(|&k| (k - b).abs() <= KNOT_TOLERANCE)
    }

    /// Check length, monotonicity and interior multiplicity.
    pub fn validate(&self, degree: usize, n_points: usize) -> Result<()> {
        if degree == 0 {
            return Err(KernelError::InvalidInput("degree must be at least 1".into()));
        }
        if n_points <= degree {
            return Err(KernelError::InvalidInput(format!(
                "degree {degree} requires at least {} control points, got {n_points}",
                degree + 1
            )));
        }
        if self.0.len() != n_points + degree + 1 {
            return Err(KernelError::InvalidInput(format!(
                "expected {} knots for {n_points} control points of degree {degree}, got {}",
                n_points + degree + 1,
                self.0.len()
            )));
        }
        if self.0.iter().any(|k| !k.is_finite()) {
            return Err(KernelError::InvalidInput("knots must be finite".into()));
        }
        if self.0.windows(2).any(|w| w[1] < w[0]) {
            return Err(KernelError::InvalidInput("knots must be non-decreasing".into()));
        }
        let (a, b) = self.domain(degree);
        if b - a <= 0.0 {
            return Err(KernelError::InvalidInput("knot vector has an empty domain".into()));
        }
        for (value, multiplicity) in self.distinct() {
            let interior = value > a + KNOT_TOLERANCE && value < b - KNOT_TOLERANCE;
            if interior && multiplicity > degree {
                return Err(KernelError::InvalidInput(format!(
                    "interior knot {value} has multiplicity {multiplicity} > degree {degree}"
                )));
            }
        }
        Ok(())
    }

    /// Distinct knot values with their multiplicities, in order.
    pub fn distinct(&self) -> Vec<(f64, usize)> {
        let mut result: Vec<(f64, usize)> = Vec::new();
        for &k in &self.0 {
            match result.last_mut() {
                Some((value, count)) if (k - *value).abs() <= KNOT_TOLERANCE => *count += 1,
                _ => result.push((k, 1)),
            }
        }
        result
    }

    /// Distinct knots strictly inside the domain of a curve of `degree`.
    pub fn interior(&self, degree: usize) -> Vec<(f64, usize)> {
        let (a, b) = self.domain(degree);
        self.distinct()
            .into_iter()
            .filter(|&(k, _)| k > a + KNOT_TOLERANCE && k < b - KNOT_TOLERANCE)
            .collect()
    }

    /// Greville abscissae: the average of each run of `degree` consecutive
    /// knots following the first. One value per control point.
    pub fn greville(&self, degree: usize) -> Vec<f64> {
        let n_points = self.0.len() - degree - 1;
        (0..n_points)
            .map(|i| self.0[i + 1..=i + degree].iter().sum::<f64>() / degree as f64)
            .collect()
    }

    /// Knots of `other` missing from `self`, with the number of copies
    /// needed to reach `other`'s multiplicity.
    pub fn difference(&self, other: &KnotVector) -> Vec<(f64, usize)> {
        other
            .distinct()
            .into_iter()
            .filter_map(|(value, count)| {
                let have = self.find_multiplicity(value, KNOT_TOLERANCE);
                (count > have).then_some((value, count - have))
            })
            .collect()
    }
}

impl Deref for KnotVector {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

impl From<Vec<f64>> for KnotVector {
    fn from(knots: Vec<f64>) -> Self {
        Self(knots)
    }
}
