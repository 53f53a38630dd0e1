//! Bezier decomposition and degree change of homogeneous control rows.

use pgk_core::{KernelError, Result};
use pgk_math::DVec4;

use super::knot::KnotVector;
use super::refine::{insert_knot, remove_knot_once, Rows};

/// Split clamped rows into Bezier segments.
///
/// Returns the breakpoints `[a, k1, .., b]` and for each segment the rows of
/// `degree + 1` control points.
pub fn decompose(degree: usize, knots: &[f64], rows: &[Vec<DVec4>]) -> Result<(Vec<f64>, Vec<Rows>)> {
    let kv = KnotVector::new(knots.to_vec());
    if !kv.is_clamped(degree) {
        return Err(KernelError::InvalidInput(
            "Bezier decomposition needs a clamped knot vector".into(),
        ));
    }
    let mut knots = knots.to_vec();
    let mut rows = rows.to_vec();
    for (value, multiplicity) in kv.interior(degree) {
        if multiplicity < degree {
            let (k, r) = insert_knot(degree, &knots, &rows, value, degree - multiplicity)?;
            knots = k;
            rows = r;
        }
    }

    let (a, b) = kv.domain(degree);
    let mut breaks = vec![a];
    breaks.extend(kv.interior(degree).into_iter().map(|(v, _)| v));
    breaks.push(b);

    let n_segments = breaks.len() - 1;
    let segments = (0..n_segments)
        .map(|s| {
            rows.iter()
                .map(|row| row[s * degree..=s * degree + degree].to_vec())
                .collect()
        })
        .collect();
    Ok((breaks, segments))
}

/// Join Bezier segments of `degree` into C0 clamped rows.
pub fn assemble(degree: usize, breaks: &[f64], segments: &[Rows]) -> (Vec<f64>, Rows) {
    let mut knots = vec![breaks[0]; degree + 1];
    for &k in &breaks[1..breaks.len() - 1] {
        knots.extend(std::iter::repeat(k).take(degree));
    }
    knots.extend(std::iter::repeat(breaks[breaks.len() - 1]).take(degree + 1));

    let n_rows = segments[0].len();
    let rows = (0..n_rows)
        .map(|r| {
            let mut row = segments[0][r].clone();
            for segment in &segments[1..] {
                row.extend_from_slice(&segment[r][1..]);
            }
            row
        })
        .collect();
    (knots, rows)
}

/// Raise the degree of a Bezier control polygon by `times`.
pub fn bezier_elevate(points: &[DVec4], times: usize) -> Vec<DVec4> {
    let mut current = points.to_vec();
    for _ in 0..times {
        let n = current.len() - 1;
        let mut next = Vec::with_capacity(n + 2);
        next.push(current[0]);
        for i in 1..=n {
            let alpha = i as f64 / (n + 1) as f64;
            next.push(alpha * current[i - 1] + (1.0 - alpha) * current[i]);
        }
        next.push(current[n]);
        current = next;
    }
    current
}

/// Lower the degree of a Bezier control polygon by one.
///
/// Returns the reduced polygon and the largest distance between the original
/// polygon and the re-elevated reduced one.
pub fn bezier_reduce(points: &[DVec4]) -> (Vec<DVec4>, f64) {
    let p = points.len() - 1;
    let r = (p - 1) / 2;
    let alpha = |i: usize| i as f64 / p as f64;
    let mut q = vec![DVec4::ZERO; p];

    q[0] = points[0];
    for i in 1..=r {
        q[i] = (points[i] - alpha(i) * q[i - 1]) / (1.0 - alpha(i));
    }
    q[p - 1] = points[p];
    for i in (r + 1..p - 1).rev() {
        q[i] = (points[i + 1] - (1.0 - alpha(i + 1)) * q[i + 1]) / alpha(i + 1);
    }
    if p % 2 == 1 && r > 0 {
        let right = (points[r + 1] - (1.0 - alpha(r + 1)) * q[r + 1]) / alpha(r + 1);
        q[r] = 0.5 * (q[r] + right);
    }

    let back = bezier_elevate(&q, 1);
    let error = back
        .iter()
        .zip(points)
        .map(|(a, b)| (*a - *b).length())
        .fold(0.0, f64::max);
    (q, error)
}

/// Remove up to `count` copies of each listed knot while the control net
/// moves by no more than `tolerance`.
pub fn remove_knots_within(
    degree: usize,
    knots: Vec<f64>,
    rows: Rows,
    targets: &[(f64, usize)],
    tolerance: f64,
) -> (Vec<f64>, Rows) {
    let (mut knots, mut rows) = (knots, rows);
    for &(value, count) in targets {
        for removed in 0..count {
            match remove_knot_once(degree, &knots, &rows, value) {
                Some(candidate) if candidate.error <= tolerance => {
                    knots = candidate.knots;
                    rows = candidate.rows;
                }
                other => {
                    log::trace!(
                        "stopped removing knot {value} after {removed} of {count} (error {:?})",
                        other.map(|c| c.error)
                    );
                    break;
                }
            }
        }
    }
    (knots, rows)
}

/// Scale-aware tolerance for removals that should be exact.
pub fn exact_tolerance(rows: &[Vec<DVec4>]) -> f64 {
    let extent = rows
        .iter()
        .flatten()
        .map(|h| h.length())
        .fold(0.0, f64::max);
    1e-9 * (1.0 + extent)
}

/// Elevate clamped rows by `times` degrees. The result has the same image
/// and the same continuity at every interior knot.
pub fn elevate(degree: usize, knots: &[f64], rows: &[Vec<DVec4>], times: usize) -> Result<(Vec<f64>, Rows)> {
    if times == 0 {
        return Ok((knots.to_vec(), rows.to_vec()));
    }
    let interior = KnotVector::new(knots.to_vec()).interior(degree);
    let (breaks, segments) = decompose(degree, knots, rows)?;
    let elevated: Vec<Rows> = segments
        .iter()
        .map(|segment| segment.iter().map(|row| bezier_elevate(row, times)).collect())
        .collect();
    let new_degree = degree + times;
    let (new_knots, new_rows) = assemble(new_degree, &breaks, &elevated);

    let targets: Vec<(f64, usize)> = interior
        .iter()
        .map(|&(value, multiplicity)| (value, degree - multiplicity.min(degree)))
        .filter(|&(_, count)| count > 0)
        .collect();
    let tolerance = exact_tolerance(&new_rows);
    Ok(remove_knots_within(new_degree, new_knots, new_rows, &targets, tolerance))
}

/// Lower the degree of clamped rows by one, leaving C0 knots.
///
/// Returns the new knots, rows and the largest control net deviation.
pub fn reduce_once(degree: usize, knots: &[f64], rows: &[Vec<DVec4>]) -> Result<(Vec<f64>, Rows, f64)> {
    if degree < 2 {
        return Err(KernelError::InvalidInput(format!(
            "cannot reduce degree {degree} any further"
        )));
    }
    let (breaks, segments) = decompose(degree, knots, rows)?;
    let mut error: f64 = 0.0;
    let reduced: Vec<Rows> = segments
        .iter()
        .map(|segment| {
            segment
                .iter()
                .map(|row| {
                    let (q, e) = bezier_reduce(row);
                    error = error.max(e);
                    q
                })
                .collect()
        })
        .collect();
    let (new_knots, new_rows) = assemble(degree - 1, &breaks, &reduced);
    Ok((new_knots, new_rows, error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nurbs::deboor::{curve_point, to_homogeneous};
    use pgk_math::dvec3;

    fn sample_rows() -> (Vec<f64>, Vec<DVec4>) {
        let points = [
            dvec3(0.0, 0.0, 0.0),
            dvec3(1.0, 2.0, 0.0),
            dvec3(2.0, -1.0, 1.0),
            dvec3(3.0, 2.0, 0.0),
            dvec3(4.0, 0.0, 2.0),
            dvec3(5.0, 1.0, 0.0),
        ];
        let weights = [1.0, 1.5, 0.7, 1.0, 2.0, 1.0];
        (
            vec![0.0, 0.0, 0.0, 0.0, 0.3, 0.6, 1.0, 1.0, 1.0, 1.0],
            to_homogeneous(&points, &weights),
        )
    }

    #[test]
    fn test_decompose_and_assemble() {
        let (knots, hp) = sample_rows();
        let (breaks, segments) = decompose(3, &knots, &[hp.clone()]).unwrap();
        assert_eq!(breaks, vec![0.0, 0.3, 0.6, 1.0]);
        assert_eq!(segments.len(), 3);
        let (k2, rows) = assemble(3, &breaks, &segments);
        for i in 0..=40 {
            let t = i as f64 / 40.0;
            let a = curve_point(3, &knots, &hp, t);
            let b = curve_point(3, &k2, &rows[0], t);
            assert!((a - b).length() < 1e-12);
        }
    }

    #[test]
    fn test_bezier_reduce_inverts_elevate() {
        let cubic = vec![
            DVec4::new(0.0, 0.0, 0.0, 1.0),
            DVec4::new(1.0, 3.0, 0.0, 1.0),
            DVec4::new(3.0, 3.0, 1.0, 1.0),
            DVec4::new(4.0, 0.0, 0.0, 1.0),
        ];
        let quartic = bezier_elevate(&cubic, 1);
        assert_eq!(quartic.len(), 5);
        let (back, error) = bezier_reduce(&quartic);
        assert!(error < 1e-12);
        for (a, b) in back.iter().zip(&cubic) {
            assert!((*a - *b).length() < 1e-12);
        }
        let quintic = bezier_elevate(&cubic, 2);
        let (back, error) = bezier_reduce(&quintic);
        assert!(error < 1e-12);
        assert_eq!(back.len(), 5);
    }

    #[test]
    fn test_elevate_keeps_image_and_continuity() {
        let (knots, hp) = sample_rows();
        let (k2, rows) = elevate(3, &knots, &[hp.clone()], 1).unwrap();
        // Simple interior knots gain exactly one copy.
        assert_eq!(k2.len(), knots.len() + 4);
        assert_eq!(rows[0].len(), hp.len() + 3);
        for i in 0..=40 {
            let t = i as f64 / 40.0;
            let a = curve_point(3, &knots, &hp, t);
            let b = curve_point(4, &k2, &rows[0], t);
            assert!((a - b).length() < 1e-10, "elevation moved the curve at {t}");
        }
    }

    #[test]
    fn test_reduce_once_rejects_linear() {
        let rows = vec![vec![DVec4::new(0.0, 0.0, 0.0, 1.0), DVec4::new(1.0, 0.0, 0.0, 1.0)]];
        assert!(reduce_once(1, &[0.0, 0.0, 1.0, 1.0], &rows).is_err());
    }
}
