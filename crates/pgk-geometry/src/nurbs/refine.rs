//! Knot refinement: insertion and removal on homogeneous control points.
//!
//! Every routine operates on a set of rows sharing one knot vector. A curve
//! is a single row; a surface passes one row per iso-line of the other
//! direction, so the same knot edit is applied to all of them.

use pgk_core::{KernelError, Result};
use pgk_math::DVec4;

use super::knot::{find_span, KNOT_TOLERANCE};

/// Control point rows sharing one knot vector.
pub type Rows = Vec<Vec<DVec4>>;

/// Insert `value` into the knot vector `count` times.
///
/// The resulting rows describe exactly the same geometry. Fails if the
/// multiplicity would exceed `degree` or the value lies outside the knots.
pub fn insert_knot(
    degree: usize,
    knots: &[f64],
    rows: &[Vec<DVec4>],
    value: f64,
    count: usize,
) -> Result<(Vec<f64>, Rows)> {
    let p = degree;
    let n_points = rows.first().map_or(0, |r| r.len());
    if n_points == 0 {
        return Err(KernelError::InvalidInput("no control points".into()));
    }
    let n = n_points - 1;
    let (a, b) = (knots[p], knots[n + 1]);
    if value < a - KNOT_TOLERANCE || value > b + KNOT_TOLERANCE {
        return Err(KernelError::Domain { t: value, min: a, max: b });
    }
    let s = knots.iter().filter(|&&k| (k - value).abs() <= KNOT_TOLERANCE).count();
    // Snap onto an existing knot so no near-duplicate values appear.
    let value = knots
        .iter()
        .copied()
        .find(|&k| (k - value).abs() <= KNOT_TOLERANCE)
        .unwrap_or(value);
    if count == 0 {
        return Ok((knots.to_vec(), rows.to_vec()));
    }
    if s + count > p {
        return Err(KernelError::InvalidInput(format!(
            "inserting knot {value} {count} times would raise its multiplicity {s} above degree {p}"
        )));
    }

    let k = if s > 0 {
        knots.iter().rposition(|&kn| kn == value).unwrap_or(p)
    } else {
        find_span(p, knots, n, value)
    };
    let r = count;

    let mut new_knots = Vec::with_capacity(knots.len() + r);
    new_knots.extend_from_slice(&knots[..=k]);
    new_knots.extend(std::iter::repeat(value).take(r));
    new_knots.extend_from_slice(&knots[k + 1..]);

    let new_rows = rows
        .iter()
        .map(|pw| {
            let mut qw = vec![DVec4::ZERO; n_points + r];
            qw[..=k - p].copy_from_slice(&pw[..=k - p]);
            for i in k - s..=n {
                qw[i + r] = pw[i];
            }
            let mut rw: Vec<DVec4> = (0..=p - s).map(|i| pw[k - p + i]).collect();
            let mut l = k - p;
            for j in 1..=r {
                l = k - p + j;
                for i in 0..=p - j - s {
                    let alpha = (value - knots[l + i]) / (knots[i + k + 1] - knots[l + i]);
                    rw[i] = alpha * rw[i + 1] + (1.0 - alpha) * rw[i];
                }
                qw[l] = rw[0];
                qw[k + r - j - s] = rw[p - j - s];
            }
            for i in l + 1..k - s {
                qw[i] = rw[i - l];
            }
            qw
        })
        .collect();

    Ok((new_knots, new_rows))
}

/// Result of one tentative knot removal.
#[derive(Debug, Clone)]
pub struct RemovalCandidate {
    pub knots: Vec<f64>,
    pub rows: Rows,
    /// Largest homogeneous control point error over all rows.
    pub error: f64,
}

/// Remove a single copy of the interior knot `value`.
///
/// Always produces a candidate; `error` bounds how far the control net had
/// to move. Callers decide whether that is acceptable. Returns `None` if
/// `value` is not an interior knot.
pub fn remove_knot_once(
    degree: usize,
    knots: &[f64],
    rows: &[Vec<DVec4>],
    value: f64,
) -> Option<RemovalCandidate> {
    let p = degree as isize;
    let n_points = rows.first()?.len();
    let (a, b) = (knots[degree], knots[n_points]);
    if value <= a + KNOT_TOLERANCE || value >= b - KNOT_TOLERANCE {
        return None;
    }
    // Index of the last occurrence of the knot and its multiplicity.
    let r = knots.iter().rposition(|&k| (k - value).abs() <= KNOT_TOLERANCE)? as isize;
    let s = knots.iter().filter(|&&k| (k - value).abs() <= KNOT_TOLERANCE).count() as isize;
    let u = knots[r as usize];
    let ord = p + 1;
    let first = r - p;
    let last = r - s;
    let off = first - 1;
    let fout = ((2 * r - s - p) / 2) as usize;

    let mut error: f64 = 0.0;
    let mut new_rows = Vec::with_capacity(rows.len());
    for pw in rows {
        let mut pw = pw.clone();
        let mut temp = vec![DVec4::ZERO; (last + 2 - off) as usize];
        temp[0] = pw[off as usize];
        temp[(last + 1 - off) as usize] = pw[(last + 1) as usize];
        let (mut i, mut j) = (first, last);
        let (mut ii, mut jj) = (1isize, last - off);
        while j - i > 0 {
            let alfi = (u - knots[i as usize]) / (knots[(i + ord) as usize] - knots[i as usize]);
            let alfj = (u - knots[j as usize]) / (knots[(j + ord) as usize] - knots[j as usize]);
            temp[ii as usize] = (pw[i as usize] - (1.0 - alfi) * temp[(ii - 1) as usize]) / alfi;
            temp[jj as usize] = (pw[j as usize] - alfj * temp[(jj + 1) as usize]) / (1.0 - alfj);
            i += 1;
            ii += 1;
            j -= 1;
            jj -= 1;
        }
        let row_error = if j - i < 0 {
            (temp[(ii - 1) as usize] - temp[(jj + 1) as usize]).length()
        } else {
            let alfi = (u - knots[i as usize]) / (knots[(i + ord) as usize] - knots[i as usize]);
            let blended = alfi * temp[(ii + 1) as usize] + (1.0 - alfi) * temp[(ii - 1) as usize];
            (pw[i as usize] - blended).length()
        };
        error = error.max(row_error);

        let (mut i, mut j) = (first, last);
        while j - i > 0 {
            pw[i as usize] = temp[(i - off) as usize];
            pw[j as usize] = temp[(j - off) as usize];
            i += 1;
            j -= 1;
        }
        pw.remove(fout);
        new_rows.push(pw);
    }

    let mut new_knots = knots.to_vec();
    new_knots.remove(r as usize);
    Some(RemovalCandidate {
        knots: new_knots,
        rows: new_rows,
        error,
    })
}
