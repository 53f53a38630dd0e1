//! Knot refinement: inserting new knots without changing the curve.

use pgk_core::{KernelError, Result};
use serde::{Deserialize, Serialize};

use super::length::{CurveLengthSolver, LengthInterpolation, DEFAULT_LENGTH_RESOLUTION};
use super::{Curve, NurbsCurve};
use crate::nurbs::KNOT_TOLERANCE;

/// Where the new knots go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefineAlgorithm {
    /// Evenly over the whole range, ignoring existing knots.
    Trivial,
    /// Over the existing spans, proportionally to their size.
    #[default]
    Distribute,
    /// Repeatedly halve the largest span.
    Bisect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefineOptions {
    /// Number of knots to add.
    pub samples: usize,
    /// Sub-range to refine; the whole domain when `None`.
    pub range: Option<(f64, f64)>,
    pub algorithm: RefineAlgorithm,
    /// Insert every new knot `degree` times instead of once.
    pub refine_max: bool,
    /// Measure span sizes by arc length instead of by parameter.
    pub by_length: Option<LengthInterpolation>,
}

impl Default for RefineOptions {
    fn default() -> Self {
        Self {
            samples: 10,
            range: None,
            algorithm: RefineAlgorithm::default(),
            refine_max: false,
            by_length: None,
        }
    }
}

/// A refined curve and the knot positions that were considered for it.
#[derive(Debug, Clone)]
pub struct Refinement {
    pub new_knots: Vec<f64>,
    pub curve: NurbsCurve,
}

/// Add knots to `curve` as described by `options`. The shape is unchanged.
pub fn refine_curve(curve: &NurbsCurve, options: &RefineOptions) -> Result<Refinement> {
    let (a, b) = curve.domain();
    let (t_min, t_max) = options.range.unwrap_or((a, b));
    if t_min < a - KNOT_TOLERANCE || t_max > b + KNOT_TOLERANCE || t_max - t_min <= KNOT_TOLERANCE {
        return Err(KernelError::InvalidInput(format!(
            "refinement range [{t_min}, {t_max}] is not inside the domain [{a}, {b}]"
        )));
    }
    let existing: Vec<f64> = curve
        .knots()
        .distinct()
        .into_iter()
        .map(|(k, _)| k)
        .filter(|&k| k >= t_min - KNOT_TOLERANCE && k <= t_max + KNOT_TOLERANCE)
        .collect();
    let mut bounds = existing.clone();
    if !contains(&bounds, t_min) {
        bounds.insert(0, t_min);
    }
    if !contains(&bounds, t_max) {
        bounds.push(t_max);
    }

    let solver = match options.by_length {
        Some(mode) => {
            let resolution = DEFAULT_LENGTH_RESOLUTION.max(4 * options.samples);
            Some(CurveLengthSolver::new(curve, mode, resolution)?)
        }
        None => None,
    };
    let measure = |ts: &[f64]| match &solver {
        Some(s) => s.lengths_at(ts),
        None => ts.to_vec(),
    };
    let unmeasure = |ls: Vec<f64>| match &solver {
        Some(s) => s.solve(&ls),
        None => ls,
    };

    let mut new_knots = match options.algorithm {
        RefineAlgorithm::Trivial => {
            let step = (t_max - t_min) / (options.samples + 1) as f64;
            (1..=options.samples).map(|i| t_min + step * i as f64).collect()
        }
        RefineAlgorithm::Distribute => {
            let marks = measure(&bounds);
            let sizes: Vec<f64> = marks.windows(2).map(|w| w[1] - w[0]).collect();
            let mut knots = Vec::with_capacity(options.samples);
            for (w, count) in marks.windows(2).zip(distribute_int(options.samples, &sizes)) {
                let step = (w[1] - w[0]) / (count + 1) as f64;
                knots.extend(unmeasure((1..=count).map(|i| w[0] + step * i as f64).collect()));
            }
            knots
        }
        RefineAlgorithm::Bisect => {
            let mut knots = bounds.clone();
            for _ in 0..options.samples {
                let marks = measure(&knots);
                let Some(i) = (0..marks.len() - 1).max_by(|&i, &j| {
                    (marks[i + 1] - marks[i]).total_cmp(&(marks[j + 1] - marks[j])).then(j.cmp(&i))
                }) else {
                    break;
                };
                let half = unmeasure(vec![0.5 * (marks[i] + marks[i + 1])])[0];
                knots.insert(i + 1, half);
            }
            knots
        }
    };
    new_knots.push(t_min);
    new_knots.push(t_max);
    new_knots.sort_by(f64::total_cmp);
    new_knots.dedup_by(|x, y| (*x - *y).abs() <= KNOT_TOLERANCE);

    let degree = curve.degree();
    let inserts = if options.refine_max { degree } else { 1 };
    let mut refined = curve.clone();
    for &t in &new_knots {
        if contains(&existing, t) || t <= a + KNOT_TOLERANCE || t >= b - KNOT_TOLERANCE {
            continue;
        }
        let room = degree - refined.knots().find_multiplicity(t, KNOT_TOLERANCE).min(degree);
        if room == 0 {
            continue;
        }
        refined = refined.insert_knot(t, inserts.min(room))?;
    }
    log::debug!(
        "refined {:?}: {} knots -> {}",
        options.algorithm,
        curve.knots().len(),
        refined.knots().len()
    );
    Ok(Refinement {
        new_knots,
        curve: refined,
    })
}

fn contains(knots: &[f64], t: f64) -> bool {
    knots.iter().any(|&k| (k - t).abs() <= KNOT_TOLERANCE)
}

/// Split `total` into integer parts proportional to `sizes`, handing the
/// remainder to the largest fractional parts.
pub fn distribute_int(total: usize, sizes: &[f64]) -> Vec<usize> {
    let sum: f64 = sizes.iter().sum();
    if sizes.is_empty() || sum <= 0.0 {
        return vec![0; sizes.len()];
    }
    let exact: Vec<f64> = sizes.iter().map(|s| total as f64 * s / sum).collect();
    let mut counts: Vec<usize> = exact.iter().map(|x| x.floor() as usize).collect();
    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by(|&i, &j| (exact[j] - exact[j].floor()).total_cmp(&(exact[i] - exact[i].floor())));
    let assigned: usize = counts.iter().sum();
    for &i in order.iter().cycle().take(total.saturating_sub(assigned)) {
        counts[i] += 1;
    }
    counts
}
