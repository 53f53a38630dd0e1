//! NURBS curve representation and its editing operations.

use pgk_core::{ContentHasher, ContentKey, KernelError, Result};
use pgk_math::{Aabb3, DVec4, Point3, Transform, Vector3};
use serde::{Deserialize, Serialize};

use super::Curve;
use crate::nurbs::degree::{elevate, reduce_once};
use crate::nurbs::refine::{insert_knot, remove_knot_once};
use crate::nurbs::{deboor, from_homogeneous, to_homogeneous, KnotVector, NurbsBackend, KNOT_TOLERANCE};

/// A NURBS (Non-Uniform Rational B-Spline) curve.
///
/// Invariants are checked on construction: `degree >= 1`, one positive
/// weight per control point, and a valid knot vector of length
/// `control_points + degree + 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NurbsCurve {
    degree: usize,
    knots: KnotVector,
    control_points: Vec<Point3>,
    weights: Vec<f64>,
    #[serde(default)]
    backend: NurbsBackend,
}

/// Plain-array form of a NURBS curve for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NurbsCurveData {
    pub degree: usize,
    pub knots: Vec<f64>,
    pub control_points: Vec<[f64; 3]>,
    pub weights: Vec<f64>,
}

/// Result of a best-effort knot removal.
#[derive(Debug, Clone)]
pub struct KnotRemovalOutcome {
    pub curve: NurbsCurve,
    /// Number of knot copies actually removed.
    pub removed: usize,
    /// Largest sampled distance between the result and the input.
    pub error: f64,
}

/// Result of a best-effort degree reduction.
#[derive(Debug, Clone)]
pub struct DegreeReductionOutcome {
    pub curve: NurbsCurve,
    /// Number of degrees actually removed.
    pub removed: usize,
    pub error: f64,
}

impl NurbsCurve {
    pub fn new(
        degree: usize,
        knots: impl Into<KnotVector>,
        control_points: Vec<Point3>,
        weights: Vec<f64>,
    ) -> Result<Self> {
        let knots = knots.into();
        if control_points.len() != weights.len() {
            return Err(KernelError::InvalidInput(format!(
                "{} control points but {} weights",
                control_points.len(),
                weights.len()
            )));
        }
        if weights.iter().any(|&w| !(w > 0.0 && w.is_finite())) {
            return Err(KernelError::InvalidInput("weights must be positive".into()));
        }
        knots.validate(degree, control_points.len())?;
        Ok(Self {
            degree,
            knots,
            control_points,
            weights,
            backend: NurbsBackend::default(),
        })
    }

    /// Non-rational B-spline (all weights 1).
    pub fn bspline(degree: usize, knots: impl Into<KnotVector>, control_points: Vec<Point3>) -> Result<Self> {
        let weights = vec![1.0; control_points.len()];
        Self::new(degree, knots, control_points, weights)
    }

    /// Clamped uniform B-spline over `[0, 1]`.
    pub fn uniform(degree: usize, control_points: Vec<Point3>) -> Result<Self> {
        let knots = KnotVector::uniform(degree, control_points.len(), true)?;
        Self::bspline(degree, knots, control_points)
    }

    /// Build from homogeneous control points.
    pub fn from_homogeneous(degree: usize, knots: impl Into<KnotVector>, hpoints: &[DVec4]) -> Result<Self> {
        let (points, weights) = from_homogeneous(hpoints);
        Self::new(degree, knots, points, weights)
    }

    pub fn with_backend(mut self, backend: NurbsBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn knots(&self) -> &KnotVector {
        &self.knots
    }

    pub fn control_points(&self) -> &[Point3] {
        &self.control_points
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn backend(&self) -> NurbsBackend {
        self.backend
    }

    pub fn is_rational(&self) -> bool {
        let w0 = self.weights[0];
        self.weights.iter().any(|&w| (w - w0).abs() > 1e-12)
    }

    pub fn homogeneous(&self) -> Vec<DVec4> {
        to_homogeneous(&self.control_points, &self.weights)
    }

    fn homogeneous_point(&self, i: usize) -> DVec4 {
        let w = self.weights[i];
        (self.control_points[i] * w).extend(w)
    }

    pub fn to_data(&self) -> NurbsCurveData {
        NurbsCurveData {
            degree: self.degree,
            knots: self.knots.to_vec(),
            control_points: self.control_points.iter().map(|p| p.to_array()).collect(),
            weights: self.weights.clone(),
        }
    }

    pub fn from_data(data: &NurbsCurveData) -> Result<Self> {
        let points = data.control_points.iter().map(|&p| Point3::from_array(p)).collect();
        Self::new(data.degree, data.knots.clone(), points, data.weights.clone())
    }

    /// Hash of the curve definition, for use with `ContentCache`.
    pub fn content_key(&self) -> ContentKey {
        let flat: Vec<f64> = self.control_points.iter().flat_map(|p| p.to_array()).collect();
        ContentHasher::new("nurbs-curve")
            .usize(self.degree)
            .f64s(&self.knots)
            .f64s(&flat)
            .f64s(&self.weights)
            .finish()
    }

    /// Bounding box of the control polygon; contains the whole curve.
    pub fn bounding_box(&self) -> Aabb3 {
        Aabb3::from_points(self.control_points.iter().copied())
            .unwrap_or_else(|| Aabb3::new(Point3::ZERO, Point3::ZERO))
    }

    pub fn greville_parameters(&self) -> Vec<f64> {
        self.knots.greville(self.degree)
    }

    fn rebuild(&self, degree: usize, knots: Vec<f64>, hpoints: &[DVec4]) -> Result<Self> {
        Ok(Self::from_homogeneous(degree, knots, hpoints)?.with_backend(self.backend))
    }

    /// Insert `value` into the knot vector `count` times. The image is
    /// unchanged.
    pub fn insert_knot(&self, value: f64, count: usize) -> Result<Self> {
        let (knots, rows) = insert_knot(self.degree, &self.knots, &[self.homogeneous()], value, count)?;
        self.rebuild(self.degree, knots, &rows[0])
    }

    /// Remove up to `count` copies of the interior knot `value`.
    ///
    /// Each removal is accepted only if no sample of the curve moves by more
    /// than `tolerance`. Without `if_possible`, removing fewer copies than
    /// requested is a `KnotRemoval` error.
    pub fn remove_knot(&self, value: f64, count: usize, tolerance: f64, if_possible: bool) -> Result<KnotRemovalOutcome> {
        let (a, b) = self.domain();
        if value <= a + KNOT_TOLERANCE || value >= b - KNOT_TOLERANCE {
            return Err(KernelError::InvalidInput(format!(
                "{value} is not an interior knot of domain [{a}, {b}]"
            )));
        }
        if self.knots.find_multiplicity(value, KNOT_TOLERANCE) == 0 {
            return Err(KernelError::InvalidInput(format!("{value} is not a knot")));
        }
        let (curve, removed, error, rejected) = self.remove_against(self, value, count, tolerance)?;
        if removed < count && !if_possible {
            return Err(KernelError::KnotRemoval {
                knot: value,
                requested: count,
                removed,
                error: rejected,
                tolerance,
            });
        }
        Ok(KnotRemovalOutcome { curve, removed, error })
    }

    /// Remove copies of `value` while the result stays within `tolerance` of
    /// `reference`. Returns the curve, the count removed, the accepted error
    /// and the error of the first rejected attempt.
    fn remove_against(
        &self,
        reference: &NurbsCurve,
        value: f64,
        count: usize,
        tolerance: f64,
    ) -> Result<(NurbsCurve, usize, f64, f64)> {
        let mut current = self.clone();
        let mut removed = 0;
        let mut error = 0.0;
        let mut rejected = 0.0;
        while removed < count {
            let Some(candidate) = remove_knot_once(current.degree, &current.knots, &[current.homogeneous()], value) else {
                break;
            };
            let next = current.rebuild(current.degree, candidate.knots, &candidate.rows[0])?;
            let deviation = next.deviation_from(reference);
            if deviation > tolerance {
                log::trace!("knot {value}: removal rejected, deviation {deviation:e} > {tolerance:e}");
                rejected = deviation;
                break;
            }
            current = next;
            error = deviation;
            removed += 1;
        }
        log::debug!("knot {value}: removed {removed} of {count}");
        Ok((current, removed, error, rejected))
    }

    /// Remove every interior knot as many times as `tolerance` allows.
    pub fn remove_excessive_knots(&self, tolerance: f64) -> Result<Self> {
        let mut current = self.clone();
        for (value, multiplicity) in self.knots.interior(self.degree) {
            let (curve, _, _, _) = current.remove_against(self, value, multiplicity, tolerance)?;
            current = curve;
        }
        Ok(current)
    }

    /// Largest distance to `reference` over samples spread across every
    /// knot span of `reference`.
    pub fn deviation_from(&self, reference: &NurbsCurve) -> f64 {
        let ts = reference.knots.span_samples(reference.degree, 8);
        let mine = self.points_at(&ts);
        let theirs = reference.points_at(&ts);
        mine.iter()
            .zip(&theirs)
            .map(|(p, q)| (*p - *q).length())
            .fold(0.0, f64::max)
    }

    /// Parameter of the curve point closest to `point`, refined by Newton
    /// iteration from `seed` and kept inside the domain.
    pub fn closest_parameter(&self, point: Point3, seed: f64) -> f64 {
        let (a, b) = self.domain();
        let hp = self.homogeneous();
        let mut t = seed.clamp(a, b);
        for _ in 0..50 {
            let d = deboor::curve_derivatives(self.degree, &self.knots, &hp, t, 2);
            let diff = d[0] - point;
            let f = d[1].dot(diff);
            let df = d[2].dot(diff) + d[1].length_squared();
            if df.abs() < f64::EPSILON {
                break;
            }
            let next = (t - f / df).clamp(a, b);
            if (next - t).abs() < 1e-14 * (1.0 + (b - a)) {
                t = next;
                break;
            }
            t = next;
        }
        t
    }

    /// Same curve with a clamped knot vector.
    pub fn clamped(&self) -> Result<Self> {
        if self.knots.is_clamped(self.degree) {
            return Ok(self.clone());
        }
        let p = self.degree;
        let (a, b) = self.domain();
        let mut knots = self.knots.to_vec();
        let mut hp = self.homogeneous();

        let s = self.knots.find_multiplicity(a, KNOT_TOLERANCE);
        if s < p {
            let (k, rows) = insert_knot(p, &knots, &[hp], a, p - s)?;
            knots = k;
            hp = rows.into_iter().next().unwrap_or_default();
        }
        let k0 = knots.iter().position(|&k| (k - a).abs() <= KNOT_TOLERANCE).unwrap_or(0);
        if k0 > 0 {
            // The point before the run of `a` now lies on the curve at `a`.
            let mut trimmed = vec![a];
            trimmed.extend_from_slice(&knots[k0..]);
            knots = trimmed;
            hp.drain(..k0 - 1);
        }

        let s = knots.iter().filter(|&&k| (k - b).abs() <= KNOT_TOLERANCE).count();
        if s < p {
            let (k, rows) = insert_knot(p, &knots, &[hp], b, p - s)?;
            knots = k;
            hp = rows.into_iter().next().unwrap_or_default();
        }
        let last = knots.len() - 1;
        let k1 = knots.iter().rposition(|&k| (k - b).abs() <= KNOT_TOLERANCE).unwrap_or(last);
        if k1 < last {
            knots.truncate(k1 + 1);
            knots.push(b);
            hp.truncate(k1 - p + 1);
        }
        self.rebuild(p, knots, &hp)
    }

    /// Raise the degree by `delta` without changing the image.
    pub fn elevate_degree(&self, delta: usize) -> Result<Self> {
        if delta == 0 {
            return Ok(self.clone());
        }
        let clamped = self.clamped()?;
        let (knots, rows) = elevate(clamped.degree, &clamped.knots, &[clamped.homogeneous()], delta)?;
        self.rebuild(self.degree + delta, knots, &rows[0])
    }

    /// Lower the degree by `delta` while staying within `tolerance`.
    ///
    /// Without `if_possible`, failing to remove all `delta` degrees is a
    /// `DegreeReduction` error; with it the best partial result is returned.
    pub fn reduce_degree(&self, delta: usize, tolerance: f64, if_possible: bool) -> Result<DegreeReductionOutcome> {
        let reference = self.clamped()?;
        let mut current = reference.clone();
        let mut removed = 0;
        let mut error = 0.0;
        let mut rejected = 0.0;
        while removed < delta {
            if current.degree < 2 {
                log::debug!("degree reduction stopped at degree {}", current.degree);
                break;
            }
            let (knots, rows, net_error) = reduce_once(current.degree, &current.knots, &[current.homogeneous()])?;
            let mut candidate = current.rebuild(current.degree - 1, knots, &rows[0])?;
            let deviation = candidate.deviation_from(&reference);
            if deviation > tolerance {
                log::debug!(
                    "degree {} -> {} rejected: deviation {deviation:e} (net {net_error:e}) > {tolerance:e}",
                    current.degree,
                    candidate.degree
                );
                rejected = deviation;
                break;
            }
            for (value, multiplicity) in candidate.knots.interior(candidate.degree) {
                let original = reference.knots.find_multiplicity(value, KNOT_TOLERANCE).max(1);
                let target = original.saturating_sub(removed + 1).max(1);
                if multiplicity > target {
                    let (curve, _, _, _) = candidate.remove_against(&reference, value, multiplicity - target, tolerance)?;
                    candidate = curve;
                }
            }
            error = candidate.deviation_from(&reference);
            current = candidate;
            removed += 1;
        }
        if removed < delta && !if_possible {
            return Err(KernelError::DegreeReduction {
                from: self.degree,
                to: self.degree.saturating_sub(delta),
                error: rejected,
                tolerance,
            });
        }
        Ok(DegreeReductionOutcome {
            curve: current,
            removed,
            error,
        })
    }

    /// Split into two curves at `t`, which must lie strictly inside the
    /// domain.
    pub fn split_at(&self, t: f64) -> Result<(Self, Self)> {
        let (a, b) = self.domain();
        if t <= a + KNOT_TOLERANCE || t >= b - KNOT_TOLERANCE {
            return Err(KernelError::InvalidInput(format!(
                "split parameter {t} is not inside the domain [{a}, {b}]"
            )));
        }
        let p = self.degree;
        let curve = self.clamped()?;
        let s = curve.knots.find_multiplicity(t, KNOT_TOLERANCE);
        let curve = curve.insert_knot(t, p.saturating_sub(s))?;
        let k = curve
            .knots
            .iter()
            .rposition(|&kn| (kn - t).abs() <= KNOT_TOLERANCE)
            .ok_or_else(|| KernelError::Geometry(format!("knot {t} missing after insertion")))?;
        let t = curve.knots[k];
        let hp = curve.homogeneous();

        let mut left_knots = curve.knots[..=k].to_vec();
        left_knots.push(t);
        let left = self.rebuild(p, left_knots, &hp[..=k - p])?;

        let mut right_knots = vec![t];
        right_knots.extend_from_slice(&curve.knots[k - p + 1..]);
        let right = self.rebuild(p, right_knots, &hp[k - p..])?;
        Ok((left, right))
    }

    /// The part of the curve between `t_min` and `t_max`, optionally
    /// reparametrized onto `[0, 1]`.
    pub fn cut_segment(&self, t_min: f64, t_max: f64, rescale: bool) -> Result<Self> {
        let (a, b) = self.domain();
        if t_max <= t_min {
            return Err(KernelError::InvalidInput(format!(
                "empty segment [{t_min}, {t_max}]"
            )));
        }
        if t_min < a - KNOT_TOLERANCE || t_max > b + KNOT_TOLERANCE {
            return Err(KernelError::Domain {
                t: if t_min < a { t_min } else { t_max },
                min: a,
                max: b,
            });
        }
        let mut curve = self.clamped()?;
        if t_min > a + KNOT_TOLERANCE {
            curve = curve.split_at(t_min)?.1;
        }
        if t_max < b - KNOT_TOLERANCE {
            curve = curve.split_at(t_max)?.0;
        }
        if rescale {
            curve = curve.reparametrize(0.0, 1.0)?;
        }
        Ok(curve)
    }

    /// Split at every parameter in `ts` lying inside the domain.
    pub fn split_curve(&self, ts: &[f64]) -> Result<Vec<Self>> {
        let (a, b) = self.domain();
        let mut cuts: Vec<f64> = ts
            .iter()
            .copied()
            .filter(|&t| t > a + KNOT_TOLERANCE && t < b - KNOT_TOLERANCE)
            .collect();
        cuts.sort_by(f64::total_cmp);
        cuts.dedup_by(|x, y| (*x - *y).abs() <= KNOT_TOLERANCE);

        let mut pieces = Vec::with_capacity(cuts.len() + 1);
        let mut rest = self.clone();
        for t in cuts {
            let (left, right) = rest.split_at(t)?;
            pieces.push(left);
            rest = right;
        }
        pieces.push(rest);
        Ok(pieces)
    }

    /// Affinely remap the domain onto `[new_min, new_max]`.
    pub fn reparametrize(&self, new_min: f64, new_max: f64) -> Result<Self> {
        if new_max <= new_min {
            return Err(KernelError::InvalidInput(format!(
                "invalid target domain [{new_min}, {new_max}]"
            )));
        }
        let (a, b) = self.domain();
        let mut curve = self.clone();
        curve.knots = self.knots.remap(a, b, new_min, new_max);
        Ok(curve)
    }

    /// The same image traversed backwards.
    pub fn reverse(&self) -> Self {
        let mut curve = self.clone();
        curve.knots = self.knots.reverse();
        curve.control_points.reverse();
        curve.weights.reverse();
        curve
    }

    /// Apply an affine transform to the control points.
    pub fn transform(&self, transform: &Transform) -> Self {
        let mut curve = self.clone();
        for p in &mut curve.control_points {
            *p = transform.transform_point(*p);
        }
        curve
    }
}

impl Curve for NurbsCurve {
    fn point_at(&self, t: f64) -> Point3 {
        deboor::curve_point_with(self.degree, &self.knots, self.control_points.len(), t, |i| {
            self.homogeneous_point(i)
        })
    }

    fn domain(&self) -> (f64, f64) {
        self.knots.domain(self.degree)
    }

    fn derivatives_at(&self, t: f64, n: usize) -> Vec<Vector3> {
        let aders = deboor::homogeneous_derivatives_with(self.degree, &self.knots, self.control_points.len(), t, n, |i| {
            self.homogeneous_point(i)
        });
        deboor::rational_derivatives(&aders)
    }

    fn to_nurbs(&self) -> Result<NurbsCurve> {
        Ok(self.clone())
    }
}

/// Bring curves to a common degree, domain `[0, 1]` and knot vector.
pub fn unify_curves(curves: &[NurbsCurve]) -> Result<Vec<NurbsCurve>> {
    let Some(degree) = curves.iter().map(|c| c.degree).max() else {
        return Ok(Vec::new());
    };
    let normalized = curves
        .iter()
        .map(|c| c.elevate_degree(degree - c.degree)?.reparametrize(0.0, 1.0))
        .collect::<Result<Vec<_>>>()?;

    let mut merged: Vec<(f64, usize)> = Vec::new();
    for curve in &normalized {
        for (value, count) in curve.knots.interior(degree) {
            match merged.iter_mut().find(|(v, _)| (*v - value).abs() <= KNOT_TOLERANCE) {
                Some(entry) => entry.1 = entry.1.max(count),
                None => merged.push((value, count)),
            }
        }
    }

    normalized
        .into_iter()
        .map(|curve| {
            let mut result = curve.clone();
            for &(value, count) in &merged {
                let have = curve.knots.find_multiplicity(value, KNOT_TOLERANCE);
                if count > have {
                    result = result.insert_knot(value, count - have)?;
                }
            }
            Ok(result)
        })
        .collect()
}
