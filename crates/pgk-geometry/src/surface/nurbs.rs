//! Tensor-product NURBS surface.

use pgk_core::{KernelError, Result};
use pgk_math::{Aabb3, DVec4, Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::{Surface, SurfaceDirection};
use crate::curve::NurbsCurve;
use crate::nurbs::degree::{elevate, exact_tolerance, reduce_once, remove_knots_within};
use crate::nurbs::refine::{insert_knot, remove_knot_once};
use crate::nurbs::{deboor, from_homogeneous, to_homogeneous, KnotVector, Rows, KNOT_TOLERANCE};

/// A NURBS surface.
///
/// `control_points[i][j]` is the control point at index `i` along U and `j`
/// along V; `weights` has the same shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NurbsSurface {
    degree_u: usize,
    degree_v: usize,
    knots_u: KnotVector,
    knots_v: KnotVector,
    control_points: Vec<Vec<Point3>>,
    weights: Vec<Vec<f64>>,
}

/// Plain-array form of a NURBS surface for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NurbsSurfaceData {
    pub degree_u: usize,
    pub degree_v: usize,
    pub knots_u: Vec<f64>,
    pub knots_v: Vec<f64>,
    pub control_points: Vec<Vec<[f64; 3]>>,
    pub weights: Vec<Vec<f64>>,
}

/// Result of a best-effort knot removal or degree reduction on a surface.
#[derive(Debug, Clone)]
pub struct SurfaceEditOutcome {
    pub surface: NurbsSurface,
    /// Knot copies or degrees actually removed.
    pub removed: usize,
    /// Largest sampled distance between the result and the input surface.
    pub error: f64,
}

impl NurbsSurface {
    pub fn new(
        degree_u: usize,
        degree_v: usize,
        knots_u: impl Into<KnotVector>,
        knots_v: impl Into<KnotVector>,
        control_points: Vec<Vec<Point3>>,
        weights: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let (knots_u, knots_v) = (knots_u.into(), knots_v.into());
        let nu = control_points.len();
        let nv = control_points.first().map_or(0, Vec::len);
        if control_points.iter().any(|row| row.len() != nv) {
            return Err(KernelError::InvalidInput("control net rows differ in length".into()));
        }
        if weights.len() != nu || weights.iter().any(|row| row.len() != nv) {
            return Err(KernelError::InvalidInput("weights do not match the control net shape".into()));
        }
        if weights.iter().flatten().any(|&w| !(w > 0.0 && w.is_finite())) {
            return Err(KernelError::InvalidInput("weights must be positive".into()));
        }
        knots_u.validate(degree_u, nu)?;
        knots_v.validate(degree_v, nv)?;
        Ok(Self {
            degree_u,
            degree_v,
            knots_u,
            knots_v,
            control_points,
            weights,
        })
    }

    pub fn bspline(
        degree_u: usize,
        degree_v: usize,
        knots_u: impl Into<KnotVector>,
        knots_v: impl Into<KnotVector>,
        control_points: Vec<Vec<Point3>>,
    ) -> Result<Self> {
        let weights = control_points.iter().map(|row| vec![1.0; row.len()]).collect();
        Self::new(degree_u, degree_v, knots_u, knots_v, control_points, weights)
    }

    pub fn from_homogeneous(
        degree_u: usize,
        degree_v: usize,
        knots_u: impl Into<KnotVector>,
        knots_v: impl Into<KnotVector>,
        net: &[Vec<DVec4>],
    ) -> Result<Self> {
        let (control_points, weights) = net.iter().map(|row| from_homogeneous(row)).unzip();
        Self::new(degree_u, degree_v, knots_u, knots_v, control_points, weights)
    }

    pub fn degree(&self, direction: SurfaceDirection) -> usize {
        match direction {
            SurfaceDirection::U => self.degree_u,
            SurfaceDirection::V => self.degree_v,
        }
    }

    pub fn knots(&self, direction: SurfaceDirection) -> &KnotVector {
        match direction {
            SurfaceDirection::U => &self.knots_u,
            SurfaceDirection::V => &self.knots_v,
        }
    }

    pub fn domain(&self, direction: SurfaceDirection) -> (f64, f64) {
        self.knots(direction).domain(self.degree(direction))
    }

    pub fn control_points(&self) -> &[Vec<Point3>] {
        &self.control_points
    }

    pub fn weights(&self) -> &[Vec<f64>] {
        &self.weights
    }

    pub fn homogeneous(&self) -> Rows {
        self.control_points
            .iter()
            .zip(&self.weights)
            .map(|(points, weights)| to_homogeneous(points, weights))
            .collect()
    }

    pub fn bounding_box(&self) -> Aabb3 {
        Aabb3::from_points(self.control_points.iter().flatten().copied()).unwrap_or(Aabb3::point(Point3::ZERO))
    }

    pub fn to_data(&self) -> NurbsSurfaceData {
        NurbsSurfaceData {
            degree_u: self.degree_u,
            degree_v: self.degree_v,
            knots_u: self.knots_u.to_vec(),
            knots_v: self.knots_v.to_vec(),
            control_points: self
                .control_points
                .iter()
                .map(|row| row.iter().map(|p| p.to_array()).collect())
                .collect(),
            weights: self.weights.clone(),
        }
    }

    pub fn from_data(data: &NurbsSurfaceData) -> Result<Self> {
        let control_points = data
            .control_points
            .iter()
            .map(|row| row.iter().map(|&p| Point3::from_array(p)).collect())
            .collect();
        Self::new(
            data.degree_u,
            data.degree_v,
            data.knots_u.clone(),
            data.knots_v.clone(),
            control_points,
            data.weights.clone(),
        )
    }

    /// Homogeneous rows running along `direction`, one per control point
    /// index in the other direction.
    fn rows(&self, direction: SurfaceDirection) -> Rows {
        let net = self.homogeneous();
        match direction {
            SurfaceDirection::V => net,
            SurfaceDirection::U => transpose(&net),
        }
    }

    /// Copy with new degree, knots and rows in `direction`.
    fn with_rows(&self, direction: SurfaceDirection, degree: usize, knots: Vec<f64>, rows: &Rows) -> Result<Self> {
        match direction {
            SurfaceDirection::U => {
                Self::from_homogeneous(degree, self.degree_v, knots, self.knots_v.clone(), &transpose(rows))
            }
            SurfaceDirection::V => Self::from_homogeneous(self.degree_u, degree, self.knots_u.clone(), knots, rows),
        }
    }

    /// All partial derivatives `S_{k,l}` with `k + l <= n`; `[0][0]` is the
    /// point.
    pub fn derivatives_at(&self, u: f64, v: f64, n: usize) -> Vec<Vec<Vector3>> {
        deboor::surface_derivatives(
            self.degree_u,
            self.degree_v,
            &self.knots_u,
            &self.knots_v,
            &self.homogeneous(),
            u,
            v,
            n,
        )
    }

    pub fn insert_knot(&self, direction: SurfaceDirection, value: f64, count: usize) -> Result<Self> {
        let degree = self.degree(direction);
        let (knots, rows) = insert_knot(degree, self.knots(direction), &self.rows(direction), value, count)?;
        self.with_rows(direction, degree, knots, &rows)
    }

    /// Remove up to `count` copies of an interior knot while the surface
    /// moves by at most `tolerance`.
    pub fn remove_knot(
        &self,
        direction: SurfaceDirection,
        value: f64,
        count: usize,
        tolerance: f64,
        if_possible: bool,
    ) -> Result<SurfaceEditOutcome> {
        let degree = self.degree(direction);
        let (a, b) = self.domain(direction);
        if value <= a + KNOT_TOLERANCE || value >= b - KNOT_TOLERANCE {
            return Err(KernelError::InvalidInput(format!(
                "{value} is not an interior knot of [{a}, {b}]"
            )));
        }
        let mut current = self.clone();
        let mut removed = 0;
        let mut error = 0.0;
        let mut rejected = 0.0;
        while removed < count {
            let Some(candidate) = remove_knot_once(degree, current.knots(direction), &current.rows(direction), value)
            else {
                break;
            };
            let next = current.with_rows(direction, degree, candidate.knots, &candidate.rows)?;
            // Weights scale the net error, so only the image is compared.
            let deviation = next.deviation_from(self);
            if deviation > tolerance {
                log::trace!(
                    "surface knot {value}: removal rejected, deviation {deviation:e} (net {:e}) > {tolerance:e}",
                    candidate.error
                );
                rejected = deviation;
                break;
            }
            current = next;
            error = deviation;
            removed += 1;
        }
        log::debug!("surface knot {value} ({direction:?}): removed {removed} of {count}");
        if removed < count && !if_possible {
            return Err(KernelError::KnotRemoval {
                knot: value,
                requested: count,
                removed,
                error: rejected,
                tolerance,
            });
        }
        Ok(SurfaceEditOutcome {
            surface: current,
            removed,
            error,
        })
    }

    /// Raise the degree in `direction` by `delta`; the knot vector in that
    /// direction must be clamped.
    pub fn elevate_degree(&self, direction: SurfaceDirection, delta: usize) -> Result<Self> {
        if delta == 0 {
            return Ok(self.clone());
        }
        let degree = self.degree(direction);
        let (knots, rows) = elevate(degree, self.knots(direction), &self.rows(direction), delta)?;
        self.with_rows(direction, degree + delta, knots, &rows)
    }

    /// Lower the degree in `direction` by `delta` while the surface stays
    /// within `tolerance` of the input.
    pub fn reduce_degree(
        &self,
        direction: SurfaceDirection,
        delta: usize,
        tolerance: f64,
        if_possible: bool,
    ) -> Result<SurfaceEditOutcome> {
        let mut current = self.clone();
        let mut removed = 0;
        let mut error = 0.0;
        let mut rejected = 0.0;
        while removed < delta {
            let degree = current.degree(direction);
            if degree < 2 {
                break;
            }
            let (knots, rows, net_error) = reduce_once(degree, current.knots(direction), &current.rows(direction))?;
            let targets = KnotVector::new(knots.clone()).interior(degree - 1);
            let exact = exact_tolerance(&rows);
            let (knots, rows) = remove_knots_within(degree - 1, knots, rows, &targets, exact);
            let candidate = current.with_rows(direction, degree - 1, knots, &rows)?;
            let deviation = candidate.deviation_from(self);
            if deviation > tolerance {
                log::debug!(
                    "surface degree {degree} -> {} rejected: deviation {deviation:e} (net {net_error:e})",
                    degree - 1
                );
                rejected = deviation;
                break;
            }
            current = candidate;
            error = deviation;
            removed += 1;
        }
        if removed < delta && !if_possible {
            return Err(KernelError::DegreeReduction {
                from: self.degree(direction),
                to: self.degree(direction).saturating_sub(delta),
                error: rejected,
                tolerance,
            });
        }
        Ok(SurfaceEditOutcome {
            surface: current,
            removed,
            error,
        })
    }

    /// Largest distance to `reference` over a grid spread across every knot
    /// span of `reference` in both directions.
    pub fn deviation_from(&self, reference: &NurbsSurface) -> f64 {
        let us = reference.knots_u.span_samples(reference.degree_u, 6);
        let vs = reference.knots_v.span_samples(reference.degree_v, 6);
        let uvs: Vec<(f64, f64)> = us.iter().flat_map(|&u| vs.iter().map(move |&v| (u, v))).collect();
        self.points_at(&uvs)
            .iter()
            .zip(reference.points_at(&uvs))
            .map(|(p, q)| (*p - q).length())
            .fold(0.0, f64::max)
    }

    /// Iso-parametric curve with `direction` fixed at `parameter`. The curve
    /// runs along the other direction.
    pub fn iso_curve(&self, direction: SurfaceDirection, parameter: f64) -> Result<NurbsCurve> {
        let (min, max) = self.domain(direction);
        if parameter < min - KNOT_TOLERANCE || parameter > max + KNOT_TOLERANCE {
            return Err(KernelError::Domain { t: parameter, min, max });
        }
        let degree = self.degree(direction);
        let knots = self.knots(direction);
        let hpoints: Vec<DVec4> = self
            .rows(direction)
            .iter()
            .map(|row| deboor::homogeneous_derivatives(degree, knots, row, parameter, 0)[0])
            .collect();
        let other = direction.other();
        NurbsCurve::from_homogeneous(self.degree(other), self.knots(other).clone(), &hpoints)
    }

    /// Modify the surface so that the iso-curve with `direction` fixed at
    /// `parameter` coincides with `curve`.
    ///
    /// Degrees and knots along the curve are unified first, then `parameter`
    /// is inserted until one control row interpolates the iso-curve, and
    /// that row is replaced by the control points of `curve`. The rest of
    /// the surface changes only near `parameter`.
    pub fn adjust_to_curve(&self, direction: SurfaceDirection, parameter: f64, curve: &NurbsCurve) -> Result<Self> {
        let other = direction.other();
        for dir in [direction, other] {
            if !self.knots(dir).is_clamped(self.degree(dir)) {
                return Err(KernelError::InvalidInput(format!(
                    "surface knot vector in {dir:?} must be clamped"
                )));
            }
        }
        let (min, max) = self.domain(direction);
        if parameter < min - KNOT_TOLERANCE || parameter > max + KNOT_TOLERANCE {
            return Err(KernelError::Domain { t: parameter, min, max });
        }

        let (a, b) = self.domain(other);
        let mut surface = self.clone();
        let mut target = curve.clamped()?.reparametrize(a, b)?;
        let (ps, pt) = (surface.degree(other), target.degree());
        if pt < ps {
            target = target.elevate_degree(ps - pt)?;
        } else if ps < pt {
            surface = surface.elevate_degree(other, pt - ps)?;
        }
        for (value, count) in surface.knots(other).difference(target.knots()) {
            surface = surface.insert_knot(other, value, count)?;
        }
        for (value, count) in target.knots().difference(surface.knots(other)) {
            target = target.insert_knot(value, count)?;
        }
        let target_h = target.homogeneous();
        let row_len = match other {
            SurfaceDirection::V => surface.control_points[0].len(),
            SurfaceDirection::U => surface.control_points.len(),
        };
        if target_h.len() != row_len {
            return Err(KernelError::Geometry(format!(
                "could not unify curve ({} control points) with surface ({row_len})",
                target_h.len()
            )));
        }

        let p = surface.degree(direction);
        let index = if parameter <= min + KNOT_TOLERANCE {
            0
        } else if parameter >= max - KNOT_TOLERANCE {
            match direction {
                SurfaceDirection::U => surface.control_points.len() - 1,
                SurfaceDirection::V => surface.control_points[0].len() - 1,
            }
        } else {
            let s = surface.knots(direction).find_multiplicity(parameter, KNOT_TOLERANCE);
            if s < p {
                surface = surface.insert_knot(direction, parameter, p - s)?;
            }
            let r = surface
                .knots(direction)
                .iter()
                .rposition(|&k| (k - parameter).abs() <= KNOT_TOLERANCE)
                .ok_or_else(|| KernelError::Geometry(format!("knot {parameter} missing after insertion")))?;
            r - p
        };
        log::debug!("replacing control row {index} ({direction:?}) with the target curve");

        let mut net = surface.homogeneous();
        match direction {
            SurfaceDirection::U => net[index] = target_h,
            SurfaceDirection::V => {
                for (row, h) in net.iter_mut().zip(target_h) {
                    row[index] = h;
                }
            }
        }
        Self::from_homogeneous(
            surface.degree_u,
            surface.degree_v,
            surface.knots_u.clone(),
            surface.knots_v.clone(),
            &net,
        )
    }
}

fn transpose(net: &[Vec<DVec4>]) -> Rows {
    let width = net.first().map_or(0, Vec::len);
    (0..width).map(|j| net.iter().map(|row| row[j]).collect()).collect()
}

impl Surface for NurbsSurface {
    fn point_at(&self, u: f64, v: f64) -> Point3 {
        deboor::surface_point(
            self.degree_u,
            self.degree_v,
            &self.knots_u,
            &self.knots_v,
            &self.homogeneous(),
            u,
            v,
        )
    }

    fn domain_u(&self) -> (f64, f64) {
        self.domain(SurfaceDirection::U)
    }

    fn domain_v(&self) -> (f64, f64) {
        self.domain(SurfaceDirection::V)
    }

    fn points_at(&self, uvs: &[(f64, f64)]) -> Vec<Point3> {
        let net = self.homogeneous();
        uvs.iter()
            .map(|&(u, v)| {
                deboor::surface_point(self.degree_u, self.degree_v, &self.knots_u, &self.knots_v, &net, u, v)
            })
            .collect()
    }

    fn partial_derivatives_at(&self, u: f64, v: f64) -> (Vector3, Vector3) {
        let d = self.derivatives_at(u, v, 1);
        (d[1][0], d[0][1])
    }

    fn to_nurbs(&self) -> Result<NurbsSurface> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Curve;
    use pgk_math::{dvec3, linspace, DVec3};

    fn bumpy() -> NurbsSurface {
        let control_points: Vec<Vec<Point3>> = (0..4)
            .map(|i| {
                (0..4)
                    .map(|j| dvec3(i as f64, j as f64, ((i * j) % 3) as f64 * 0.5))
                    .collect()
            })
            .collect();
        let weights: Vec<Vec<f64>> = (0..4)
            .map(|i| (0..4).map(|j| 1.0 + 0.25 * ((i + j) % 2) as f64).collect())
            .collect();
        let knots = vec![0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0];
        NurbsSurface::new(2, 2, knots.clone(), knots, control_points, weights).unwrap()
    }

    fn max_distance(a: &NurbsSurface, b: &NurbsSurface) -> f64 {
        let mut worst: f64 = 0.0;
        for u in linspace(0.0, 1.0, 9) {
            for v in linspace(0.0, 1.0, 9) {
                worst = worst.max((a.point_at(u, v) - b.point_at(u, v)).length());
            }
        }
        worst
    }

    #[test]
    fn test_validation() {
        let pts = vec![vec![DVec3::ZERO, DVec3::X], vec![DVec3::Y]];
        let knots = vec![0.0, 0.0, 1.0, 1.0];
        assert!(NurbsSurface::bspline(1, 1, knots.clone(), knots, pts).is_err());
    }

    #[test]
    fn test_corners_and_normal_of_flat_patch() {
        let net = vec![
            vec![dvec3(0.0, 0.0, 0.0), dvec3(0.0, 2.0, 0.0)],
            vec![dvec3(3.0, 0.0, 0.0), dvec3(3.0, 2.0, 0.0)],
        ];
        let knots = vec![0.0, 0.0, 1.0, 1.0];
        let s = NurbsSurface::bspline(1, 1, knots.clone(), knots, net).unwrap();
        assert!((s.point_at(1.0, 1.0) - dvec3(3.0, 2.0, 0.0)).length() < 1e-12);
        assert!((s.point_at(0.5, 0.25) - dvec3(1.5, 0.5, 0.0)).length() < 1e-12);
        assert!((s.normal_at(0.3, 0.7) - DVec3::Z).length() < 1e-12);
        let (su, sv) = s.partial_derivatives_at(0.3, 0.7);
        assert!((su - dvec3(3.0, 0.0, 0.0)).length() < 1e-12);
        assert!((sv - dvec3(0.0, 2.0, 0.0)).length() < 1e-12);
    }

    #[test]
    fn test_analytic_partials_match_differences() {
        let s = bumpy();
        let (u, v, h) = (0.3, 0.65, 1e-6);
        let d = s.derivatives_at(u, v, 2);
        let su = (s.point_at(u + h, v) - s.point_at(u - h, v)) / (2.0 * h);
        let sv = (s.point_at(u, v + h) - s.point_at(u, v - h)) / (2.0 * h);
        assert!((d[1][0] - su).length() < 1e-6);
        assert!((d[0][1] - sv).length() < 1e-6);
        assert!((d[0][0] - s.point_at(u, v)).length() < 1e-12);
    }

    #[test]
    fn test_data_round_trip() {
        let s = bumpy();
        let back = NurbsSurface::from_data(&s.to_data()).unwrap();
        assert_eq!(max_distance(&s, &back), 0.0);
    }

    #[test]
    fn test_insert_and_remove_knot_both_directions() {
        let s = bumpy();
        for dir in [SurfaceDirection::U, SurfaceDirection::V] {
            let refined = s.insert_knot(dir, 0.25, 1).unwrap();
            assert_eq!(refined.knots(dir).len(), s.knots(dir).len() + 1);
            assert!(max_distance(&s, &refined) < 1e-9);

            let outcome = refined.remove_knot(dir, 0.25, 1, 1e-9, false).unwrap();
            assert_eq!(outcome.removed, 1);
            assert!(max_distance(&s, &outcome.surface) < 1e-9);
        }
    }

    #[test]
    fn test_remove_knot_reports_failure() {
        let s = bumpy();
        let err = s.remove_knot(SurfaceDirection::U, 0.5, 1, 1e-9, false).unwrap_err();
        assert!(err.is_tolerance_failure());
        let outcome = s.remove_knot(SurfaceDirection::U, 0.5, 1, 1e-9, true).unwrap();
        assert_eq!(outcome.removed, 0);
    }

    #[test]
    fn test_elevate_then_reduce() {
        let s = bumpy();
        let elevated = s.elevate_degree(SurfaceDirection::V, 1).unwrap();
        assert_eq!(elevated.degree(SurfaceDirection::V), 3);
        assert!(max_distance(&s, &elevated) < 1e-9);

        let outcome = elevated.reduce_degree(SurfaceDirection::V, 1, 1e-6, false).unwrap();
        assert_eq!(outcome.removed, 1);
        assert_eq!(outcome.surface.degree(SurfaceDirection::V), 2);
        assert!(max_distance(&s, &outcome.surface) < 1e-6);
        assert_eq!(outcome.surface.knots(SurfaceDirection::V), s.knots(SurfaceDirection::V));

        assert!(s.reduce_degree(SurfaceDirection::U, 1, 1e-9, false).is_err());
    }

    #[test]
    fn test_small_weights_do_not_hide_removal_error() {
        // Uniformly tiny weights leave the image unchanged but shrink the
        // homogeneous net, so acceptance must look at the points.
        let heights = [0.0, 3.0, -3.0, 3.0, 0.0];
        let control_points: Vec<Vec<Point3>> = heights
            .iter()
            .enumerate()
            .map(|(i, &z)| vec![dvec3(i as f64, 0.0, z), dvec3(i as f64, 1.0, z)])
            .collect();
        let weights = vec![vec![0.001; 2]; 5];
        let s = NurbsSurface::new(
            3,
            1,
            vec![0.0, 0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0, 1.0],
            vec![0.0, 0.0, 1.0, 1.0],
            control_points,
            weights,
        )
        .unwrap();

        let err = s.remove_knot(SurfaceDirection::U, 0.5, 1, 0.01, false).unwrap_err();
        assert!(err.is_tolerance_failure());
        let outcome = s.remove_knot(SurfaceDirection::U, 0.5, 1, 0.01, true).unwrap();
        assert_eq!(outcome.removed, 0);
        assert_eq!(max_distance(&s, &outcome.surface), 0.0);

        let lowered = s.reduce_degree(SurfaceDirection::U, 1, 0.01, true).unwrap();
        assert_eq!(lowered.removed, 0);
        assert!(s.reduce_degree(SurfaceDirection::U, 1, 0.01, false).is_err());
    }

    #[test]
    fn test_iso_curves() {
        let s = bumpy();
        let along_v = s.iso_curve(SurfaceDirection::U, 0.4).unwrap();
        let along_u = s.iso_curve(SurfaceDirection::V, 0.7).unwrap();
        for t in linspace(0.0, 1.0, 7) {
            assert!((along_v.point_at(t) - s.point_at(0.4, t)).length() < 1e-12);
            assert!((along_u.point_at(t) - s.point_at(t, 0.7)).length() < 1e-12);
        }
        assert!(s.iso_curve(SurfaceDirection::U, 1.5).is_err());
    }

    #[test]
    fn test_adjust_to_curve() {
        let s = bumpy();
        let target = NurbsCurve::bspline(
            3,
            vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
            vec![dvec3(0.3, 0.0, 2.0), dvec3(0.5, 1.0, 2.5), dvec3(0.5, 2.0, 1.5), dvec3(0.3, 3.0, 2.0)],
        )
        .unwrap();
        for (dir, parameter) in [(SurfaceDirection::U, 0.3), (SurfaceDirection::U, 0.0), (SurfaceDirection::V, 0.6)] {
            let adjusted = s.adjust_to_curve(dir, parameter, &target).unwrap();
            let iso = adjusted.iso_curve(dir, parameter).unwrap();
            for t in linspace(0.0, 1.0, 11) {
                assert!((iso.point_at(t) - target.point_at(t)).length() < 1e-9, "{dir:?} at {parameter}");
            }
        }
    }
}
