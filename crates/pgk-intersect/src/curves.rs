//! Curve-curve intersection by bounding box subdivision.

use nalgebra::{Matrix3x2, Vector2, Vector3 as NVector3};
use pgk_core::{KernelError, Result};
use pgk_geometry::{Curve, NurbsCurve};
use pgk_math::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Options for [`intersect_nurbs_curves`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveIntersectionOptions {
    /// Pieces whose boxes are smaller than this share of the input boxes are
    /// handed to the numeric solver instead of being split further.
    pub numeric_threshold: f64,
    /// Largest accepted `|C1(t1) - C2(t2)|`.
    pub precision: f64,
    /// Subdivision depth after which the solver is tried regardless of size.
    pub max_depth: usize,
    pub max_iterations: usize,
}

impl Default for CurveIntersectionOptions {
    fn default() -> Self {
        Self {
            numeric_threshold: 0.02,
            precision: 1e-6,
            max_depth: 24,
            max_iterations: 50,
        }
    }
}

/// A point shared by both curves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveCurveHit {
    pub t1: f64,
    pub t2: f64,
    /// Midpoint of `C1(t1)` and `C2(t2)`.
    pub point: Point3,
}

struct Search<'a> {
    options: &'a CurveIntersectionOptions,
    threshold: f64,
    margin: f64,
    hits: Vec<CurveCurveHit>,
}

fn to_na(v: Vector3) -> NVector3<f64> {
    NVector3::new(v.x, v.y, v.z)
}

/// Points where `first` and `second` meet, in increasing `t1`.
///
/// Both curves are split recursively while their control polygon boxes
/// overlap; small enough pairs are refined by Gauss-Newton on
/// `C1(t1) - C2(t2)`. Overlapping stretches are reported as the isolated
/// points the solver lands on, not as intervals.
pub fn intersect_nurbs_curves(
    first: &NurbsCurve,
    second: &NurbsCurve,
    options: &CurveIntersectionOptions,
) -> Result<Vec<CurveCurveHit>> {
    if !(options.numeric_threshold > 0.0 && options.numeric_threshold < 1.0) {
        return Err(KernelError::InvalidInput(format!(
            "numeric threshold must lie in (0, 1), got {}",
            options.numeric_threshold
        )));
    }
    let (a, b) = (first.clamped()?, second.clamped()?);
    let scale = a.bounding_box().size().max(b.bounding_box().size());
    let mut search = Search {
        options,
        threshold: options.numeric_threshold * scale,
        margin: 1e-4 * scale.max(f64::EPSILON),
        hits: Vec::new(),
    };
    search.recurse(&a, &b, 0)?;

    let mut hits = search.hits;
    hits.sort_by(|x, y| x.t1.total_cmp(&y.t1));
    let (s1, s2) = (span(first), span(second));
    let mut unique: Vec<CurveCurveHit> = Vec::with_capacity(hits.len());
    for hit in hits {
        let known = unique
            .iter()
            .any(|u| (u.t1 - hit.t1).abs() <= 1e-4 * s1 && (u.t2 - hit.t2).abs() <= 1e-4 * s2);
        if !known {
            unique.push(hit);
        }
    }
    log::debug!("curve/curve: {} intersections", unique.len());
    Ok(unique)
}

fn span(curve: &NurbsCurve) -> f64 {
    let (a, b) = curve.domain();
    b - a
}

impl Search<'_> {
    fn recurse(&mut self, c1: &NurbsCurve, c2: &NurbsCurve, depth: usize) -> Result<()> {
        let box1 = c1.bounding_box().inflate(self.margin);
        let box2 = c2.bounding_box().inflate(self.margin);
        if !box1.intersects(&box2) {
            return Ok(());
        }
        let (size1, size2) = (box1.size(), box2.size());
        if (size1 <= self.threshold && size2 <= self.threshold) || depth >= self.options.max_depth {
            if let Some(hit) = self.solve(c1, c2) {
                self.hits.push(hit);
            }
            return Ok(());
        }
        if size1 >= size2 {
            let (a, b) = c1.domain();
            let (left, right) = c1.split_at(0.5 * (a + b))?;
            self.recurse(&left, c2, depth + 1)?;
            self.recurse(&right, c2, depth + 1)
        } else {
            let (a, b) = c2.domain();
            let (left, right) = c2.split_at(0.5 * (a + b))?;
            self.recurse(c1, &left, depth + 1)?;
            self.recurse(c1, &right, depth + 1)
        }
    }

    /// Gauss-Newton on the pair, kept inside both pieces' domains.
    fn solve(&self, c1: &NurbsCurve, c2: &NurbsCurve) -> Option<CurveCurveHit> {
        let (a1, b1) = c1.domain();
        let (a2, b2) = c2.domain();
        let mut x = Vector2::new(0.5 * (a1 + b1), 0.5 * (a2 + b2));
        for _ in 0..self.options.max_iterations {
            let f = to_na(c1.point_at(x[0]) - c2.point_at(x[1]));
            if f.norm() <= self.options.precision {
                let point = 0.5 * (c1.point_at(x[0]) + c2.point_at(x[1]));
                return Some(CurveCurveHit { t1: x[0], t2: x[1], point });
            }
            let j = Matrix3x2::from_columns(&[to_na(c1.tangent_at(x[0])), -to_na(c2.tangent_at(x[1]))]);
            let step = (j.transpose() * j).lu().solve(&(-(j.transpose() * f)))?;
            let next = Vector2::new((x[0] + step[0]).clamp(a1, b1), (x[1] + step[1]).clamp(a2, b2));
            if (next - x).norm() <= f64::EPSILON * (1.0 + x.norm()) {
                break;
            }
            x = next;
        }
        log::trace!("curve/curve pair [{a1}, {b1}] x [{a2}, {b2}] has no root");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgk_geometry::curve::{Circle, Line};
    use pgk_math::{dvec3, DVec3};

    fn line(a: Point3, b: Point3) -> NurbsCurve {
        Line::new(a, b).to_nurbs().unwrap()
    }

    #[test]
    fn test_crossing_lines() {
        let first = line(dvec3(0.0, 0.0, 0.0), dvec3(2.0, 2.0, 0.0));
        let second = line(dvec3(0.0, 2.0, 0.0), dvec3(2.0, 0.0, 0.0));
        let hits = intersect_nurbs_curves(&first, &second, &CurveIntersectionOptions::default()).unwrap();
        assert_eq!(hits.len(), 1);
        assert!((hits[0].t1 - 0.5).abs() < 1e-6);
        assert!((hits[0].t2 - 0.5).abs() < 1e-6);
        assert!((hits[0].point - dvec3(1.0, 1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_circle_and_line() {
        let circle = Circle::new(DVec3::ZERO, DVec3::Z, 1.0).to_nurbs().unwrap();
        let chord = line(dvec3(-2.0, 0.5, 0.0), dvec3(2.0, 0.5, 0.0));
        let hits = intersect_nurbs_curves(&circle, &chord, &CurveIntersectionOptions::default()).unwrap();
        assert_eq!(hits.len(), 2);
        let mut xs: Vec<f64> = hits.iter().map(|h| h.point.x).collect();
        xs.sort_by(f64::total_cmp);
        let x = 0.75f64.sqrt();
        assert!((xs[0] + x).abs() < 1e-6 && (xs[1] - x).abs() < 1e-6);
        for hit in &hits {
            assert!((circle.point_at(hit.t1) - chord.point_at(hit.t2)).length() < 1e-6);
        }
    }

    #[test]
    fn test_disjoint_and_skew() {
        let circle = Circle::new(DVec3::ZERO, DVec3::Z, 1.0).to_nurbs().unwrap();
        let above = line(dvec3(-2.0, 2.0, 0.0), dvec3(2.0, 2.0, 0.0));
        assert!(intersect_nurbs_curves(&circle, &above, &CurveIntersectionOptions::default())
            .unwrap()
            .is_empty());
        // Passes over the circle at height 0.1 without touching it.
        let skew = line(dvec3(-2.0, 0.0, 0.1), dvec3(2.0, 0.0, 0.1));
        assert!(intersect_nurbs_curves(&circle, &skew, &CurveIntersectionOptions::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_shared_endpoint() {
        let first = line(dvec3(0.0, 0.0, 0.0), dvec3(1.0, 0.0, 0.0));
        let second = line(dvec3(1.0, 0.0, 0.0), dvec3(1.0, 1.0, 0.0));
        let hits = intersect_nurbs_curves(&first, &second, &CurveIntersectionOptions::default()).unwrap();
        assert_eq!(hits.len(), 1);
        assert!((hits[0].t1 - 1.0).abs() < 1e-9 && hits[0].t2.abs() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_threshold() {
        let first = line(dvec3(0.0, 0.0, 0.0), dvec3(1.0, 0.0, 0.0));
        let options = CurveIntersectionOptions {
            numeric_threshold: 0.0,
            ..Default::default()
        };
        assert!(intersect_nurbs_curves(&first, &first, &options).is_err());
    }
}
