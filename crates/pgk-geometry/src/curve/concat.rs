//! Joining curves end to end.

use pgk_core::{KernelError, Result, Tolerance};
use pgk_math::{Point3, Vector3};

use super::{Curve, CurveRef, NurbsCurve};

/// Join NURBS curves into one.
///
/// Degrees are unified by elevation, each domain is shifted to start where
/// the previous one ends, and the weights of every following curve are
/// scaled so the shared control point has the same weight on both sides. The
/// junction knot gets multiplicity `degree`.
///
/// With `check`, consecutive end points further apart than `max_rho` are a
/// `CurveCoincidence` error; without it such gaps are bridged by a straight
/// span whose parameter length is the gap. With `remove_knots`, junction
/// knots are then removed where that does not move the curve.
pub fn concatenate_nurbs_curves(
    curves: &[NurbsCurve],
    check: bool,
    max_rho: f64,
    remove_knots: bool,
) -> Result<NurbsCurve> {
    let Some(first) = curves.first() else {
        return Err(KernelError::InvalidInput("nothing to concatenate".into()));
    };
    let mut pieces = Vec::with_capacity(2 * curves.len() - 1);
    pieces.push(first.clone());
    for (i, pair) in curves.windows(2).enumerate() {
        let end = pair[0].point_at(pair[0].domain().1);
        let start = pair[1].point_at(pair[1].domain().0);
        let distance = (end - start).length();
        if distance > max_rho {
            if check {
                return Err(KernelError::CurveCoincidence {
                    first: i,
                    second: i + 1,
                    distance,
                    max_rho,
                });
            }
            log::warn!("bridging a gap of {distance:e} between curves {i} and {}", i + 1);
            pieces.push(NurbsCurve::bspline(1, vec![0.0, 0.0, distance, distance], vec![end, start])?);
        }
        pieces.push(pair[1].clone());
    }

    let degree = pieces.iter().map(|c| c.degree()).max().unwrap_or(1);
    let unified = pieces
        .iter()
        .map(|c| c.clamped()?.elevate_degree(degree - c.degree()))
        .collect::<Result<Vec<_>>>()?;

    let mut knots = unified[0].knots().to_vec();
    let mut hpoints = unified[0].homogeneous();
    let mut junctions = Vec::with_capacity(unified.len() - 1);
    for next in &unified[1..] {
        let end = knots[knots.len() - 1];
        let shift = end - next.domain().0;
        knots.pop();
        knots.extend(next.knots()[degree + 1..].iter().map(|&k| k + shift));

        let next_h = next.homogeneous();
        let last_w = hpoints[hpoints.len() - 1].w;
        let scale = last_w / next_h[0].w;
        hpoints.extend(next_h[1..].iter().map(|&h| h * scale));
        junctions.push(end);
    }

    let mut result = NurbsCurve::from_homogeneous(degree, knots, &hpoints)?.with_backend(first.backend());
    log::debug!(
        "concatenated {} curves into degree {} with {} control points",
        pieces.len(),
        degree,
        result.control_points().len()
    );
    if remove_knots {
        for value in junctions {
            result = result.remove_knot(value, degree, Tolerance::DEFAULT_LINEAR, true)?.curve;
        }
    }
    Ok(result)
}

/// Arbitrary curves traversed one after another.
///
/// Each piece keeps its own parametrization, shifted so that the pieces'
/// domains follow each other without gaps.
#[derive(Debug, Clone)]
pub struct ConcatCurve {
    segments: Vec<CurveRef>,
    /// Start of each segment in the combined domain.
    starts: Vec<f64>,
    end: f64,
}

impl ConcatCurve {
    pub fn new(segments: Vec<CurveRef>) -> Result<Self> {
        let Some(first) = segments.first() else {
            return Err(KernelError::InvalidInput("ConcatCurve needs at least one segment".into()));
        };
        let mut position = first.domain().0;
        let mut starts = Vec::with_capacity(segments.len());
        for segment in &segments {
            let (a, b) = segment.domain();
            starts.push(position);
            position += b - a;
        }
        Ok(Self {
            segments,
            starts,
            end: position,
        })
    }

    pub fn segments(&self) -> &[CurveRef] {
        &self.segments
    }

    /// Segment index and local parameter for a global parameter.
    fn locate(&self, t: f64) -> (usize, f64) {
        let index = self.starts.partition_point(|&s| s <= t).saturating_sub(1);
        let (a, _) = self.segments[index].domain();
        (index, a + (t - self.starts[index]))
    }
}

impl Curve for ConcatCurve {
    fn point_at(&self, t: f64) -> Point3 {
        let (i, local) = self.locate(t);
        self.segments[i].point_at(local)
    }

    fn domain(&self) -> (f64, f64) {
        (self.starts[0], self.end)
    }

    fn derivatives_at(&self, t: f64, n: usize) -> Vec<Vector3> {
        let (i, local) = self.locate(t);
        self.segments[i].derivatives_at(local, n)
    }

    fn to_nurbs(&self) -> Result<NurbsCurve> {
        let pieces = self
            .segments
            .iter()
            .map(|s| s.to_nurbs())
            .collect::<Result<Vec<_>>>()?;
        let joined = concatenate_nurbs_curves(&pieces, false, 0.0, false)?;
        let (a, b) = self.domain();
        joined.reparametrize(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{Circle, Line};
    use pgk_math::{dvec3, linspace, DVec3};
    use std::f64::consts::FRAC_PI_2;
    use std::sync::Arc;

    fn quad(points: [Point3; 3]) -> NurbsCurve {
        NurbsCurve::uniform(2, points.to_vec()).unwrap()
    }

    #[test]
    fn test_junction_values() {
        let a = quad([dvec3(0.0, 0.0, 0.0), dvec3(1.0, 1.0, 0.0), dvec3(2.0, 0.0, 0.0)]);
        let b = quad([dvec3(2.0, 0.0, 0.0), dvec3(3.0, -1.0, 0.0), dvec3(4.0, 0.0, 1.0)]);
        let joined = concatenate_nurbs_curves(&[a.clone(), b.clone()], true, 1e-6, false).unwrap();
        assert_eq!(joined.domain(), (0.0, 2.0));
        assert!((joined.point_at(1.0) - a.point_at(1.0)).length() < 1e-12);
        assert!((joined.point_at(1.0) - b.point_at(0.0)).length() < 1e-12);
        for t in linspace(0.0, 1.0, 11) {
            assert!((joined.point_at(t) - a.point_at(t)).length() < 1e-12);
            assert!((joined.point_at(1.0 + t) - b.point_at(t)).length() < 1e-12);
        }
    }

    #[test]
    fn test_gap_is_reported() {
        let a = quad([dvec3(0.0, 0.0, 0.0), dvec3(1.0, 1.0, 0.0), dvec3(2.0, 0.0, 0.0)]);
        let b = quad([dvec3(2.5, 0.0, 0.0), dvec3(3.0, -1.0, 0.0), dvec3(4.0, 0.0, 1.0)]);
        let err = concatenate_nurbs_curves(&[a, b], true, 1e-3, false).unwrap_err();
        match err {
            KernelError::CurveCoincidence { first, second, distance, .. } => {
                assert_eq!((first, second), (0, 1));
                assert!((distance - 0.5).abs() < 1e-12);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_unchecked_gap_is_bridged() {
        let a = Line::new(dvec3(0.0, 0.0, 0.0), dvec3(1.0, 0.0, 0.0)).to_nurbs().unwrap();
        let b = Line::new(dvec3(1.0, 1.0, 0.0), dvec3(2.0, 1.0, 0.0)).to_nurbs().unwrap();
        let joined = concatenate_nurbs_curves(&[a, b], false, 1e-6, false).unwrap();
        assert_eq!(joined.domain(), (0.0, 3.0));
        assert_eq!(joined.control_points().len(), 4);
        assert!((joined.point_at(1.5) - dvec3(1.0, 0.5, 0.0)).length() < 1e-12);
        assert!((joined.point_at(2.0) - dvec3(1.0, 1.0, 0.0)).length() < 1e-12);
        assert!((joined.point_at(3.0) - dvec3(2.0, 1.0, 0.0)).length() < 1e-12);
    }

    #[test]
    fn test_mixed_degrees_and_weights() {
        let line = Line::new(dvec3(1.0, 0.0, 0.0), dvec3(3.0, 0.0, 0.0)).to_nurbs().unwrap();
        let arc = Circle::new(DVec3::ZERO, DVec3::Z, 1.0).with_domain(0.0, FRAC_PI_2);
        let arc_nurbs = arc.to_nurbs().unwrap().reverse();
        // Arc runs from (0,1,0) to (1,0,0), then the line continues along X.
        let joined = concatenate_nurbs_curves(&[arc_nurbs.clone(), line.clone()], true, 1e-9, false).unwrap();
        assert_eq!(joined.degree(), 2);
        let (a, b) = arc_nurbs.domain();
        for t in linspace(a, b, 9) {
            assert!(((joined.point_at(t)).length() - 1.0).abs() < 1e-10);
        }
        assert!((joined.point_at(b + 0.5) - dvec3(2.0, 0.0, 0.0)).length() < 1e-10);
    }

    #[test]
    fn test_remove_junction_knots_for_smooth_join() {
        let c = NurbsCurve::uniform(
            3,
            vec![
                dvec3(0.0, 0.0, 0.0),
                dvec3(1.0, 2.0, 0.0),
                dvec3(2.0, -1.0, 0.0),
                dvec3(3.0, 1.0, 0.0),
                dvec3(4.0, 0.0, 0.0),
            ],
        )
        .unwrap();
        let (left, right) = c.split_at(0.4).unwrap();
        let right = right.reparametrize(0.0, 0.6).unwrap();
        let joined = concatenate_nurbs_curves(&[left, right], true, 1e-9, true).unwrap();
        assert_eq!(joined.control_points().len(), 5);
        for t in linspace(0.0, 1.0, 21) {
            assert!((joined.point_at(t) - c.point_at(t)).length() < 1e-6);
        }
    }

    #[test]
    fn test_concat_curve_generic() {
        let l1: CurveRef = Arc::new(Line::new(dvec3(0.0, 0.0, 0.0), dvec3(1.0, 0.0, 0.0)));
        let l2: CurveRef = Arc::new(Line::new(dvec3(1.0, 0.0, 0.0), dvec3(1.0, 2.0, 0.0)).with_domain(5.0, 7.0));
        let concat = ConcatCurve::new(vec![l1, l2]).unwrap();
        assert_eq!(concat.domain(), (0.0, 3.0));
        assert!((concat.point_at(0.5) - dvec3(0.5, 0.0, 0.0)).length() < 1e-12);
        assert!((concat.point_at(2.0) - dvec3(1.0, 1.0, 0.0)).length() < 1e-12);
        assert!((concat.tangent_at(2.5) - dvec3(0.0, 1.0, 0.0)).length() < 1e-12);
        let nurbs = concat.to_nurbs().unwrap();
        assert_eq!(nurbs.domain(), (0.0, 3.0));
        assert!((nurbs.point_at(2.0) - dvec3(1.0, 1.0, 0.0)).length() < 1e-12);
    }
}
