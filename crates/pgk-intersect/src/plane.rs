//! Curve-plane intersection.

use pgk_core::{KernelError, Result, SolverOptions, Tolerance};
use pgk_geometry::{Curve, NurbsCurve};
use pgk_math::{linspace, Aabb3, Plane, Point3};
use serde::{Deserialize, Serialize};

use crate::root::{ridder, sign_changes};

/// How roots inside a bracketing interval are refined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaneIntersectionMethod {
    /// Ridder's method on the signed distance.
    #[default]
    Ridder,
    /// Recursive splitting of the NURBS form using the sign of its control
    /// points.
    Subdivision,
}

/// Options for [`intersect_curve_plane`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneIntersectionOptions {
    /// Uniform samples used to bracket sign changes. Two roots closer than
    /// the sample spacing can be missed.
    pub init_samples: usize,
    /// Roots are refined to `10^-accuracy`.
    pub accuracy: i32,
    pub method: PlaneIntersectionMethod,
    pub max_iterations: usize,
}

impl Default for PlaneIntersectionOptions {
    fn default() -> Self {
        Self {
            init_samples: 10,
            accuracy: 6,
            method: PlaneIntersectionMethod::Ridder,
            max_iterations: 50,
        }
    }
}

impl PlaneIntersectionOptions {
    fn solver(&self) -> SolverOptions {
        SolverOptions::new(self.max_iterations, Tolerance::from_accuracy(self.accuracy).linear)
    }
}

/// Parameters and points where `curve` crosses `plane`, in increasing `t`.
///
/// Samples lying exactly on the plane are roots as well. With
/// [`PlaneIntersectionMethod::Subdivision`] the curve is converted with
/// [`Curve::to_nurbs`] first and parameters refer to that form, which for
/// rational arcs differs from the analytic parameterization.
pub fn intersect_curve_plane(
    curve: &dyn Curve,
    plane: &Plane,
    options: &PlaneIntersectionOptions,
) -> Result<Vec<(f64, Point3)>> {
    if options.init_samples < 2 {
        return Err(KernelError::InvalidInput(format!(
            "at least 2 initial samples are required, got {}",
            options.init_samples
        )));
    }
    let nurbs = match options.method {
        PlaneIntersectionMethod::Ridder => None,
        PlaneIntersectionMethod::Subdivision => Some(curve.to_nurbs()?),
    };
    let sampled: &dyn Curve = match &nurbs {
        Some(nurbs) => nurbs,
        None => curve,
    };
    let (t_min, t_max) = sampled.domain();
    let ts = linspace(t_min, t_max, options.init_samples);
    let points = sampled.points_at(&ts);
    let distances: Vec<f64> = points.iter().map(|&p| plane.signed_distance(p)).collect();
    let (zeros, brackets) = sign_changes(&distances);
    log::debug!(
        "curve/plane: {} samples, {} exact hits, {} brackets",
        ts.len(),
        zeros.len(),
        brackets.len()
    );

    let mut roots: Vec<(f64, Point3)> = zeros.into_iter().map(|i| (ts[i], points[i])).collect();
    match &nurbs {
        None => {
            let solver = options.solver();
            for (i, j) in brackets {
                let t = ridder(|t| plane.signed_distance(curve.point_at(t)), ts[i], ts[j], &solver)?;
                roots.push((t, curve.point_at(t)));
            }
        }
        Some(nurbs) => {
            let tolerance = options.solver().tolerance;
            for (i, j) in brackets {
                let segment = nurbs.cut_segment(ts[i], ts[j], false)?;
                subdivide(&segment, plane, tolerance, 0, options.max_iterations, &mut roots)?;
            }
        }
    }
    roots.sort_by(|a, b| a.0.total_cmp(&b.0));
    // A split point on the plane is found from both halves.
    let tolerance = options.solver().tolerance;
    roots.dedup_by(|next, kept| (next.0 - kept.0).abs() <= tolerance);
    Ok(roots)
}

fn subdivide(
    segment: &NurbsCurve,
    plane: &Plane,
    tolerance: f64,
    depth: usize,
    max_depth: usize,
    roots: &mut Vec<(f64, Point3)>,
) -> Result<()> {
    let control = segment.control_points();
    let sides: Vec<f64> = control.iter().map(|&p| plane.signed_distance(p)).collect();
    if sides.iter().all(|&d| d > 0.0) || sides.iter().all(|&d| d < 0.0) {
        return Ok(());
    }
    let (a, b) = segment.domain();
    let bbox = Aabb3::from_points(control.iter().copied()).unwrap_or(Aabb3::point(control[0]));
    if bbox.size() < tolerance {
        let t = 0.5 * (a + b);
        roots.push((t, segment.point_at(t)));
        return Ok(());
    }
    let (p0, p1) = (control[0], control[control.len() - 1]);
    if is_straight(control, tolerance) {
        let (d0, d1) = (sides[0], sides[sides.len() - 1]);
        if d0 * d1 <= 0.0 && d0 != d1 {
            let s = d0 / (d0 - d1);
            let t = a + s * (b - a);
            roots.push((t, p0 + s * (p1 - p0)));
        }
        return Ok(());
    }
    if depth >= max_depth {
        return Err(KernelError::SolverDiverged {
            message: format!("curve/plane subdivision on [{a}, {b}]"),
            iterations: depth,
            residual: bbox.size(),
        });
    }
    let (left, right) = segment.split_at(0.5 * (a + b))?;
    subdivide(&left, plane, tolerance, depth + 1, max_depth, roots)?;
    subdivide(&right, plane, tolerance, depth + 1, max_depth, roots)
}

/// Whether every control point lies within `tolerance` of the chord.
fn is_straight(control: &[Point3], tolerance: f64) -> bool {
    let (p0, p1) = (control[0], control[control.len() - 1]);
    let chord = p1 - p0;
    let length = chord.length();
    if length < tolerance {
        return false;
    }
    let direction = chord / length;
    control.iter().all(|&p| {
        let v = p - p0;
        let along = v.dot(direction);
        (0.0..=length).contains(&along) && (v - along * direction).length() <= tolerance
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use pgk_geometry::curve::{Circle, Line};
    use pgk_math::{dvec3, DVec3};

    #[test]
    fn test_diagonal_line_crosses_xy_plane_once() {
        let line = Line::new(dvec3(-1.0, -1.0, -1.0), dvec3(1.0, 1.0, 1.0));
        for method in [PlaneIntersectionMethod::Ridder, PlaneIntersectionMethod::Subdivision] {
            let options = PlaneIntersectionOptions { method, ..Default::default() };
            let roots = intersect_curve_plane(&line, &Plane::xy(), &options).unwrap();
            assert_eq!(roots.len(), 1, "{method:?}");
            assert_abs_diff_eq!(roots[0].0, 0.5, epsilon = 1e-9);
            assert!(roots[0].1.length() < 1e-9);
        }
    }

    #[test]
    fn test_sample_on_plane_counts_once() {
        let line = Line::new(dvec3(-1.0, -1.0, -1.0), dvec3(1.0, 1.0, 1.0));
        let options = PlaneIntersectionOptions { init_samples: 11, ..Default::default() };
        let roots = intersect_curve_plane(&line, &Plane::xy(), &options).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].1, DVec3::ZERO);
    }

    #[test]
    fn test_root_at_split_point_counts_once() {
        // x(t) is symmetric about t = 0.5, where the first split lands.
        let curve = NurbsCurve::bspline(
            3,
            vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
            vec![dvec3(-1.0, 0.0, 0.0), dvec3(-1.0, 1.0, 0.0), dvec3(1.0, 1.0, 0.0), dvec3(1.0, 0.0, 0.0)],
        )
        .unwrap();
        let plane = Plane::new(DVec3::ZERO, DVec3::X);
        let options = PlaneIntersectionOptions {
            init_samples: 2,
            method: PlaneIntersectionMethod::Subdivision,
            ..Default::default()
        };
        let roots = intersect_curve_plane(&curve, &plane, &options).unwrap();
        assert_eq!(roots.len(), 1, "{roots:?}");
        assert!((roots[0].0 - 0.5).abs() < 1e-6);
        assert!(roots[0].1.x.abs() < 1e-6);
    }

    #[test]
    fn test_circle_crosses_plane_twice() {
        let circle = Circle::new(DVec3::ZERO, DVec3::Z, 2.0);
        let plane = Plane::new(dvec3(1.0, 0.0, 0.0), DVec3::X);
        for method in [PlaneIntersectionMethod::Ridder, PlaneIntersectionMethod::Subdivision] {
            let options = PlaneIntersectionOptions { init_samples: 20, method, ..Default::default() };
            let roots = intersect_curve_plane(&circle, &plane, &options).unwrap();
            assert_eq!(roots.len(), 2, "{method:?}");
            for (_, p) in &roots {
                assert_abs_diff_eq!(p.x, 1.0, epsilon = 1e-5);
                assert_abs_diff_eq!(p.length(), 2.0, epsilon = 1e-5);
            }
            assert!(roots[0].0 < roots[1].0);
        }
    }

    #[test]
    fn test_undersampling_misses_close_roots() {
        // Both crossings lie between the samples at 2pi/3 and 4pi/3.
        let mut circle = Circle::new(DVec3::ZERO, DVec3::Z, 1.0);
        circle.x_axis = DVec3::X;
        let plane = Plane::new(dvec3(-0.999, 0.0, 0.0), DVec3::X);
        let options = PlaneIntersectionOptions { init_samples: 4, ..Default::default() };
        let roots = intersect_curve_plane(&circle, &plane, &options).unwrap();
        assert!(roots.is_empty());
    }

    #[test]
    fn test_too_few_samples() {
        let line = Line::new(DVec3::ZERO, DVec3::X);
        let options = PlaneIntersectionOptions { init_samples: 1, ..Default::default() };
        assert!(intersect_curve_plane(&line, &Plane::xy(), &options).is_err());
    }
}
