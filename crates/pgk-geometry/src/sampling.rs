//! Sampling of curves and surfaces into discrete points.

use pgk_math::{linspace, Point3};

use crate::curve::Curve;
use crate::surface::Surface;

/// Maximum recursion depth for adaptive subdivision.
const MAX_DEPTH: u32 = 12;

/// Parameters of an adaptive polyline through the curve.
///
/// Segments are halved while the midpoint deviates from the chord by more
/// than `tolerance`. The domain is first cut into `min_segments` pieces so
/// that symmetric curves are not mistaken for straight ones.
pub fn adaptive_parameters(curve: &dyn Curve, tolerance: f64, min_segments: usize) -> Vec<f64> {
    let (t_min, t_max) = curve.domain();
    let breaks = linspace(t_min, t_max, min_segments.max(1) + 1);
    let mut ts = vec![t_min];
    for w in breaks.windows(2) {
        subdivide(curve, w[0], w[1], tolerance, &mut ts, 0);
    }
    ts
}

/// Convert a curve to a polyline using adaptive subdivision.
pub fn curve_to_polyline(curve: &dyn Curve, tolerance: f64) -> Vec<Point3> {
    curve.points_at(&adaptive_parameters(curve, tolerance, 4))
}

fn subdivide(curve: &dyn Curve, t0: f64, t1: f64, tolerance: f64, ts: &mut Vec<f64>, depth: u32) {
    if depth >= MAX_DEPTH {
        ts.push(t1);
        return;
    }
    let t_mid = (t0 + t1) * 0.5;
    let chord_mid = (curve.point_at(t0) + curve.point_at(t1)) * 0.5;
    if (curve.point_at(t_mid) - chord_mid).length() > tolerance {
        subdivide(curve, t0, t_mid, tolerance, ts, depth + 1);
        subdivide(curve, t_mid, t1, tolerance, ts, depth + 1);
    } else {
        ts.push(t1);
    }
}

/// One sample of a surface grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSample {
    pub u: f64,
    pub v: f64,
    pub point: Point3,
}

/// `u_count x v_count` samples spread evenly over the surface domain, in
/// row-major order (`u` outer).
pub fn surface_grid(surface: &dyn Surface, u_count: usize, v_count: usize) -> Vec<GridSample> {
    let (u_min, u_max) = surface.domain_u();
    let (v_min, v_max) = surface.domain_v();
    let us = linspace(u_min, u_max, u_count.max(2));
    let vs = linspace(v_min, v_max, v_count.max(2));
    let uvs: Vec<(f64, f64)> = us.iter().flat_map(|&u| vs.iter().map(move |&v| (u, v))).collect();
    surface
        .points_at(&uvs)
        .into_iter()
        .zip(uvs)
        .map(|(point, (u, v))| GridSample { u, v, point })
        .collect()
}
