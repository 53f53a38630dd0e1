//! Rounding the corners of polylines and of curves with fracture points.

use std::f64::consts::PI;

use pgk_core::{KernelError, Result};
use pgk_math::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::blend::{blend_curves, BlendContinuity};
use crate::curve::{concatenate_nurbs_curves, Circle, Curve, NurbsCurve};
use crate::nurbs::KNOT_TOLERANCE;

const JOIN_TOLERANCE: f64 = 1e-6;

/// What replaces a polyline corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilletShape {
    /// Circular arc tangent to both edges.
    #[default]
    Arc,
    /// Quadratic Bezier with the corner as middle control point.
    Bezier,
    /// Straight cut between the two tangent points.
    Bevel,
}

/// A fillet arc inscribed in one corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerFillet {
    /// Tangent point on the incoming edge.
    pub start: Point3,
    /// Tangent point on the outgoing edge.
    pub end: Point3,
    pub center: Point3,
    pub radius: f64,
    /// Turning angle of the arc, `PI` minus the corner angle.
    pub sweep: f64,
}

impl CornerFillet {
    /// Distance from the corner to either tangent point.
    pub fn setback(&self, corner: Point3) -> f64 {
        (self.start - corner).length()
    }
}

/// Fillet of `radius` in the corner `corner` between the edges to `prev` and
/// `next`. `None` when the edges are collinear, fold back, or the radius is
/// not positive.
pub fn calc_fillet(prev: Point3, corner: Point3, next: Point3, radius: f64) -> Option<CornerFillet> {
    if radius <= 0.0 {
        return None;
    }
    let a = (prev - corner).try_normalize()?;
    let b = (next - corner).try_normalize()?;
    let angle = a.angle_between(b);
    if angle < 1e-6 || angle > PI - 1e-6 {
        return None;
    }
    let half = 0.5 * angle;
    let setback = radius / half.tan();
    let bisector = (a + b).try_normalize()?;
    Some(CornerFillet {
        start: corner + setback * a,
        end: corner + setback * b,
        center: corner + (radius / half.sin()) * bisector,
        radius,
        sweep: PI - angle,
    })
}

fn corner_indices(n: usize, cyclic: bool) -> std::ops::Range<usize> {
    if cyclic {
        0..n
    } else {
        1..n.saturating_sub(1)
    }
}

fn corner_angle(vertices: &[Point3], i: usize) -> Option<f64> {
    let n = vertices.len();
    let a = (vertices[(i + n - 1) % n] - vertices[i]).try_normalize()?;
    let b = (vertices[(i + 1) % n] - vertices[i]).try_normalize()?;
    Some(a.angle_between(b))
}

/// Shrink radii so neighbouring fillets never overlap.
///
/// An edge between two rounded corners gives each of them half of its
/// length; an edge ending at an open end is available in full. A radius too
/// large for its corner becomes 0.999 of the largest that fits.
pub fn limit_fillet_radii(vertices: &[Point3], radii: &[f64], cyclic: bool) -> Vec<f64> {
    let n = vertices.len();
    let mut limited = radii.to_vec();
    let rounded = |j: usize| (cyclic || (j > 0 && j + 1 < n)) && radii[j] > 0.0;
    for i in corner_indices(n, cyclic) {
        if radii[i] <= 0.0 {
            continue;
        }
        let Some(angle) = corner_angle(vertices, i) else {
            continue;
        };
        let available = [(i + n - 1) % n, (i + 1) % n]
            .into_iter()
            .map(|j| {
                let edge = (vertices[j] - vertices[i]).length();
                if rounded(j) {
                    0.5 * edge
                } else {
                    edge
                }
            })
            .fold(f64::INFINITY, f64::min);
        let max_radius = (0.5 * angle).tan() * available;
        if radii[i] > max_radius {
            log::debug!("fillet radius at vertex {i} limited from {} to {max_radius}", radii[i]);
            limited[i] = 0.999 * max_radius;
        }
    }
    limited
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolylineFilletOptions {
    /// Treat the last vertex as connected to the first.
    pub cyclic: bool,
    /// Shrink radii that do not fit instead of failing.
    pub clamp: bool,
    pub shape: FilletShape,
}

impl Default for PolylineFilletOptions {
    fn default() -> Self {
        Self {
            cyclic: false,
            clamp: true,
            shape: FilletShape::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilletedPolyline {
    /// The rounded polyline, parametrized by length on its straight parts.
    pub curve: NurbsCurve,
    /// Fillet at each vertex, `None` where the vertex is kept sharp.
    pub corners: Vec<Option<CornerFillet>>,
    /// Radii actually used.
    pub radii: Vec<f64>,
}

fn segment(start: Point3, end: Point3) -> Result<NurbsCurve> {
    let length = (end - start).length();
    NurbsCurve::bspline(1, vec![0.0, 0.0, length, length], vec![start, end])
}

fn corner_piece(fillet: &CornerFillet, corner: Point3, shape: FilletShape) -> Result<NurbsCurve> {
    match shape {
        FilletShape::Arc => Circle::by_start_end_tangent(fillet.start, fillet.end, corner - fillet.start)?
            .to_nurbs()?
            .reparametrize(0.0, fillet.radius * fillet.sweep),
        FilletShape::Bezier => NurbsCurve::bspline(
            2,
            vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            vec![fillet.start, corner, fillet.end],
        )?
        .reparametrize(0.0, (fillet.end - fillet.start).length()),
        FilletShape::Bevel => segment(fillet.start, fillet.end),
    }
}

/// Round the corners of a polyline.
///
/// `radii` holds one radius per vertex, or a single radius for all of them.
/// Open ends of a non-cyclic polyline are never rounded.
pub fn fillet_polyline(
    vertices: &[Point3],
    radii: &[f64],
    options: &PolylineFilletOptions,
) -> Result<FilletedPolyline> {
    let n = vertices.len();
    if n < 2 || (options.cyclic && n < 3) {
        return Err(KernelError::InvalidInput(format!(
            "not enough vertices for a {} polyline: {n}",
            if options.cyclic { "cyclic" } else { "open" }
        )));
    }
    let radii = match radii.len() {
        1 => vec![radii[0]; n],
        len if len == n => radii.to_vec(),
        len => {
            return Err(KernelError::InvalidInput(format!(
                "expected 1 or {n} radii, got {len}"
            )))
        }
    };
    let radii = if options.clamp {
        limit_fillet_radii(vertices, &radii, options.cyclic)
    } else {
        radii
    };

    let mut corners = vec![None; n];
    for i in corner_indices(n, options.cyclic) {
        corners[i] = calc_fillet(vertices[(i + n - 1) % n], vertices[i], vertices[(i + 1) % n], radii[i]);
    }
    let edges = if options.cyclic { n } else { n - 1 };
    for i in 0..edges {
        let j = (i + 1) % n;
        let used = corners[i].map_or(0.0, |c| c.setback(vertices[i]))
            + corners[j].map_or(0.0, |c| c.setback(vertices[j]));
        let edge = (vertices[j] - vertices[i]).length();
        if used > edge + JOIN_TOLERANCE {
            return Err(KernelError::Geometry(format!(
                "fillets at vertices {i} and {j} overlap: {used} on an edge of {edge}"
            )));
        }
    }

    let leaving = |i: usize| corners[i].map_or(vertices[i], |c| c.end);
    let entering = |i: usize| corners[i].map_or(vertices[i], |c| c.start);
    let mut pieces = Vec::with_capacity(2 * n);
    let mut current = leaving(0);
    let stops: Vec<usize> = if options.cyclic {
        (1..=n).map(|k| k % n).collect()
    } else {
        (1..n).collect()
    };
    for i in stops {
        let target = entering(i);
        if (target - current).length() > JOIN_TOLERANCE {
            pieces.push(segment(current, target)?);
        }
        if let Some(fillet) = &corners[i] {
            pieces.push(corner_piece(fillet, vertices[i], options.shape)?);
        }
        current = leaving(i);
    }
    if pieces.is_empty() {
        return Err(KernelError::Geometry("polyline has zero length".into()));
    }
    let curve = concatenate_nurbs_curves(&pieces, true, JOIN_TOLERANCE, false)?;
    log::debug!(
        "filleted {} of {n} vertices with {:?}",
        corners.iter().filter(|c| c.is_some()).count(),
        options.shape
    );
    Ok(FilletedPolyline { curve, corners, radii })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveFilletOptions {
    pub continuity: BlendContinuity,
    /// Share of each piece's parameter span cut away next to a corner.
    pub cut_offset: f64,
    /// Scales the end derivatives the blend is built from.
    pub bulge: f64,
    /// Angle in radians below which a tangent break is not a corner.
    pub tangent_tolerance: f64,
}

impl Default for CurveFilletOptions {
    fn default() -> Self {
        Self {
            continuity: BlendContinuity::C1,
            cut_offset: 0.1,
            bulge: 1.0,
            tangent_tolerance: 1e-6,
        }
    }
}

fn is_corner(first: &NurbsCurve, second: &NurbsCurve, tolerance: f64) -> bool {
    let a = first.tangent_at(first.domain().1).normalize_or_zero();
    let b = second.tangent_at(second.domain().0).normalize_or_zero();
    a != Vector3::ZERO && b != Vector3::ZERO && a.angle_between(b) > tolerance
}

/// Replace every fracture point of `curve` by a blend.
///
/// Fracture points are interior knots of full multiplicity where the
/// tangent direction jumps. Around each, `cut_offset` of both adjacent
/// pieces' spans is removed and the gap is closed by [`blend_curves`]. A
/// closed curve is also rounded where its ends meet.
pub fn fillet_nurbs_curve(curve: &NurbsCurve, options: &CurveFilletOptions) -> Result<NurbsCurve> {
    if !(options.cut_offset > 0.0 && options.cut_offset < 0.5) {
        return Err(KernelError::InvalidInput(format!(
            "cut offset must lie in (0, 0.5), got {}",
            options.cut_offset
        )));
    }
    let degree = curve.degree();
    let fractures: Vec<f64> = curve
        .knots()
        .interior(degree)
        .into_iter()
        .filter(|&(_, m)| m >= degree)
        .map(|(t, _)| t)
        .collect();
    let pieces = curve.split_curve(&fractures)?;
    let count = pieces.len();
    let closed = curve.is_closed();

    // corners[i] is the junction after piece i.
    let corners: Vec<bool> = (0..count)
        .map(|i| {
            if i + 1 < count {
                is_corner(&pieces[i], &pieces[i + 1], options.tangent_tolerance)
            } else {
                closed && is_corner(&pieces[i], &pieces[0], options.tangent_tolerance)
            }
        })
        .collect();
    if !corners.contains(&true) {
        return Ok(curve.clone());
    }

    let cut = |piece: &NurbsCurve| {
        let (a, b) = piece.domain();
        options.cut_offset * (b - a)
    };
    let trimmed = pieces
        .iter()
        .enumerate()
        .map(|(i, piece)| {
            let (a, b) = piece.domain();
            let before = corners[(i + count - 1) % count];
            let start = if before { a + cut(piece) } else { a };
            let end = if corners[i] { b - cut(piece) } else { b };
            if start - a < KNOT_TOLERANCE && b - end < KNOT_TOLERANCE {
                Ok(piece.clone())
            } else {
                piece.cut_segment(start, end, false)
            }
        })
        .collect::<Result<Vec<_>>>()?;

    let mut result = Vec::with_capacity(2 * count);
    for i in 0..count {
        result.push(trimmed[i].clone());
        if !corners[i] {
            continue;
        }
        let j = (i + 1) % count;
        let span = cut(&pieces[i]) + cut(&pieces[j]);
        let factor = options.bulge * span;
        let blend = blend_curves(&trimmed[i], &trimmed[j], options.continuity, factor, factor)?;
        result.push(blend.to_nurbs()?.reparametrize(0.0, span)?);
    }
    log::debug!(
        "rounded {} fracture points with {:?}",
        corners.iter().filter(|&&c| c).count(),
        options.continuity
    );
    concatenate_nurbs_curves(&result, true, JOIN_TOLERANCE, false)
}
