//! Rational evaluation of B-spline curves and surfaces.
//!
//! Control points are handled in homogeneous form `(w*x, w*y, w*z, w)`;
//! Cartesian values are recovered by the rational quotient rule.

use pgk_math::{DVec3, DVec4, Point3, Vector3};

use super::knot::{basis_function_derivs, basis_functions, find_span};

/// Weighted control points in homogeneous form.
pub fn to_homogeneous(points: &[Point3], weights: &[f64]) -> Vec<DVec4> {
    points
        .iter()
        .zip(weights)
        .map(|(p, &w)| (*p * w).extend(w))
        .collect()
}

/// Split homogeneous points back into Cartesian points and weights.
pub fn from_homogeneous(hpoints: &[DVec4]) -> (Vec<Point3>, Vec<f64>) {
    hpoints.iter().map(|h| (h.truncate() / h.w, h.w)).unzip()
}

pub fn binomial(n: usize, k: usize) -> f64 {
    let k = k.min(n - k);
    let mut result = 1.0;
    for i in 0..k {
        result = result * (n - i) as f64 / (i + 1) as f64;
    }
    result
}

/// Evaluate a NURBS curve point at parameter `t`.
pub fn curve_point(degree: usize, knots: &[f64], hpoints: &[DVec4], t: f64) -> Point3 {
    curve_point_with(degree, knots, hpoints.len(), t, |i| hpoints[i])
}

/// [`curve_point`] reading homogeneous control point `i` from `hpoint`, so
/// only the `degree + 1` points of the span are ever formed.
#[allow(clippy::needless_range_loop)]
pub fn curve_point_with(degree: usize, knots: &[f64], n_points: usize, t: f64, hpoint: impl Fn(usize) -> DVec4) -> Point3 {
    let span = find_span(degree, knots, n_points - 1, t);
    let basis = basis_functions(degree, knots, span, t);

    let mut h = DVec4::ZERO;
    for i in 0..=degree {
        h += basis[i] * hpoint(span - degree + i);
    }
    h.truncate() / h.w
}

/// Homogeneous derivatives `A^(k)(t)` for `k = 0..=n_derivs`.
pub fn homogeneous_derivatives(
    degree: usize,
    knots: &[f64],
    hpoints: &[DVec4],
    t: f64,
    n_derivs: usize,
) -> Vec<DVec4> {
    homogeneous_derivatives_with(degree, knots, hpoints.len(), t, n_derivs, |i| hpoints[i])
}

#[allow(clippy::needless_range_loop)]
pub fn homogeneous_derivatives_with(
    degree: usize,
    knots: &[f64],
    n_points: usize,
    t: f64,
    n_derivs: usize,
    hpoint: impl Fn(usize) -> DVec4,
) -> Vec<DVec4> {
    let span = find_span(degree, knots, n_points - 1, t);
    let ders = basis_function_derivs(degree, knots, span, t, n_derivs);

    let mut result = vec![DVec4::ZERO; n_derivs + 1];
    for j in 0..=degree {
        let h = hpoint(span - degree + j);
        for k in 0..=n_derivs.min(degree) {
            result[k] += ders[k][j] * h;
        }
    }
    result
}

/// Rational quotient rule: Cartesian derivatives from homogeneous ones.
pub fn rational_derivatives(aders: &[DVec4]) -> Vec<Vector3> {
    let mut ck: Vec<Vector3> = Vec::with_capacity(aders.len());
    let w0 = aders[0].w;
    for k in 0..aders.len() {
        let mut v = aders[k].truncate();
        for i in 1..=k {
            v -= binomial(k, i) * aders[i].w * ck[k - i];
        }
        ck.push(v / w0);
    }
    ck
}

/// Point (index 0) and derivatives up to `n_derivs` of a NURBS curve.
pub fn curve_derivatives(
    degree: usize,
    knots: &[f64],
    hpoints: &[DVec4],
    t: f64,
    n_derivs: usize,
) -> Vec<Vector3> {
    rational_derivatives(&homogeneous_derivatives(degree, knots, hpoints, t, n_derivs))
}

/// Evaluate a NURBS surface point. `net[i][j]` is indexed by `(u, v)`.
#[allow(clippy::needless_range_loop)]
pub fn surface_point(
    degree_u: usize,
    degree_v: usize,
    knots_u: &[f64],
    knots_v: &[f64],
    net: &[Vec<DVec4>],
    u: f64,
    v: f64,
) -> Point3 {
    let nu = net.len() - 1;
    let nv = net[0].len() - 1;
    let span_u = find_span(degree_u, knots_u, nu, u);
    let span_v = find_span(degree_v, knots_v, nv, v);
    let bu = basis_functions(degree_u, knots_u, span_u, u);
    let bv = basis_functions(degree_v, knots_v, span_v, v);

    let mut h = DVec4::ZERO;
    for i in 0..=degree_u {
        let row = &net[span_u - degree_u + i];
        let mut temp = DVec4::ZERO;
        for j in 0..=degree_v {
            temp += bv[j] * row[span_v - degree_v + j];
        }
        h += bu[i] * temp;
    }
    h.truncate() / h.w
}

/// Cartesian partial derivatives `S_{k,l}` for `k + l <= n_derivs`.
///
/// `result[k][l]` is the derivative taken `k` times in `u` and `l` times in
/// `v`; `result[0][0]` is the surface point.
#[allow(clippy::needless_range_loop, clippy::too_many_arguments)]
pub fn surface_derivatives(
    degree_u: usize,
    degree_v: usize,
    knots_u: &[f64],
    knots_v: &[f64],
    net: &[Vec<DVec4>],
    u: f64,
    v: f64,
    n_derivs: usize,
) -> Vec<Vec<Vector3>> {
    let nu = net.len() - 1;
    let nv = net[0].len() - 1;
    let span_u = find_span(degree_u, knots_u, nu, u);
    let span_v = find_span(degree_v, knots_v, nv, v);
    let du = n_derivs.min(degree_u);
    let dv = n_derivs.min(degree_v);
    let nder_u = basis_function_derivs(degree_u, knots_u, span_u, u, du);
    let nder_v = basis_function_derivs(degree_v, knots_v, span_v, v, dv);

    let mut aders = vec![vec![DVec4::ZERO; n_derivs + 1]; n_derivs + 1];
    for k in 0..=du {
        let mut temp = vec![DVec4::ZERO; degree_v + 1];
        for s in 0..=degree_v {
            for r in 0..=degree_u {
                temp[s] += nder_u[k][r] * net[span_u - degree_u + r][span_v - degree_v + s];
            }
        }
        let dd = (n_derivs - k).min(dv);
        for l in 0..=dd {
            for s in 0..=degree_v {
                aders[k][l] += nder_v[l][s] * temp[s];
            }
        }
    }

    let mut skl = vec![vec![DVec3::ZERO; n_derivs + 1]; n_derivs + 1];
    let w00 = aders[0][0].w;
    for k in 0..=n_derivs {
        for l in 0..=(n_derivs - k) {
            let mut v = aders[k][l].truncate();
            for j in 1..=l {
                v -= binomial(l, j) * aders[0][j].w * skl[k][l - j];
            }
            for i in 1..=k {
                v -= binomial(k, i) * aders[i][0].w * skl[k - i][l];
                let mut v2 = DVec3::ZERO;
                for j in 1..=l {
                    v2 += binomial(l, j) * aders[i][j].w * skl[k - i][l - j];
                }
                v -= binomial(k, i) * v2;
            }
            skl[k][l] = v / w00;
        }
    }
    skl
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgk_math::dvec3;

    fn quarter_circle() -> (Vec<f64>, Vec<DVec4>) {
        let w = std::f64::consts::FRAC_1_SQRT_2;
        let points = [dvec3(1.0, 0.0, 0.0), dvec3(1.0, 1.0, 0.0), dvec3(0.0, 1.0, 0.0)];
        let weights = [1.0, w, 1.0];
        (vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0], to_homogeneous(&points, &weights))
    }

    #[test]
    fn test_rational_quarter_circle() {
        let (knots, hp) = quarter_circle();
        for i in 0..=10 {
            let t = i as f64 / 10.0;
            let p = curve_point(2, &knots, &hp, t);
            assert!((p.length() - 1.0).abs() < 1e-12, "point at {t} off circle: {p}");
        }
    }

    #[test]
    fn test_rational_derivatives_are_tangent() {
        let (knots, hp) = quarter_circle();
        for i in 0..=10 {
            let t = i as f64 / 10.0;
            let d = curve_derivatives(2, &knots, &hp, t, 2);
            assert!(d[0].dot(d[1]).abs() < 1e-10, "tangent not orthogonal to radius at {t}");
            let h = 1e-6;
            let lo = curve_point(2, &knots, &hp, (t - h).max(0.0));
            let hi = curve_point(2, &knots, &hp, (t + h).min(1.0));
            let fd = (hi - lo) / ((t + h).min(1.0) - (t - h).max(0.0));
            assert!((fd - d[1]).length() < 1e-5);
        }
    }

    #[test]
    fn test_homogeneous_round_trip() {
        let points = vec![dvec3(1.0, 2.0, 3.0), dvec3(-1.0, 0.5, 0.0)];
        let weights = vec![2.0, 0.5];
        let (p, w) = from_homogeneous(&to_homogeneous(&points, &weights));
        assert!((p[0] - points[0]).length() < 1e-15);
        assert_eq!(w, weights);
    }

    #[test]
    fn test_bilinear_surface_derivatives() {
        let net = vec![
            to_homogeneous(&[dvec3(0.0, 0.0, 0.0), dvec3(0.0, 1.0, 0.0)], &[1.0, 1.0]),
            to_homogeneous(&[dvec3(1.0, 0.0, 0.0), dvec3(1.0, 1.0, 1.0)], &[1.0, 1.0]),
        ];
        let knots = [0.0, 0.0, 1.0, 1.0];
        let p = surface_point(1, 1, &knots, &knots, &net, 0.5, 0.5);
        assert!((p - dvec3(0.5, 0.5, 0.25)).length() < 1e-12);
        let skl = surface_derivatives(1, 1, &knots, &knots, &net, 0.5, 0.5, 2);
        assert!((skl[0][0] - p).length() < 1e-12);
        assert!((skl[1][0] - dvec3(1.0, 0.0, 0.5)).length() < 1e-12);
        assert!((skl[0][1] - dvec3(0.0, 1.0, 0.5)).length() < 1e-12);
        assert!((skl[1][1] - dvec3(0.0, 0.0, 1.0)).length() < 1e-12);
    }

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(5, 2), 10.0);
        assert_eq!(binomial(7, 0), 1.0);
        assert_eq!(binomial(6, 6), 1.0);
    }
}
