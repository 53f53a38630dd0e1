//! Curve-surface intersection and ray casting onto parametric surfaces.

use nalgebra::{Matrix3, Vector3 as NVector3};
use pgk_core::{KernelError, OnFailure, Result, SolverOptions};
use pgk_geometry::sampling::{surface_grid, GridSample};
use pgk_geometry::{Curve, Surface};
use pgk_math::{linspace, Aabb3, Point3, Ray, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::solver::{solve_system, Bounds, NonlinearMethod};

/// Options for [`intersect_curve_surface`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceIntersectionOptions {
    /// Number of curve samples; one search runs per interval between them.
    pub init_samples: usize,
    /// The surface is seeded on a `raycast_samples x raycast_samples` grid.
    pub raycast_samples: usize,
    /// Largest accepted `|C(t) - S(u, v)|`.
    pub tolerance: f64,
    pub max_iterations: usize,
    pub method: NonlinearMethod,
}

impl Default for SurfaceIntersectionOptions {
    fn default() -> Self {
        Self {
            init_samples: 10,
            raycast_samples: 10,
            tolerance: 1e-6,
            max_iterations: 50,
            method: NonlinearMethod::Newton,
        }
    }
}

/// A point shared by a curve and a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveSurfaceHit {
    pub t: f64,
    pub u: f64,
    pub v: f64,
    pub point: Point3,
}

fn to_na(v: Vector3) -> NVector3<f64> {
    NVector3::new(v.x, v.y, v.z)
}

fn from_na(v: &NVector3<f64>) -> Vector3 {
    Vector3::new(v[0], v[1], v[2])
}

fn nearest_sample(grid: &[GridSample], point: Point3) -> Option<&GridSample> {
    grid.iter()
        .min_by(|a, b| (a.point - point).length_squared().total_cmp(&(b.point - point).length_squared()))
}

/// Points where `curve` meets `surface`, in increasing `t`.
///
/// The curve domain is cut into `init_samples - 1` intervals. In each, the
/// system `C(t) - S(u, v) = 0` is solved from the interval midpoint and the
/// nearest surface grid sample. Intervals whose search does not converge,
/// or converges outside the interval or the surface domain, contribute
/// nothing. At most one root is found per interval.
pub fn intersect_curve_surface(
    curve: &dyn Curve,
    surface: &dyn Surface,
    options: &SurfaceIntersectionOptions,
) -> Result<Vec<CurveSurfaceHit>> {
    if options.init_samples < 2 || options.raycast_samples < 2 {
        return Err(KernelError::InvalidInput(format!(
            "need at least 2 curve and surface samples, got {} and {}",
            options.init_samples, options.raycast_samples
        )));
    }
    let grid = surface_grid(surface, options.raycast_samples, options.raycast_samples);
    let (t_min, t_max) = curve.domain();
    let (u_min, u_max) = surface.domain_u();
    let (v_min, v_max) = surface.domain_v();
    let ts = linspace(t_min, t_max, options.init_samples);
    let solver = SolverOptions::new(options.max_iterations, options.tolerance);
    let eps = 1e-9 * (1.0 + (t_max - t_min).abs());

    let mut hits: Vec<CurveSurfaceHit> = Vec::new();
    for w in ts.windows(2) {
        let (t0, t1) = (w[0], w[1]);
        let mid = 0.5 * (t0 + t1);
        let Some(seed) = nearest_sample(&grid, curve.point_at(mid)) else {
            continue;
        };
        let bounds = Bounds::new(
            NVector3::new(t_min, u_min, v_min),
            NVector3::new(t_max, u_max, v_max),
        );
        let solution = solve_system(
            |x| to_na(curve.point_at(x[0]) - surface.point_at(x[1], x[2])),
            |x| {
                let dc = curve.tangent_at(x[0]);
                let (su, sv) = surface.partial_derivatives_at(x[1], x[2]);
                Matrix3::from_columns(&[to_na(dc), to_na(-su), to_na(-sv)])
            },
            NVector3::new(mid, seed.u, seed.v),
            options.method,
            Some(&bounds),
            &solver,
        );
        match solution {
            Ok(solution) => {
                let t = solution.x[0];
                if t < t0 - eps || t > t1 + eps {
                    log::trace!("curve/surface root {t} lies outside [{t0}, {t1}]");
                    continue;
                }
                if hits.iter().any(|h| (h.t - t).abs() <= eps.max(options.tolerance)) {
                    continue;
                }
                hits.push(CurveSurfaceHit {
                    t,
                    u: solution.x[1],
                    v: solution.x[2],
                    point: curve.point_at(t),
                });
            }
            Err(err) => log::trace!("no curve/surface root on [{t0}, {t1}]: {err}"),
        }
    }
    log::debug!("curve/surface: {} intersections over {} intervals", hits.len(), ts.len() - 1);
    hits.sort_by(|a, b| a.t.total_cmp(&b.t));
    Ok(hits)
}

/// Options for [`raycast_surface`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceRaycastOptions {
    /// Grid resolution used to seed every ray.
    pub samples: usize,
    pub method: NonlinearMethod,
    pub solver: SolverOptions,
    pub on_failure: OnFailure,
}

impl Default for SurfaceRaycastOptions {
    fn default() -> Self {
        Self {
            samples: 50,
            method: NonlinearMethod::Newton,
            solver: SolverOptions::new(50, 1e-9),
            on_failure: OnFailure::Skip,
        }
    }
}

/// Where a ray hits a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Index of the ray in the input slice.
    pub ray_index: usize,
    pub u: f64,
    pub v: f64,
    /// Distance from the ray origin.
    pub distance: f64,
    pub point: Point3,
}

/// Cast every ray onto `surface`.
///
/// Each ray is seeded from the grid sample closest to it in front of its
/// origin and refined by solving `S(u, v) = origin + s * direction`. A ray
/// without a hit is handled by `options.on_failure`: `Fail` returns the
/// error, `Skip` leaves the ray out and `ReturnNone` makes the whole call
/// return `Ok(None)`. Rays are processed in parallel.
pub fn raycast_surface(
    surface: &dyn Surface,
    rays: &[Ray],
    options: &SurfaceRaycastOptions,
) -> Result<Option<Vec<RayHit>>> {
    let grid = surface_grid(surface, options.samples, options.samples);
    let cell = Aabb3::from_points(grid.iter().map(|s| s.point)).map_or(0.0, |b| b.size()) / options.samples.max(1) as f64;
    let outcomes: Vec<Result<RayHit>> = rays
        .par_iter()
        .enumerate()
        .map(|(index, ray)| cast_one(surface, &grid, cell, index, ray, options))
        .collect();

    let mut hits = Vec::with_capacity(rays.len());
    for outcome in outcomes {
        match outcome {
            Ok(hit) => hits.push(hit),
            Err(err) => match options.on_failure {
                OnFailure::Fail => return Err(err),
                OnFailure::Skip => log::debug!("ray skipped: {err}"),
                OnFailure::ReturnNone => return Ok(None),
            },
        }
    }
    Ok(Some(hits))
}

fn cast_one(
    surface: &dyn Surface,
    grid: &[GridSample],
    cell: f64,
    index: usize,
    ray: &Ray,
    options: &SurfaceRaycastOptions,
) -> Result<RayHit> {
    // Among the samples within one grid cell of the closest one, the first
    // along the ray.
    let in_front: Vec<(&GridSample, f64)> = grid
        .iter()
        .filter(|s| ray.parameter_of(s.point) >= 0.0)
        .map(|s| (s, ray.offset_of(s.point)))
        .collect();
    let reach = in_front.iter().map(|(_, d)| *d).fold(f64::INFINITY, f64::min) + cell;
    let seed = in_front
        .iter()
        .filter(|(_, d)| *d <= reach)
        .map(|(s, _)| *s)
        .min_by(|a, b| ray.parameter_of(a.point).total_cmp(&ray.parameter_of(b.point)))
        .ok_or_else(|| KernelError::NoSolution(format!("ray #{index} points away from the surface")))?;
    let (u_min, u_max) = surface.domain_u();
    let (v_min, v_max) = surface.domain_v();
    let bounds = Bounds::new(
        NVector3::new(u_min, v_min, 0.0),
        NVector3::new(u_max, v_max, f64::INFINITY),
    );
    let direction = to_na(ray.direction);
    let solution = solve_system(
        |x| to_na(surface.point_at(x[0], x[1]) - ray.at(x[2])),
        |x| {
            let (su, sv) = surface.partial_derivatives_at(x[0], x[1]);
            Matrix3::from_columns(&[to_na(su), to_na(sv), -direction])
        },
        NVector3::new(seed.u, seed.v, ray.parameter_of(seed.point)),
        options.method,
        Some(&bounds),
        &options.solver,
    )
    .map_err(|err| match err {
        KernelError::SolverDiverged { message, iterations, residual } => KernelError::SolverDiverged {
            message: format!("ray #{index}: {message}"),
            iterations,
            residual,
        },
        other => other,
    })?;
    let x = from_na(&solution.x);
    Ok(RayHit {
        ray_index: index,
        u: x.x,
        v: x.y,
        distance: x.z,
        point: surface.point_at(x.x, x.y),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use pgk_geometry::curve::Line;
    use pgk_geometry::surface::{PlanarSurface, SphericalSurface};
    use pgk_math::{dvec3, DVec3};

    #[test]
    fn test_line_through_sphere() {
        let sphere = SphericalSurface::new(DVec3::ZERO, 1.0);
        let line = Line::new(dvec3(-2.0, 0.1, 0.2), dvec3(2.0, 0.1, 0.2));
        for method in [NonlinearMethod::Newton, NonlinearMethod::LevenbergMarquardt, NonlinearMethod::Broyden] {
            let options = SurfaceIntersectionOptions {
                method,
                max_iterations: 100,
                ..Default::default()
            };
            let hits = intersect_curve_surface(&line, &sphere, &options).unwrap();
            assert_eq!(hits.len(), 2, "{method:?}");
            let x = (1.0f64 - 0.01 - 0.04).sqrt();
            assert_abs_diff_eq!(hits[0].point.x, -x, epsilon = 1e-6);
            assert_abs_diff_eq!(hits[1].point.x, x, epsilon = 1e-6);
            for hit in &hits {
                assert!((sphere.point_at(hit.u, hit.v) - hit.point).length() < 1e-6);
            }
        }
    }

    #[test]
    fn test_line_missing_plane() {
        let plane = PlanarSurface::xy().with_domain((-1.0, 1.0), (-1.0, 1.0));
        let line = Line::new(dvec3(0.0, 0.0, 1.0), dvec3(1.0, 1.0, 2.0));
        let hits = intersect_curve_surface(&line, &plane, &Default::default()).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_raycast_plane_and_failure_policies() {
        let plane = PlanarSurface::xy().with_domain((-5.0, 5.0), (-5.0, 5.0));
        let rays = vec![
            Ray::new(dvec3(1.0, 2.0, 3.0), -DVec3::Z),
            Ray::new(dvec3(0.0, 0.0, 3.0), DVec3::Z),
            Ray::new(dvec3(-2.0, 0.0, -1.0), dvec3(1.0, 0.0, 1.0)),
        ];
        let options = SurfaceRaycastOptions { samples: 11, ..Default::default() };
        let hits = raycast_surface(&plane, &rays, &options).unwrap().unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].ray_index, 0);
        assert!((hits[0].point - dvec3(1.0, 2.0, 0.0)).length() < 1e-9);
        assert_abs_diff_eq!(hits[0].distance, 3.0, epsilon = 1e-9);
        assert_eq!(hits[1].ray_index, 2);
        assert!((hits[1].point - dvec3(-1.0, 0.0, 0.0)).length() < 1e-9);

        let none = SurfaceRaycastOptions { on_failure: OnFailure::ReturnNone, ..options };
        assert!(raycast_surface(&plane, &rays, &none).unwrap().is_none());
        let fail = SurfaceRaycastOptions { on_failure: OnFailure::Fail, ..options };
        assert!(raycast_surface(&plane, &rays, &fail).is_err());
    }

    #[test]
    fn test_raycast_sphere() {
        let sphere = SphericalSurface::new(dvec3(0.0, 0.0, 1.0), 2.0);
        let ray = Ray::new(dvec3(5.0, 0.3, 1.2), -DVec3::X);
        let hits = raycast_surface(&sphere, &[ray], &Default::default()).unwrap().unwrap();
        assert_eq!(hits.len(), 1);
        assert_abs_diff_eq!((hits[0].point - sphere.center).length(), 2.0, epsilon = 1e-9);
        assert!(hits[0].point.x > 0.0);
    }
}
