//! Ray casting onto iso-surfaces of scalar fields.

use pgk_core::{KernelError, OnFailure, Result, SolverOptions};
use pgk_math::{linspace, Point3, Ray};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::root::{ridder, sign_changes};

/// A scalar function of position.
pub trait ScalarField: Sync {
    fn value(&self, point: Point3) -> f64;
}

impl<F> ScalarField for F
where
    F: Fn(Point3) -> f64 + Sync,
{
    fn value(&self, point: Point3) -> f64 {
        self(point)
    }
}

/// Options for [`raycast_implicit`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImplicitRaycastOptions {
    /// Field value defining the surface.
    pub iso_value: f64,
    /// Number of intervals the ray is cut into before refinement.
    pub sections: usize,
    pub max_distance: f64,
    /// Report only the nearest root of each ray.
    pub first_only: bool,
    pub solver: SolverOptions,
    pub on_failure: OnFailure,
}

impl Default for ImplicitRaycastOptions {
    fn default() -> Self {
        Self {
            iso_value: 0.0,
            sections: 10,
            max_distance: 10.0,
            first_only: true,
            solver: SolverOptions::new(50, 1e-9),
            on_failure: OnFailure::Skip,
        }
    }
}

/// A ray crossing the iso-surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImplicitHit {
    pub ray_index: usize,
    pub distance: f64,
    pub point: Point3,
}

/// Roots of `field - iso_value` along every ray up to `max_distance`.
///
/// Hits of one ray are ordered by distance. A ray with no root is handled
/// by `options.on_failure` the same way as in surface ray casting.
pub fn raycast_implicit(
    field: &dyn ScalarField,
    rays: &[Ray],
    options: &ImplicitRaycastOptions,
) -> Result<Option<Vec<ImplicitHit>>> {
    if options.sections == 0 || !(options.max_distance > 0.0) {
        return Err(KernelError::InvalidInput(format!(
            "ray casting needs sections > 0 and a positive distance, got {} and {}",
            options.sections, options.max_distance
        )));
    }
    let outcomes: Vec<Result<Vec<ImplicitHit>>> = rays
        .par_iter()
        .enumerate()
        .map(|(index, ray)| cast_one(field, index, ray, options))
        .collect();

    let mut hits = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(found) => hits.extend(found),
            Err(err) => match options.on_failure {
                OnFailure::Fail => return Err(err),
                OnFailure::Skip => log::debug!("implicit ray skipped: {err}"),
                OnFailure::ReturnNone => return Ok(None),
            },
        }
    }
    Ok(Some(hits))
}

fn cast_one(field: &dyn ScalarField, index: usize, ray: &Ray, options: &ImplicitRaycastOptions) -> Result<Vec<ImplicitHit>> {
    let f = |s: f64| field.value(ray.at(s)) - options.iso_value;
    let ss = linspace(0.0, options.max_distance, options.sections + 1);
    let values: Vec<f64> = ss.iter().map(|&s| f(s)).collect();
    let (zeros, brackets) = sign_changes(&values);

    // Exact hits carry no bracket end.
    let mut events: Vec<(usize, Option<usize>)> = zeros
        .into_iter()
        .map(|i| (i, None))
        .chain(brackets.into_iter().map(|(i, j)| (i, Some(j))))
        .collect();
    events.sort_by_key(|&(i, _)| i);
    if options.first_only {
        events.truncate(1);
    }
    let distances = events
        .into_iter()
        .map(|(i, j)| match j {
            None => Ok(ss[i]),
            Some(j) => ridder(&f, ss[i], ss[j], &options.solver),
        })
        .collect::<Result<Vec<f64>>>()?;
    if distances.is_empty() {
        return Err(KernelError::NoSolution(format!(
            "ray #{index} does not reach iso-value {} within {}",
            options.iso_value, options.max_distance
        )));
    }
    Ok(distances
        .into_iter()
        .map(|distance| ImplicitHit {
            ray_index: index,
            distance,
            point: ray.at(distance),
        })
        .collect())
}
