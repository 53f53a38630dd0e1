use crate::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Axis-aligned box around a set of points, typically a control polygon.
///
/// By the convex hull property the box of a NURBS control net also bounds
/// the curve or surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb3 {
    pub min: Point3,
    pub max: Point3,
}

impl Aabb3 {
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Degenerate box containing a single point.
    pub fn point(p: Point3) -> Self {
        Self::new(p, p)
    }

    /// `None` for an empty input.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point3>,
    {
        let mut points = points.into_iter();
        let first = Self::point(points.next()?);
        Some(points.fold(first, |acc, p| acc.include(p)))
    }

    pub fn include(self, p: Point3) -> Self {
        Self::new(self.min.min(p), self.max.max(p))
    }

    pub fn union(self, other: Self) -> Self {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn center(&self) -> Point3 {
        (self.min + self.max) * 0.5
    }

    pub fn extents(&self) -> Vector3 {
        self.max - self.min
    }

    /// Length of the box diagonal.
    pub fn size(&self) -> f64 {
        self.extents().length()
    }

    /// Grown by `margin` on every side.
    pub fn inflate(self, margin: f64) -> Self {
        Self::new(self.min - Vector3::splat(margin), self.max + Vector3::splat(margin))
    }

    /// Whether the boxes overlap; touching counts.
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }
}
