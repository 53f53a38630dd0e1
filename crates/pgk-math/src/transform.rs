use crate::{DMat3, DMat4, DVec4, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Affine transform stored as a column-major 4x4 matrix.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Transform {
    pub matrix: [f64; 16],
}

impl Transform {
    pub fn identity() -> Self {
        Self::from_mat4(DMat4::IDENTITY)
    }

    pub fn from_translation(t: Vector3) -> Self {
        Self::from_mat4(DMat4::from_translation(t))
    }

    /// Rotation by `angle` radians around `axis` through the origin.
    pub fn from_axis_angle(axis: Vector3, angle: f64) -> Self {
        Self::from_mat4(DMat4::from_axis_angle(axis.normalize(), angle))
    }

    pub fn from_scale(scale: Vector3) -> Self {
        Self::from_mat4(DMat4::from_scale(scale))
    }

    /// Linear part `m` followed by `translation`.
    pub fn from_mat3_translation(m: DMat3, translation: Vector3) -> Self {
        let mut mat = DMat4::from_mat3(m);
        mat.w_axis = translation.extend(1.0);
        Self::from_mat4(mat)
    }

    pub fn from_mat4(m: DMat4) -> Self {
        Self {
            matrix: m.to_cols_array(),
        }
    }

    pub fn to_mat4(&self) -> DMat4 {
        DMat4::from_cols_array(&self.matrix)
    }

    pub fn transform_point(&self, p: Point3) -> Point3 {
        self.to_mat4().transform_point3(p)
    }

    pub fn transform_vector(&self, v: Vector3) -> Vector3 {
        self.to_mat4().transform_vector3(v)
    }

    /// Transform a homogeneous point `(w*x, w*y, w*z, w)` keeping its weight.
    pub fn transform_homogeneous(&self, hp: DVec4) -> DVec4 {
        self.to_mat4() * hp
    }

    /// Apply `self` first, then `other`.
    pub fn then(&self, other: &Transform) -> Transform {
        Self::from_mat4(other.to_mat4() * self.to_mat4())
    }

    pub fn inverse(&self) -> Option<Transform> {
        let m = self.to_mat4();
        if m.determinant().abs() < 1e-15 {
            None
        } else {
            Some(Self::from_mat4(m.inverse()))
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
