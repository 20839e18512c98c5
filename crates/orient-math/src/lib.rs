#![warn(missing_docs)]

//! Math types for the orient build-orientation optimizer.
//!
//! Thin wrappers around nalgebra providing the types the support
//! estimator works in: points, vectors, directions, the build axis,
//! and rigid rotations.

use nalgebra::{Matrix3, Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// Below this cross-product magnitude a direction is treated as parallel
/// (or antiparallel) to the build axis and no alignment rotation is built.
pub const ALIGN_EPSILON: f64 = 1e-6;

/// The printer's build direction, `+Z`.
pub fn build_axis() -> Dir3 {
    Vec3::z_axis()
}

/// A rigid rotation of 3D space.
///
/// The canonical representation is a 3x3 orthonormal matrix applied to
/// column vectors (`p' = R * p`). Euler angles and axis-angle pairs convert
/// to and from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    /// The underlying 3x3 matrix.
    pub matrix: Matrix3<f64>,
}

impl Rotation {
    /// Identity rotation.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    /// Wrap a matrix, checking that it is a proper rotation
    /// (orthonormal with determinant +1) within `tol`.
    pub fn from_matrix(matrix: Matrix3<f64>, tol: f64) -> Option<Self> {
        let orthonormal = (matrix.transpose() * matrix - Matrix3::identity()).abs().max() <= tol;
        if orthonormal && (matrix.determinant() - 1.0).abs() <= tol {
            Some(Self { matrix })
        } else {
            None
        }
    }

    /// Rotation about the X axis by `angle` radians.
    pub fn rotation_x(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix3::identity();
        m[(1, 1)] = c;
        m[(1, 2)] = -s;
        m[(2, 1)] = s;
        m[(2, 2)] = c;
        Self { matrix: m }
    }

    /// Rotation about the Y axis by `angle` radians.
    pub fn rotation_y(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix3::identity();
        m[(0, 0)] = c;
        m[(0, 2)] = s;
        m[(2, 0)] = -s;
        m[(2, 2)] = c;
        Self { matrix: m }
    }

    /// Rotation about the Z axis by `angle` radians.
    pub fn rotation_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix3::identity();
        m[(0, 0)] = c;
        m[(0, 1)] = -s;
        m[(1, 0)] = s;
        m[(1, 1)] = c;
        Self { matrix: m }
    }

    /// Rotation about an arbitrary axis through the origin by `angle` radians.
    ///
    /// Uses Rodrigues' rotation formula.
    pub fn about_axis(axis: &Dir3, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let (x, y, z) = (axis.as_ref().x, axis.as_ref().y, axis.as_ref().z);
        let mut m = Matrix3::identity();
        m[(0, 0)] = t * x * x + c;
        m[(0, 1)] = t * x * y - s * z;
        m[(0, 2)] = t * x * z + s * y;
        m[(1, 0)] = t * x * y + s * z;
        m[(1, 1)] = t * y * y + c;
        m[(1, 2)] = t * y * z - s * x;
        m[(2, 0)] = t * x * z - s * y;
        m[(2, 1)] = t * y * z + s * x;
        m[(2, 2)] = t * z * z + c;
        Self { matrix: m }
    }

    /// Compose Euler angles given in degrees as `Rz * Ry * Rx`
    /// (X is applied first, Z last).
    pub fn from_euler_degrees(rx: f64, ry: f64, rz: f64) -> Self {
        let x = Self::rotation_x(rx.to_radians());
        let y = Self::rotation_y(ry.to_radians());
        let z = Self::rotation_z(rz.to_radians());
        z.then(&y).then(&x)
    }

    /// Decompose into `[rx, ry, rz]` degrees such that
    /// `from_euler_degrees(rx, ry, rz)` reproduces this rotation.
    ///
    /// `ry` lies in `[-90, 90]`. At gimbal lock (`|ry| = 90`) the
    /// decomposition is not unique and `rz` is reported as zero.
    pub fn to_euler_degrees(&self) -> [f64; 3] {
        let m = &self.matrix;
        let ry = (-m[(2, 0)]).clamp(-1.0, 1.0).asin();
        let (rx, rz) = if ry.cos().abs() > 1e-9 {
            (m[(2, 1)].atan2(m[(2, 2)]), m[(1, 0)].atan2(m[(0, 0)]))
        } else {
            ((-m[(1, 2)]).atan2(m[(1, 1)]), 0.0)
        };
        [rx.to_degrees(), ry.to_degrees(), rz.to_degrees()]
    }

    /// Rotation that carries `direction` onto the build axis.
    ///
    /// The axis is `direction × build_axis` and the angle is
    /// `acos(direction · build_axis)`. When the cross product is shorter
    /// than [`ALIGN_EPSILON`] the result is the identity. That includes the
    /// antiparallel case, where `direction = -Z` is *not* flipped.
    pub fn align_to_build_axis(direction: &Vec3) -> Self {
        let Some(dir) = Dir3::try_new(*direction, f64::EPSILON) else {
            return Self::identity();
        };
        let up = build_axis().into_inner();
        let axis = dir.cross(&up);
        let axis_len = axis.norm();
        if axis_len < ALIGN_EPSILON {
            return Self::identity();
        }
        let angle = dir.dot(&up).clamp(-1.0, 1.0).acos();
        Self::about_axis(&Dir3::new_unchecked(axis / axis_len), angle)
    }

    /// Axis and angle (radians, in `(0, π]`) of this rotation, or `None`
    /// for the identity.
    pub fn to_axis_angle(&self) -> Option<(Dir3, f64)> {
        Rotation3::from_matrix_unchecked(self.matrix).axis_angle()
    }

    /// Compose: `self` then `other` (self * other).
    ///
    /// Applied to a point, `other` acts first.
    pub fn then(&self, other: &Rotation) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Inverse rotation (the transpose).
    pub fn inverse(&self) -> Self {
        Self {
            matrix: self.matrix.transpose(),
        }
    }

    /// Rotate a point about the origin.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        Point3::from(self.matrix * p.coords)
    }

    /// Rotate a direction vector.
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        self.matrix * v
    }

    /// Whether this rotation is the identity within `tol`.
    pub fn is_identity(&self, tol: f64) -> bool {
        (self.matrix - Matrix3::identity()).abs().max() <= tol
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::identity()
    }
}
