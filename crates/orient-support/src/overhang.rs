//! Overhang classification.
//!
//! The angle threshold is compared against `90 - overhang_angle`, so the
//! configured overhang angle is effectively measured from the horizontal:
//! with the default 45° a downward face needs support once its normal is
//! more than 45° away from the build axis. Changing this formula changes
//! every optimization result.

use orient_math::{build_axis, Vec3};

use crate::mesh::Triangle;

/// Whether a face with unit `normal` needs support.
///
/// True iff the angle between `normal` and the build axis exceeds
/// `90 - overhang_angle` degrees and the normal points downward.
pub fn normal_needs_support(normal: &Vec3, overhang_angle: f64) -> bool {
    let up = build_axis().into_inner();
    let cos = normal.dot(&up).clamp(-1.0, 1.0);
    let angle_degrees = cos.acos().to_degrees();
    angle_degrees > (90.0 - overhang_angle) && normal.z < 0.0
}

/// Whether `triangle` needs support for the given overhang angle (degrees).
///
/// Zero-area triangles take the build axis as their normal and never need
/// support.
pub fn needs_support(triangle: &Triangle, overhang_angle: f64) -> bool {
    let normal = triangle
        .normal()
        .map(|n| n.into_inner())
        .unwrap_or_else(|| build_axis().into_inner());
    normal_needs_support(&normal, overhang_angle)
}
