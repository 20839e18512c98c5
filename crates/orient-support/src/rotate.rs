//! Rigid rotation of meshes.
//!
//! Every operation returns a new [`Mesh`]; the input is never modified.

use orient_math::{Rotation, Vec3};
use rayon::prelude::*;

use crate::mesh::{Mesh, Triangle};

/// Apply `rotation` to every vertex of every triangle.
pub fn rotate(mesh: &Mesh, rotation: &Rotation) -> Mesh {
    let triangles: Vec<Triangle> = mesh
        .triangles()
        .par_iter()
        .map(|tri| Triangle {
            vertices: tri.vertices.map(|v| rotation.apply_point(&v)),
        })
        .collect();

    Mesh::from_triangles_unchecked(triangles)
}

/// Rotate so that `direction` ends up on the build axis.
///
/// Directions within [`orient_math::ALIGN_EPSILON`] of parallel or
/// antiparallel to the build axis yield an unrotated copy. For `-Z` this
/// means the mesh is *not* flipped.
pub fn rotate_to_align(mesh: &Mesh, direction: &Vec3) -> Mesh {
    let rotation = Rotation::align_to_build_axis(direction);
    if rotation.is_identity(0.0) {
        return mesh.clone();
    }
    rotate(mesh, &rotation)
}

/// Rotate by Euler angles in degrees, composed as `Rz * Ry * Rx`.
pub fn rotate_by_euler(mesh: &Mesh, rx: f64, ry: f64, rz: f64) -> Mesh {
    if mesh.is_empty() {
        return Mesh::empty();
    }
    rotate(mesh, &Rotation::from_euler_degrees(rx, ry, rz))
}

/// Translate along the build axis so the lowest vertex sits on `z = 0`.
pub fn seat_on_platform(mesh: &Mesh) -> Mesh {
    match mesh.bounds() {
        Some((min, _)) if min.z != 0.0 => mesh.translated(&Vec3::new(0.0, 0.0, -min.z)),
        _ => mesh.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::tests::make_cube_mesh;
    use approx::assert_relative_eq;
    use orient_math::Point3;

    fn assert_meshes_close(a: &Mesh, b: &Mesh, tol: f64) {
        assert_eq!(a.len(), b.len());
        for (ta, tb) in a.triangles().iter().zip(b.triangles()) {
            for (va, vb) in ta.vertices.iter().zip(&tb.vertices) {
                assert!((va - vb).norm() <= tol * (1.0 + vb.coords.norm()));
            }
        }
    }

    #[test]
    fn test_rotate_does_not_mutate_input() {
        let mesh = make_cube_mesh(2.0, 0.0);
        let before = mesh.clone();
        let _ = rotate_by_euler(&mesh, 30.0, 40.0, 50.0);
        assert_eq!(mesh, before);
    }

    #[test]
    fn test_euler_roundtrip_restores_vertices() {
        let mesh = make_cube_mesh(3.0, 1.0);
        let r = Rotation::from_euler_degrees(33.0, -71.0, 160.0);
        let there = rotate(&mesh, &r);
        let back = rotate(&there, &r.inverse());
        assert_meshes_close(&back, &mesh, 1e-9);
    }

    #[test]
    fn test_rotate_to_build_axis_is_identity() {
        let mesh = make_cube_mesh(1.0, 0.0);
        assert_eq!(rotate_to_align(&mesh, &Vec3::z()), mesh);
    }

    #[test]
    fn test_rotate_to_antiparallel_is_identity() {
        let mesh = make_cube_mesh(1.0, 0.0);
        assert_eq!(rotate_to_align(&mesh, &-Vec3::z()), mesh);
    }

    #[test]
    fn test_rotate_to_align_moves_normals() {
        let mesh = make_cube_mesh(1.0, 0.0);
        // The +X face should end up facing the build axis
        let rotated = rotate_to_align(&mesh, &Vec3::x());
        let right_face_normal = rotated.normals()[10];
        assert_relative_eq!(right_face_normal.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rotate_by_euler_empty() {
        let rotated = rotate_by_euler(&Mesh::empty(), 10.0, 20.0, 30.0);
        assert!(rotated.is_empty());
    }

    #[test]
    fn test_rotate_x_180_flips_cube_below_platform() {
        let mesh = make_cube_mesh(1.0, 0.0);
        let rotated = rotate_by_euler(&mesh, 180.0, 0.0, 0.0);
        let (min, max) = rotated.bounds().unwrap();
        assert_relative_eq!(min.z, -1.0, epsilon = 1e-12);
        assert!(max.z.abs() < 1e-12);
    }

    #[test]
    fn test_seat_on_platform() {
        let mesh = make_cube_mesh(1.0, 0.0);
        let rotated = rotate_by_euler(&mesh, 180.0, 0.0, 0.0);
        let seated = seat_on_platform(&rotated);
        let (min, max) = seated.bounds().unwrap();
        assert!(min.z.abs() < 1e-12);
        assert_relative_eq!(max.z, 1.0, epsilon = 1e-12);
        assert_eq!(seated.normals(), rotated.normals());

        let floating = make_cube_mesh(1.0, 5.0);
        let (min, _) = seat_on_platform(&floating).bounds().unwrap();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
    }
}
