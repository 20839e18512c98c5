//! Triangle-soup mesh model with derived per-face normals and areas.

use orient_math::{build_axis, Dir3, Point3, Vec3};
use rayon::prelude::*;
use tracing::debug;

use crate::error::{OrientError, Result};

/// Relative cutoff for zero-area faces.
///
/// A face is degenerate when `|cross| <= DEGENERATE_EPSILON * longest²`,
/// with `longest` its longest edge, so the test does not depend on the
/// mesh's units or scale.
pub const DEGENERATE_EPSILON: f64 = 1e-12;

/// An ordered triple of vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// Vertices in winding order.
    pub vertices: [Point3; 3],
}

impl Triangle {
    /// Create a triangle from three vertices.
    pub fn new(v0: Point3, v1: Point3, v2: Point3) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// `(v1 - v0) × (v2 - v0)`, unnormalized.
    pub fn cross(&self) -> Vec3 {
        let [v0, v1, v2] = &self.vertices;
        (v1 - v0).cross(&(v2 - v0))
    }

    /// Unit normal, or `None` for a zero-area triangle.
    pub fn normal(&self) -> Option<Dir3> {
        let cross = self.cross();
        let len = cross.norm();
        if len > DEGENERATE_EPSILON * self.longest_edge_squared() {
            Some(Dir3::new_unchecked(cross / len))
        } else {
            None
        }
    }

    fn longest_edge_squared(&self) -> f64 {
        let [v0, v1, v2] = &self.vertices;
        (v1 - v0)
            .norm_squared()
            .max((v2 - v1).norm_squared())
            .max((v0 - v2).norm_squared())
    }

    /// Half the magnitude of the edge cross product.
    pub fn area(&self) -> f64 {
        0.5 * self.cross().norm()
    }

    /// Mean of the three vertices.
    pub fn centroid(&self) -> Point3 {
        let [v0, v1, v2] = &self.vertices;
        Point3::from((v0.coords + v1.coords + v2.coords) / 3.0)
    }

    /// Whether the triangle has (numerically) zero area.
    pub fn is_degenerate(&self) -> bool {
        self.normal().is_none()
    }

    fn is_finite(&self) -> bool {
        self.vertices
            .iter()
            .all(|v| v.x.is_finite() && v.y.is_finite() && v.z.is_finite())
    }
}

/// An immutable triangle soup.
///
/// Normals and areas are computed once at construction and stay aligned by
/// index with the triangle list. A zero-area face stores the build axis as
/// its normal, which the overhang test reads as "never needs support".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    triangles: Vec<Triangle>,
    normals: Vec<Vec3>,
    areas: Vec<f64>,
}

impl Mesh {
    /// Build a mesh, rejecting non-finite coordinates and faces whose
    /// normal cannot be represented.
    pub fn new(triangles: Vec<Triangle>) -> Result<Self> {
        for (i, tri) in triangles.iter().enumerate() {
            if !tri.is_finite() {
                return Err(OrientError::InvalidMesh(format!(
                    "triangle {i} has a non-finite coordinate"
                )));
            }
            let cross = tri.cross();
            if !(cross.x.is_finite() && cross.y.is_finite() && cross.z.is_finite()) {
                return Err(OrientError::InvalidMesh(format!(
                    "triangle {i} has a non-finite normal"
                )));
            }
        }

        let mesh = Self::from_triangles_unchecked(triangles);
        let degenerate = mesh.degenerate_count();
        if degenerate > 0 {
            debug!(degenerate, total = mesh.len(), "mesh contains zero-area faces");
        }
        Ok(mesh)
    }

    /// Build a mesh from a flat indexed buffer: `[x0, y0, z0, ...]` vertex
    /// positions and `[i0, i1, i2, ...]` triangle indices.
    pub fn from_indexed(vertices: &[f32], indices: &[u32]) -> Result<Self> {
        if vertices.len() % 3 != 0 {
            return Err(OrientError::InvalidMesh(format!(
                "vertex buffer length {} is not a multiple of 3",
                vertices.len()
            )));
        }
        if indices.len() % 3 != 0 {
            return Err(OrientError::InvalidMesh(format!(
                "index buffer length {} is not a multiple of 3",
                indices.len()
            )));
        }

        let vertex_count = vertices.len() / 3;
        let point = |idx: u32| -> Result<Point3> {
            let i = idx as usize;
            if i >= vertex_count {
                return Err(OrientError::InvalidMesh(format!(
                    "index {i} out of range (vertex count = {vertex_count})"
                )));
            }
            Ok(Point3::new(
                vertices[i * 3] as f64,
                vertices[i * 3 + 1] as f64,
                vertices[i * 3 + 2] as f64,
            ))
        };

        let triangles = indices
            .chunks_exact(3)
            .map(|tri| Ok(Triangle::new(point(tri[0])?, point(tri[1])?, point(tri[2])?)))
            .collect::<Result<Vec<_>>>()?;

        Self::new(triangles)
    }

    /// Derive normals and areas without validating coordinates.
    ///
    /// Callers guarantee finiteness (rigid motions of an already valid mesh).
    pub(crate) fn from_triangles_unchecked(triangles: Vec<Triangle>) -> Self {
        let up = build_axis().into_inner();
        let (normals, areas): (Vec<Vec3>, Vec<f64>) = triangles
            .par_iter()
            .map(|tri| match tri.normal() {
                Some(normal) => (normal.into_inner(), tri.area()),
                None => (up, 0.0),
            })
            .unzip();

        Self {
            triangles,
            normals,
            areas,
        }
    }

    /// An empty mesh.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The triangles, in construction order.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Per-face unit normals (build axis for zero-area faces).
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    /// Per-face areas.
    pub fn areas(&self) -> &[f64] {
        &self.areas
    }

    /// Number of triangles.
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// Whether the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Sum of face areas.
    pub fn total_area(&self) -> f64 {
        self.areas.iter().sum()
    }

    /// Number of zero-area faces.
    pub fn degenerate_count(&self) -> usize {
        self.triangles.iter().filter(|t| t.is_degenerate()).count()
    }

    /// Axis-aligned bounding box as `(min, max)`, or `None` when empty.
    pub fn bounds(&self) -> Option<(Point3, Point3)> {
        let mut points = self.triangles.iter().flat_map(|t| t.vertices.iter());
        let first = *points.next()?;
        Some(points.fold((first, first), |(min, max), p| {
            (min.inf(p), max.sup(p))
        }))
    }

    /// A copy of this mesh moved by `offset`.
    pub(crate) fn translated(&self, offset: &Vec3) -> Self {
        let triangles = self
            .triangles
            .iter()
            .map(|t| Triangle {
                vertices: t.vertices.map(|v| v + offset),
            })
            .collect();

        Self {
            triangles,
            normals: self.normals.clone(),
            areas: self.areas.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Axis-aligned cube with its base on `z = base`, outward-facing normals.
    pub(crate) fn make_cube_mesh(size: f64, base: f64) -> Mesh {
        let s = size as f32;
        let b = base as f32;
        let vertices = vec![
            0.0, 0.0, b, s, 0.0, b, s, s, b, 0.0, s, b,
            0.0, 0.0, b + s, s, 0.0, b + s, s, s, b + s, 0.0, s, b + s,
        ];
        let indices = vec![
            0, 2, 1, 0, 3, 2, // Bottom
            4, 5, 6, 4, 6, 7, // Top
            0, 1, 5, 0, 5, 4, // Front
            2, 3, 7, 2, 7, 6, // Back
            0, 4, 7, 0, 7, 3, // Left
            1, 2, 6, 1, 6, 5, // Right
        ];
        Mesh::from_indexed(&vertices, &indices).unwrap()
    }

    #[test]
    fn test_triangle_normal_and_area() {
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        );
        let n = tri.normal().unwrap();
        assert_relative_eq!(n.z, 1.0);
        assert_relative_eq!(tri.area(), 2.0);
        assert_relative_eq!(tri.centroid().x, 2.0 / 3.0);
    }

    #[test]
    fn test_degenerate_triangle_uses_build_axis() {
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(2.0, 2.0, 1.0),
        );
        assert!(tri.is_degenerate());
        let mesh = Mesh::new(vec![tri]).unwrap();
        assert_eq!(mesh.normals()[0], Vec3::z());
        assert_eq!(mesh.areas()[0], 0.0);
        assert_eq!(mesh.degenerate_count(), 1);
    }

    #[test]
    fn test_tiny_triangle_keeps_its_normal() {
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 1e-7, 0.0),
            Point3::new(1e-7, 0.0, 0.0),
        );
        assert!(!tri.is_degenerate());
        let mesh = Mesh::new(vec![tri]).unwrap();
        assert_relative_eq!(mesh.normals()[0].z, -1.0);
        assert_relative_eq!(mesh.areas()[0], 0.5e-14, max_relative = 1e-12);
        assert_eq!(mesh.degenerate_count(), 0);
    }

    #[test]
    fn test_long_sliver_is_degenerate() {
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1000.0, 0.0, 0.0),
            Point3::new(0.0, 1e-10, 0.0),
        );
        assert!(tri.is_degenerate());
        let mesh = Mesh::new(vec![tri]).unwrap();
        assert_eq!(mesh.normals()[0], Vec3::z());
        assert_eq!(mesh.areas()[0], 0.0);

        let point = Point3::new(3.0, 3.0, 3.0);
        assert!(Triangle::new(point, point, point).is_degenerate());
    }

    #[test]
    fn test_rejects_non_finite() {
        let tri = Triangle::new(
            Point3::new(f64::NAN, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        assert!(matches!(Mesh::new(vec![tri]), Err(OrientError::InvalidMesh(_))));

        let huge = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1e300, 0.0, 0.0),
            Point3::new(0.0, 1e300, 0.0),
        );
        assert!(matches!(Mesh::new(vec![huge]), Err(OrientError::InvalidMesh(_))));
    }

    #[test]
    fn test_from_indexed_validates_buffers() {
        let verts = [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        assert!(Mesh::from_indexed(&verts, &[0, 1, 2]).is_ok());
        assert!(Mesh::from_indexed(&verts, &[0, 1, 3]).is_err());
        assert!(Mesh::from_indexed(&verts, &[0, 1]).is_err());
        assert!(Mesh::from_indexed(&verts[..8], &[0, 1, 2]).is_err());
    }

    #[test]
    fn test_cube_derived_data() {
        let mesh = make_cube_mesh(1.0, 0.0);
        assert_eq!(mesh.len(), 12);
        assert_eq!(mesh.normals().len(), 12);
        assert_relative_eq!(mesh.total_area(), 6.0, epsilon = 1e-12);
        // Bottom faces point down, top faces point up
        assert_relative_eq!(mesh.normals()[0].z, -1.0);
        assert_relative_eq!(mesh.normals()[2].z, 1.0);

        let (min, max) = mesh.bounds().unwrap();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = Mesh::empty();
        assert!(mesh.is_empty());
        assert!(mesh.bounds().is_none());
        assert_eq!(mesh.total_area(), 0.0);
    }
}
