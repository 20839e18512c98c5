//! Support metric estimation.
//!
//! Each support-needing face above the platform is assumed to stand on a
//! square column running from `z = 0` up to its centroid. The sum of the
//! column volumes approximates the support material for an orientation.
//!
//! A second, coarser measure sums the area of every face whose normal
//! points less than `facing_z_threshold` upward. With the default 0.5 this
//! counts vertical walls as well as overhangs.

use orient_math::Point3;
use serde::{Deserialize, Serialize};

use crate::mesh::Mesh;
use crate::overhang::normal_needs_support;

/// Settings for support estimation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportSettings {
    /// Overhang angle threshold (degrees).
    pub overhang_angle: f64,
    /// Column cross-section `[x, y]` (mm).
    pub footprint: [f64; 2],
    /// Faces with normal `z` below this count toward the facing area.
    pub facing_z_threshold: f64,
}

impl Default for SupportSettings {
    fn default() -> Self {
        Self {
            overhang_angle: 45.0,
            footprint: [0.5, 0.5],
            facing_z_threshold: 0.5,
        }
    }
}

/// Which scalar an orientation search minimizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportObjective {
    /// Approximate column volume (mm³).
    #[default]
    Volume,
    /// Total area of support-needing faces (mm²).
    OverhangArea,
    /// Total area of faces below the facing threshold (mm²).
    FacingArea,
}

impl std::str::FromStr for SupportObjective {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "volume" => Ok(Self::Volume),
            "overhang_area" | "area" => Ok(Self::OverhangArea),
            "facing_area" => Ok(Self::FacingArea),
            other => Err(format!("unknown objective '{other}'")),
        }
    }
}

/// Support requirements of a mesh in one fixed orientation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SupportEstimate {
    /// Sum of column volumes under faces above the platform (mm³).
    pub volume: f64,
    /// Total area of faces the overhang test flags, at any height (mm²).
    pub overhang_area: f64,
    /// Total area of faces with normal `z` below the facing threshold (mm²).
    pub facing_area: f64,
    /// Number of faces needing support.
    pub supported_faces: usize,
}

impl SupportEstimate {
    /// The scalar selected by `objective`.
    pub fn metric(&self, objective: SupportObjective) -> f64 {
        match objective {
            SupportObjective::Volume => self.volume,
            SupportObjective::OverhangArea => self.overhang_area,
            SupportObjective::FacingArea => self.facing_area,
        }
    }
}

/// A support column: an axis-aligned box from the platform to a face centroid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportColumn {
    /// Lower corner, on the platform.
    pub min: Point3,
    /// Upper corner, at the centroid height.
    pub max: Point3,
}

impl SupportColumn {
    fn under(centroid: &Point3, footprint: [f64; 2]) -> Self {
        let hx = footprint[0] / 2.0;
        let hy = footprint[1] / 2.0;
        Self {
            min: Point3::new(centroid.x - hx, centroid.y - hy, 0.0),
            max: Point3::new(centroid.x + hx, centroid.y + hy, centroid.z),
        }
    }

    /// Column height (mm).
    pub fn height(&self) -> f64 {
        self.max.z - self.min.z
    }

    /// Column volume (mm³).
    pub fn volume(&self) -> f64 {
        (self.max.x - self.min.x) * (self.max.y - self.min.y) * self.height()
    }

    /// The eight box corners: the bottom ring counter-clockwise, then the top ring.
    pub fn corners(&self) -> [Point3; 8] {
        let (lo, hi) = (&self.min, &self.max);
        [
            Point3::new(lo.x, lo.y, lo.z),
            Point3::new(hi.x, lo.y, lo.z),
            Point3::new(hi.x, hi.y, lo.z),
            Point3::new(lo.x, hi.y, lo.z),
            Point3::new(lo.x, lo.y, hi.z),
            Point3::new(hi.x, lo.y, hi.z),
            Point3::new(hi.x, hi.y, hi.z),
            Point3::new(lo.x, hi.y, hi.z),
        ]
    }
}

/// Estimate support for `mesh` as currently oriented.
///
/// Builds no geometry; this is the form used inside a search.
pub fn estimate_support(mesh: &Mesh, settings: &SupportSettings) -> SupportEstimate {
    accumulate(mesh, settings, None)
}

/// Estimate support and also return one column per supported face above
/// the platform, for display.
pub fn estimate_support_with_geometry(
    mesh: &Mesh,
    settings: &SupportSettings,
) -> (SupportEstimate, Vec<SupportColumn>) {
    let mut columns = Vec::new();
    let estimate = accumulate(mesh, settings, Some(&mut columns));
    (estimate, columns)
}

// Faces are summed in mesh order so the metric is reproducible bit-for-bit.
fn accumulate(
    mesh: &Mesh,
    settings: &SupportSettings,
    mut columns: Option<&mut Vec<SupportColumn>>,
) -> SupportEstimate {
    let footprint_area = settings.footprint[0] * settings.footprint[1];
    let mut estimate = SupportEstimate::default();

    let faces = mesh
        .triangles()
        .iter()
        .zip(mesh.normals())
        .zip(mesh.areas());

    for ((tri, normal), area) in faces {
        if normal.z < settings.facing_z_threshold {
            estimate.facing_area += area;
        }
        if !normal_needs_support(normal, settings.overhang_angle) {
            continue;
        }
        estimate.supported_faces += 1;
        estimate.overhang_area += area;

        let center = tri.centroid();
        if center.z > 0.0 {
            estimate.volume += footprint_area * center.z;
            if let Some(columns) = columns.as_deref_mut() {
                columns.push(SupportColumn::under(&center, settings.footprint));
            }
        }
    }

    estimate
}
