#![warn(missing_docs)]

//! Build-orientation optimizer for additive manufacturing.
//!
//! This crate estimates how much support material a triangle mesh needs
//! when printed in a given orientation, and searches random orientations
//! for the one that needs the least.
//!
//! # Example
//!
//! ```ignore
//! use orient_support::{run_search, CancelToken, Mesh, OrientSettings, OrientationSampler};
//!
//! let mesh: Mesh = // ... load triangles
//! let settings = OrientSettings { random_seed: Some(7), ..Default::default() };
//! let sampler = OrientationSampler::seeded(settings.sampling_mode, settings.n_samples, settings.random_seed);
//! let result = run_search(&mesh, sampler, &settings, &CancelToken::new(), |_| {})?;
//!
//! println!("Best volume: {:?}", result.best_metric());
//! ```

pub mod error;
pub mod mesh;
pub mod overhang;
pub mod rotate;
pub mod sample;
pub mod search;
pub mod store;
pub mod support;

pub use error::{OrientError, Result};
pub use mesh::{Mesh, Triangle};
pub use overhang::{needs_support, normal_needs_support};
pub use rotate::{rotate, rotate_by_euler, rotate_to_align, seat_on_platform};
pub use sample::{Candidate, OrientationSampler, SamplingMode};
pub use search::{
    run_search, CancelToken, Evaluation, OrientationSearch, ProgressEvent, SearchResult,
    SearchState,
};
pub use store::{MeshId, MeshStore};
pub use support::{
    estimate_support, estimate_support_with_geometry, SupportColumn, SupportEstimate,
    SupportObjective, SupportSettings,
};

use serde::{Deserialize, Serialize};

/// Orientation search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientSettings {
    /// Overhang angle threshold (degrees, 0 to 90).
    pub overhang_angle: f64,
    /// Number of candidate orientations to evaluate.
    pub n_samples: usize,
    /// How candidates are drawn.
    pub sampling_mode: SamplingMode,
    /// Seed for reproducible runs; entropy seeded when absent.
    pub random_seed: Option<u64>,
    /// Support column cross-section `[x, y]` (mm).
    pub support_footprint: [f64; 2],
    /// Scalar the search minimizes.
    pub objective: SupportObjective,
    /// Drop each rotated candidate onto the platform before measuring.
    pub seat_on_platform: bool,
    /// Normal `z` below which a face counts toward the facing area.
    pub facing_z_threshold: f64,
}

impl Default for OrientSettings {
    fn default() -> Self {
        Self {
            overhang_angle: 45.0,
            n_samples: 100,
            sampling_mode: SamplingMode::Euler,
            random_seed: None,
            support_footprint: [0.5, 0.5],
            objective: SupportObjective::Volume,
            seat_on_platform: false,
            facing_z_threshold: 0.5,
        }
    }
}

impl OrientSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=90.0).contains(&self.overhang_angle) {
            return Err(OrientError::InvalidSettings(
                "overhang_angle must be between 0 and 90 degrees".into(),
            ));
        }
        if self.n_samples == 0 {
            return Err(OrientError::InvalidSettings(
                "n_samples must be positive".into(),
            ));
        }
        if !self
            .support_footprint
            .iter()
            .all(|d| d.is_finite() && *d > 0.0)
        {
            return Err(OrientError::InvalidSettings(
                "support_footprint dimensions must be positive".into(),
            ));
        }
        if !(-1.0..=1.0).contains(&self.facing_z_threshold) {
            return Err(OrientError::InvalidSettings(
                "facing_z_threshold must be between -1 and 1".into(),
            ));
        }
        Ok(())
    }

    /// The subset of settings the support estimator reads.
    pub fn support_settings(&self) -> SupportSettings {
        SupportSettings {
            overhang_angle: self.overhang_angle,
            footprint: self.support_footprint,
            facing_z_threshold: self.facing_z_threshold,
        }
    }

    /// A fresh sampler for these settings.
    pub fn sampler(&self) -> OrientationSampler {
        OrientationSampler::seeded(self.sampling_mode, self.n_samples, self.random_seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = OrientSettings::default();
        assert!((settings.overhang_angle - 45.0).abs() < 0.01);
        assert_eq!(settings.n_samples, 100);
        assert_eq!(settings.sampling_mode, SamplingMode::Euler);
        assert!(settings.random_seed.is_none());
        assert!(!settings.seat_on_platform);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_overhang_angle() {
        for angle in [-1.0, 90.5, f64::NAN] {
            let settings = OrientSettings {
                overhang_angle: angle,
                ..Default::default()
            };
            assert!(matches!(
                settings.validate(),
                Err(OrientError::InvalidSettings(_))
            ));
        }
        let edge = OrientSettings {
            overhang_angle: 90.0,
            ..Default::default()
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_invalid_samples_and_footprint() {
        let settings = OrientSettings {
            n_samples: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = OrientSettings {
            support_footprint: [0.5, 0.0],
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = OrientSettings {
            facing_z_threshold: 1.5,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_support_settings_projection() {
        let settings = OrientSettings {
            overhang_angle: 30.0,
            support_footprint: [1.0, 2.0],
            ..Default::default()
        };
        let support = settings.support_settings();
        assert_eq!(support.overhang_angle, 30.0);
        assert_eq!(support.footprint, [1.0, 2.0]);
        assert_eq!(support.facing_z_threshold, 0.5);
    }

    #[test]
    fn test_seeded_sampler_from_settings() {
        let settings = OrientSettings {
            n_samples: 4,
            random_seed: Some(11),
            ..Default::default()
        };
        let a: Vec<_> = settings.sampler().collect();
        let b: Vec<_> = settings.sampler().collect();
        assert_eq!(a.len(), 4);
        assert_eq!(a, b);
    }
}
