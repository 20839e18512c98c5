//! Candidate orientation sampling.
//!
//! A sampler yields a finite, non-restartable sequence of candidates drawn
//! from an injectable random source. Build a fresh sampler with the same
//! seed to regenerate a sequence.

use std::f64::consts::TAU;

use orient_math::{Rotation, Vec3};
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// How candidates are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    /// Directions uniform on the unit sphere, each aligned to the build axis.
    Direction,
    /// Independent Euler triples, each angle uniform in `[-180, 180]` degrees.
    #[default]
    Euler,
}

impl std::str::FromStr for SamplingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direction" => Ok(Self::Direction),
            "euler" => Ok(Self::Euler),
            other => Err(format!("unknown sampling mode '{other}'")),
        }
    }
}

/// A candidate orientation in the form it was sampled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Candidate {
    /// A unit direction to bring onto the build axis.
    Direction(Vec3),
    /// Euler angles in degrees, composed as `Rz * Ry * Rx`.
    Euler {
        /// Rotation about X (degrees).
        rx: f64,
        /// Rotation about Y (degrees).
        ry: f64,
        /// Rotation about Z (degrees).
        rz: f64,
    },
}

impl Candidate {
    /// The canonical rotation this candidate stands for.
    pub fn rotation(&self) -> Rotation {
        match *self {
            Candidate::Direction(dir) => Rotation::align_to_build_axis(&dir),
            Candidate::Euler { rx, ry, rz } => Rotation::from_euler_degrees(rx, ry, rz),
        }
    }
}

/// Finite sequence of random candidate orientations.
#[derive(Debug, Clone)]
pub struct OrientationSampler<R = StdRng> {
    mode: SamplingMode,
    remaining: usize,
    rng: R,
}

impl<R: Rng> OrientationSampler<R> {
    /// A sampler yielding `n` candidates drawn from `rng`.
    pub fn new(mode: SamplingMode, n: usize, rng: R) -> Self {
        Self {
            mode,
            remaining: n,
            rng,
        }
    }

    /// The sampling mode.
    pub fn mode(&self) -> SamplingMode {
        self.mode
    }

    /// Candidates not yet drawn.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    fn draw(&mut self) -> Candidate {
        match self.mode {
            SamplingMode::Direction => {
                let phi = self.rng.gen_range(0.0..TAU);
                let cos_theta: f64 = self.rng.gen_range(-1.0..=1.0);
                let theta = cos_theta.acos();
                let (sin_t, cos_t) = theta.sin_cos();
                Candidate::Direction(Vec3::new(sin_t * phi.cos(), sin_t * phi.sin(), cos_t))
            }
            SamplingMode::Euler => Candidate::Euler {
                rx: self.rng.gen_range(-180.0..=180.0),
                ry: self.rng.gen_range(-180.0..=180.0),
                rz: self.rng.gen_range(-180.0..=180.0),
            },
        }
    }
}

impl OrientationSampler<StdRng> {
    /// A sampler backed by [`StdRng`], seeded from `seed` when given and
    /// from OS entropy otherwise.
    pub fn seeded(mode: SamplingMode, n: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(mode, n, rng)
    }
}

impl<R: Rng> Iterator for OrientationSampler<R> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.draw())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<R: Rng> ExactSizeIterator for OrientationSampler<R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sampler_is_finite_and_not_restartable() {
        let mut sampler = OrientationSampler::seeded(SamplingMode::Euler, 5, Some(1));
        assert_eq!(sampler.len(), 5);
        assert_eq!(sampler.by_ref().count(), 5);
        assert_eq!(sampler.remaining(), 0);
        assert!(sampler.next().is_none());
    }

    #[test]
    fn test_same_seed_same_sequence() {
        for mode in [SamplingMode::Direction, SamplingMode::Euler] {
            let a: Vec<_> = OrientationSampler::seeded(mode, 20, Some(42)).collect();
            let b: Vec<_> = OrientationSampler::seeded(mode, 20, Some(42)).collect();
            assert_eq!(a, b);
            let c: Vec<_> = OrientationSampler::seeded(mode, 20, Some(43)).collect();
            assert_ne!(a, c);
        }
    }

    #[test]
    fn test_euler_angles_in_range() {
        for candidate in OrientationSampler::seeded(SamplingMode::Euler, 500, Some(7)) {
            let Candidate::Euler { rx, ry, rz } = candidate else {
                panic!("expected Euler candidate, got {candidate:?}");
            };
            for angle in [rx, ry, rz] {
                assert!((-180.0..=180.0).contains(&angle));
            }
        }
    }

    #[test]
    fn test_directions_are_unit_and_cover_both_hemispheres() {
        let mut up = 0;
        let mut down = 0;
        for candidate in OrientationSampler::seeded(SamplingMode::Direction, 1000, Some(3)) {
            let Candidate::Direction(dir) = candidate else {
                panic!("expected direction candidate, got {candidate:?}");
            };
            assert_relative_eq!(dir.norm(), 1.0, epsilon = 1e-12);
            if dir.z > 0.0 {
                up += 1;
            } else {
                down += 1;
            }
        }
        // Uniform on the sphere: roughly half point up
        assert!(up > 400 && down > 400, "up={up} down={down}");
    }

    #[test]
    fn test_candidate_rotation() {
        let euler = Candidate::Euler {
            rx: 10.0,
            ry: 20.0,
            rz: 30.0,
        };
        assert_eq!(euler.rotation(), Rotation::from_euler_degrees(10.0, 20.0, 30.0));

        let dir = Candidate::Direction(Vec3::x());
        let mapped = dir.rotation().apply_vec(&Vec3::x());
        assert!((mapped - Vec3::z()).norm() < 1e-12);
    }

    #[test]
    fn test_custom_rng_is_accepted() {
        let rng = StdRng::seed_from_u64(9);
        let sampler = OrientationSampler::new(SamplingMode::Direction, 3, rng);
        assert_eq!(sampler.mode(), SamplingMode::Direction);
        assert_eq!(sampler.count(), 3);
    }

    #[test]
    fn test_sampling_mode_parse() {
        assert_eq!("euler".parse::<SamplingMode>(), Ok(SamplingMode::Euler));
        assert_eq!("Direction".parse::<SamplingMode>(), Ok(SamplingMode::Direction));
        assert!("sphere".parse::<SamplingMode>().is_err());
        assert_eq!(SamplingMode::default(), SamplingMode::Euler);
    }
}
