//! Settings file loading and command-line overrides.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use orient_support::{OrientSettings, SamplingMode, SupportObjective};

/// Settings given on the command line; `None` keeps the file or default value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub overhang_angle: Option<f64>,
    pub n_samples: Option<usize>,
    pub sampling_mode: Option<SamplingMode>,
    pub random_seed: Option<u64>,
    pub objective: Option<SupportObjective>,
    pub seat_on_platform: bool,
}

impl Overrides {
    /// Apply these overrides on top of `settings`.
    pub fn apply(&self, mut settings: OrientSettings) -> OrientSettings {
        if let Some(angle) = self.overhang_angle {
            settings.overhang_angle = angle;
        }
        if let Some(n) = self.n_samples {
            settings.n_samples = n;
        }
        if let Some(mode) = self.sampling_mode {
            settings.sampling_mode = mode;
        }
        if let Some(seed) = self.random_seed {
            settings.random_seed = Some(seed);
        }
        if let Some(objective) = self.objective {
            settings.objective = objective;
        }
        if self.seat_on_platform {
            settings.seat_on_platform = true;
        }
        settings
    }
}

/// Parse settings from TOML text. Missing keys take their defaults.
pub fn parse_settings(text: &str) -> Result<OrientSettings> {
    let settings: OrientSettings = toml::from_str(text)?;
    Ok(settings)
}

/// Load settings from an optional file, apply overrides and validate.
pub fn resolve_settings(path: Option<&Path>, overrides: &Overrides) -> Result<OrientSettings> {
    let base = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            parse_settings(&text)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => OrientSettings::default(),
    };

    let settings = overrides.apply(base);
    settings.validate()?;
    Ok(settings)
}
