//! TOML-based evaluation configuration and preset definitions.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::eval::types::{Resolution, Season};

/// Top-level configuration parsed from TOML.
///
/// All fields have defaults matching the `heating` preset. Load from TOML
/// with [`Config::from_toml_file`] or use [`Config::heating`] for the
/// built-in default.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Evaluation engine options.
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    /// Synthetic portfolio used by the `demo` command.
    #[serde(default)]
    pub synthetic: SyntheticConfig,
}

/// Options recognised by the evaluation engine.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluationConfig {
    /// Interval resolution in minutes (15 or 60).
    pub resolution_minutes: i64,
    /// Season selecting the comfort band.
    pub season: Season,
    /// Longest run of missing intervals that is linearly interpolated.
    pub max_interpolation_gap_intervals: usize,
    /// Optional inclusive test period; all days are evaluated when absent.
    pub evaluation_period: Option<EvaluationPeriod>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            resolution_minutes: 15,
            season: Season::Heating,
            max_interpolation_gap_intervals: 4,
            evaluation_period: None,
        }
    }
}

impl EvaluationConfig {
    /// Resolves `resolution_minutes` to a supported resolution.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for anything other than 15 or 60 minutes.
    pub fn resolution(&self) -> Result<Resolution, ConfigError> {
        Resolution::from_minutes(self.resolution_minutes).ok_or_else(|| {
            ConfigError::new(
                "evaluation.resolution_minutes",
                format!("must be 15 or 60, got {}", self.resolution_minutes),
            )
        })
    }

    /// Returns `true` when the date lies inside the evaluation period.
    pub fn includes(&self, date: NaiveDate) -> bool {
        self.evaluation_period
            .as_ref()
            .is_none_or(|period| period.contains(date))
    }
}

/// Inclusive start/end dates of the test period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluationPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl EvaluationPeriod {
    pub fn contains(&self, date: NaiveDate) -> bool {
        (self.start..=self.end).contains(&date)
    }
}

/// Synthetic portfolio parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyntheticConfig {
    /// Number of buildings (must be > 0).
    pub buildings: usize,
    /// Number of whole days to generate (must be > 0).
    pub days: usize,
    /// First generated day (UTC midnight).
    pub start_date: NaiveDate,
    /// Master random seed.
    pub seed: u64,
    /// Mean building demand (kW).
    pub base_kw: f64,
    /// Daily sinusoidal amplitude (kW).
    pub amp_kw: f64,
    /// Gaussian noise standard deviation (kW).
    pub noise_std: f64,
    /// Battery power rating per building (kW).
    pub battery_kw: f64,
    /// Share of the deviation from the daily mean the flexible run removes (0.0–1.0).
    pub flattening: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            buildings: 4,
            days: 14,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            seed: 42,
            base_kw: 20.0,
            amp_kw: 8.0,
            noise_std: 0.5,
            battery_kw: 6.0,
            flattening: 0.6,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"evaluation.resolution_minutes"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Config {
    /// Heating-season preset: 15-minute resolution.
    pub fn heating() -> Self {
        Self::default()
    }

    /// Cooling-season preset: hourly resolution, July start.
    pub fn cooling() -> Self {
        Self {
            evaluation: EvaluationConfig {
                resolution_minutes: 60,
                season: Season::Cooling,
                ..EvaluationConfig::default()
            },
            synthetic: SyntheticConfig {
                start_date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap_or_default(),
                base_kw: 30.0,
                amp_kw: 12.0,
                ..SyntheticConfig::default()
            },
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["heating", "cooling"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "heating" => Ok(Self::heating()),
            "cooling" => Ok(Self::cooling()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid, names an unknown
    /// season, or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns every error found.
    ///
    /// Returns an empty vector if the configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = self.evaluation.validate();

        let syn = &self.synthetic;
        if syn.buildings == 0 {
            errors.push(ConfigError::new("synthetic.buildings", "must be > 0"));
        }
        if syn.days == 0 {
            errors.push(ConfigError::new("synthetic.days", "must be > 0"));
        }
        if syn.base_kw <= 0.0 {
            errors.push(ConfigError::new("synthetic.base_kw", "must be > 0"));
        }
        if syn.noise_std < 0.0 {
            errors.push(ConfigError::new("synthetic.noise_std", "must be >= 0"));
        }
        if syn.battery_kw < 0.0 {
            errors.push(ConfigError::new("synthetic.battery_kw", "must be >= 0"));
        }
        if !(0.0..=1.0).contains(&syn.flattening) {
            errors.push(ConfigError::new(
                "synthetic.flattening",
                "must be in [0.0, 1.0]",
            ));
        }

        errors
    }
}

impl EvaluationConfig {
    /// Validates the engine options and returns every error found.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if let Err(e) = self.resolution() {
            errors.push(e);
        }
        if let Some(period) = &self.evaluation_period {
            if period.start > period.end {
                errors.push(ConfigError::new(
                    "evaluation.evaluation_period.start",
                    format!("must be <= end ({} > {})", period.start, period.end),
                ));
            }
        }

        errors
    }
}
