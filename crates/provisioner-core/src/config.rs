//! provisioner.toml configuration parser.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Band;

/// Multiplier applied to observed demand to derive the new capacity.
pub const DEFAULT_SURPLUS_FACTOR: f64 = 1.2;

/// Average assumed when the metric window has no datapoints.
pub const DEFAULT_FALLBACK_AVERAGE: f64 = 0.1;

/// Values at or below this collapse to zero.
pub const DEFAULT_NEGLIGIBLE_FLOOR: f64 = 0.5;

/// Sample window, ten minutes.
pub const DEFAULT_WINDOW_SECS: u64 = 600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvisionerConfig {
    pub policy: Option<PolicyConfig>,
    pub bands: Option<Vec<BandConfig>>,
    pub aws: Option<AwsConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub surplus_factor: Option<f64>,
    pub fallback_average: Option<f64>,
    pub negligible_floor: Option<f64>,
    pub window_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandConfig {
    pub label: String,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
}

/// Resolved control policy with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub surplus_factor: f64,
    pub fallback_average: f64,
    pub negligible_floor: f64,
    pub window_secs: u64,
    pub bands: Vec<Band>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            surplus_factor: DEFAULT_SURPLUS_FACTOR,
            fallback_average: DEFAULT_FALLBACK_AVERAGE,
            negligible_floor: DEFAULT_NEGLIGIBLE_FLOOR,
            window_secs: DEFAULT_WINDOW_SECS,
            bands: default_bands(),
        }
    }
}

/// `Upper` at 0.8 and `Lower` at 0.5 of the provisioned value.
pub fn default_bands() -> Vec<Band> {
    vec![Band::new("Upper", 0.8), Band::new("Lower", 0.5)]
}

impl ProvisionerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Merge the configured values over the defaults and validate them.
    pub fn policy(&self) -> Result<Policy, ConfigError> {
        let defaults = Policy::default();
        let policy_cfg = self.policy.clone().unwrap_or_default();

        let bands = match &self.bands {
            Some(bands) => bands
                .iter()
                .map(|b| Band::new(b.label.clone(), b.multiplier))
                .collect(),
            None => defaults.bands,
        };

        let policy = Policy {
            surplus_factor: policy_cfg.surplus_factor.unwrap_or(defaults.surplus_factor),
            fallback_average: policy_cfg
                .fallback_average
                .unwrap_or(defaults.fallback_average),
            negligible_floor: policy_cfg
                .negligible_floor
                .unwrap_or(defaults.negligible_floor),
            window_secs: policy_cfg.window_secs.unwrap_or(defaults.window_secs),
            bands,
        };
        policy.validate()?;
        Ok(policy)
    }
}

impl Policy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.surplus_factor > 0.0 && self.surplus_factor.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "surplus_factor must be a positive number, got {}",
                self.surplus_factor
            )));
        }
        if !(self.fallback_average >= 0.0 && self.fallback_average.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "fallback_average must be a non-negative number, got {}",
                self.fallback_average
            )));
        }
        if !(self.negligible_floor >= 0.0 && self.negligible_floor.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "negligible_floor must be a non-negative number, got {}",
                self.negligible_floor
            )));
        }
        if self.window_secs == 0 {
            return Err(ConfigError::Invalid("window_secs must be non-zero".to_string()));
        }
        if self.bands.is_empty() {
            return Err(ConfigError::Invalid("at least one band is required".to_string()));
        }

        let mut seen = HashSet::new();
        for band in &self.bands {
            if band.label.is_empty() {
                return Err(ConfigError::Invalid("band label must not be empty".to_string()));
            }
            if !(band.multiplier > 0.0 && band.multiplier.is_finite()) {
                return Err(ConfigError::Invalid(format!(
                    "band `{}` multiplier must be positive, got {}",
                    band.label, band.multiplier
                )));
            }
            if !seen.insert(band.label.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate band label `{}`",
                    band.label
                )));
            }
        }
        Ok(())
    }
}
