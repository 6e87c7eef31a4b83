//! Serializable analysis configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use surveyqc_core::paths::AVERAGE_LENGTH_WALKS;
use surveyqc_core::{Classifier, ClassifyParams, PathLimits, ProfileRespondent};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Everything needed to reproduce one static analysis run.
///
/// Missing TOML keys fall back to the defaults, so a config file only needs
/// the fields it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub classifier: Classifier,
    /// Responses simulated per mixture ratio.
    pub sample_size: usize,
    /// Step between consecutive bot ratios in `[0, 1]`.
    pub granularity: f64,
    pub alpha: f64,
    pub smoothing: bool,
    pub seed: u64,
    pub parallel: bool,
    /// Probability that a profile respondent picks its preferred option.
    pub profile_bias: f64,
    pub breakoff_probability: f64,
    pub max_paths: usize,
    pub max_branch_depth: usize,
    pub average_length_walks: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let limits = PathLimits::default();
        Self {
            classifier: Classifier::LogLikelihood,
            sample_size: 100,
            granularity: 0.1,
            alpha: 0.05,
            smoothing: true,
            seed: 42,
            parallel: true,
            profile_bias: ProfileRespondent::DEFAULT_BIAS,
            breakoff_probability: 0.0,
            max_paths: limits.max_paths,
            max_branch_depth: limits.max_branch_depth,
            average_length_walks: AVERAGE_LENGTH_WALKS,
        }
    }
}

impl AnalysisConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: &str| -> Result<(), ConfigError> {
            Err(ConfigError::Invalid {
                field,
                reason: reason.to_string(),
            })
        };
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return invalid("alpha", "must lie strictly between 0 and 1");
        }
        if !(self.granularity > 0.0 && self.granularity <= 1.0) {
            return invalid("granularity", "must lie in (0, 1]");
        }
        if self.sample_size == 0 {
            return invalid("sample_size", "must be at least 1");
        }
        if !(self.profile_bias > 0.0 && self.profile_bias <= 1.0) {
            return invalid("profile_bias", "must lie in (0, 1]");
        }
        if !(0.0..1.0).contains(&self.breakoff_probability) {
            return invalid("breakoff_probability", "must lie in [0, 1)");
        }
        if self.max_paths == 0 {
            return invalid("max_paths", "must be at least 1");
        }
        if self.max_branch_depth == 0 {
            return invalid("max_branch_depth", "must be at least 1");
        }
        Ok(())
    }

    /// Bot ratios swept by the harness: `i * granularity` up to 1.
    pub fn ratios(&self) -> Vec<f64> {
        // The epsilon keeps steps like 0.1 from losing the final ratio.
        let steps = (1.0 / self.granularity + 1e-9).floor() as usize;
        (0..=steps)
            .map(|i| (i as f64 * self.granularity).min(1.0))
            .collect()
    }

    /// Classifier parameters for one bootstrap stream.
    pub fn classify_params(&self, seed: u64) -> ClassifyParams {
        ClassifyParams {
            alpha: self.alpha,
            smoothing: self.smoothing,
            seed,
        }
    }

    pub fn path_limits(&self) -> PathLimits {
        PathLimits {
            max_paths: self.max_paths,
            max_branch_depth: self.max_branch_depth,
        }
    }
}
