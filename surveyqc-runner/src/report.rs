//! Analysis report and its JSON / CSV artifacts.
//!
//! The JSON report is the full record of a run. The ROC CSV carries only the
//! per-ratio rows, with the column order renderers expect:
//! bot_fraction, entropy, true_positive, false_positive, true_negative,
//! false_negative.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surveyqc_core::PathStatistics;
use thiserror::Error;

use crate::config::AnalysisConfig;
use crate::simulation::RocRecord;

/// Current report schema version. Bump on breaking field changes.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("serialize report: {0}")]
    Json(#[from] serde_json::Error),
    #[error("write ROC CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported report schema version {found} (max supported: {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub survey: String,
    pub config: AnalysisConfig,
    pub path_count: usize,
    pub min_path_length: usize,
    pub max_path_length: usize,
    pub average_path_length: f64,
    pub max_possible_entropy: f64,
    /// Pairwise false-correlation probability. Not computed.
    pub false_correlation: Option<f64>,
    pub roc: Vec<RocRecord>,
}

impl Report {
    pub fn new(
        survey: impl Into<String>,
        config: AnalysisConfig,
        paths: PathStatistics,
        roc: Vec<RocRecord>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            survey: survey.into(),
            config,
            path_count: paths.path_count,
            min_path_length: paths.min_path_length,
            max_path_length: paths.max_path_length,
            average_path_length: paths.average_path_length,
            max_possible_entropy: paths.max_possible_entropy,
            false_correlation: None,
            roc,
        }
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a report, rejecting schema versions newer than this build.
    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        let report: Self = serde_json::from_str(json)?;
        if report.schema_version > SCHEMA_VERSION {
            return Err(ReportError::UnsupportedSchema {
                found: report.schema_version,
                supported: SCHEMA_VERSION,
            });
        }
        Ok(report)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        std::fs::write(path, self.to_json()?).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn roc_csv(&self) -> Result<String, ReportError> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in &self.roc {
            wtr.serialize(record)?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| ReportError::Csv(e.into_error().into()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn write_roc_csv(&self, path: &Path) -> Result<(), ReportError> {
        std::fs::write(path, self.roc_csv()?).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
