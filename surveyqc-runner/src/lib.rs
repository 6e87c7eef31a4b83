//! SurveyQC Runner: simulation harness, analysis config, reports.
//!
//! This crate builds on `surveyqc-core` to provide:
//! - TOML analysis configuration with validation
//! - Mixture batches of uniform bots and one shared respondent profile
//! - Bot-ratio sweeps (parallel or sequential) producing ROC records
//! - JSON reports and ROC CSV export

pub mod analysis;
pub mod config;
pub mod report;
pub mod simulation;

pub use analysis::{run_static_analysis, HarnessError, MixtureSweep};
pub use config::{AnalysisConfig, ConfigError};
pub use report::{Report, ReportError, SCHEMA_VERSION};
pub use simulation::{
    analyze_batch, simulate_batch, ConfusionCounts, RocRecord, ValidityStateError,
};
