//! Static analysis: path statistics plus a bot-mixture ROC sweep.

use rayon::prelude::*;
use thiserror::Error;

use surveyqc_core::{
    PathEnumerator, PathError, ProfileRespondent, RngHierarchy, SimulationError, StatsError,
    Survey, SurveyPath, UniformRespondent,
};

use crate::config::{AnalysisConfig, ConfigError};
use crate::report::Report;
use crate::simulation::{analyze_batch, simulate_batch, RocRecord, ValidityStateError};

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("path error: {0}")]
    Path(#[from] PathError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
    #[error("classification error: {0}")]
    Stats(#[from] StatsError),
    #[error(transparent)]
    Validity(#[from] ValidityStateError),
}

/// Bot-ratio sweep over one survey, optionally in parallel.
///
/// Every ratio draws from its own seeded streams, so the parallel and
/// sequential sweeps return identical records.
pub struct MixtureSweep<'a> {
    survey: &'a Survey,
    paths: &'a [SurveyPath],
    config: &'a AnalysisConfig,
    seeds: RngHierarchy,
    bot: UniformRespondent,
    profile: ProfileRespondent,
}

impl<'a> MixtureSweep<'a> {
    /// Builds the shared profile from the `("profile", 0)` stream.
    pub fn new(survey: &'a Survey, paths: &'a [SurveyPath], config: &'a AnalysisConfig) -> Self {
        let seeds = RngHierarchy::new(config.seed);
        let mut rng = seeds.rng_for("profile", 0);
        let profile = ProfileRespondent::new(survey, config.profile_bias, &mut rng)
            .with_breakoff(config.breakoff_probability);
        Self {
            survey,
            paths,
            config,
            seeds,
            bot: UniformRespondent::with_breakoff(config.breakoff_probability),
            profile,
        }
    }

    /// Simulates and evaluates the batch for one ratio step.
    pub fn run_ratio(&self, step: usize, ratio: f64) -> Result<RocRecord, HarnessError> {
        let mut rng = self.seeds.rng_for("batch", step as u64);
        let mut batch = simulate_batch(
            self.survey,
            self.config.sample_size,
            ratio,
            &self.bot,
            &self.profile,
            &mut rng,
        )?;
        let record = analyze_batch(
            self.survey,
            self.paths,
            &mut batch,
            self.config.classifier,
            &self.config.classify_params(self.config.seed),
            &self.seeds.child("bootstrap", step as u64),
        )?;
        log::info!(
            "ratio {ratio:.2}: tp={} fp={} tn={} fn={} entropy={:.3}",
            record.true_positive,
            record.false_positive,
            record.true_negative,
            record.false_negative,
            record.entropy
        );
        Ok(record)
    }

    pub fn run(&self) -> Result<Vec<RocRecord>, HarnessError> {
        let ratios = self.config.ratios();
        if self.config.parallel {
            ratios
                .par_iter()
                .enumerate()
                .map(|(step, &ratio)| self.run_ratio(step, ratio))
                .collect()
        } else {
            ratios
                .iter()
                .enumerate()
                .map(|(step, &ratio)| self.run_ratio(step, ratio))
                .collect()
        }
    }
}

/// Validates `config`, computes path statistics and runs the ROC sweep.
pub fn run_static_analysis(survey: &Survey, config: &AnalysisConfig) -> Result<Report, HarnessError> {
    config.validate()?;
    let seeds = RngHierarchy::new(config.seed);

    let enumerator = PathEnumerator::with_limits(survey, config.path_limits());
    let paths = enumerator.paths()?;
    let mut rng = seeds.rng_for("paths", 0);
    let statistics = enumerator.statistics_for(&paths, &mut rng, config.average_length_walks)?;
    log::info!(
        "survey {}: {} paths, length {}..={} (avg {:.2})",
        survey.name(),
        statistics.path_count,
        statistics.min_path_length,
        statistics.max_path_length,
        statistics.average_path_length
    );

    let roc = MixtureSweep::new(survey, &paths, config).run()?;
    Ok(Report::new(survey.name(), config.clone(), statistics, roc))
}
