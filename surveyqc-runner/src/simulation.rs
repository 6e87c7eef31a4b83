//! One mixture batch: simulate, classify, tabulate.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use surveyqc_core::stats::survey_entropy;
use surveyqc_core::{
    ClassifyParams, Classifier, ProfileRespondent, RespondentStrategy, RngHierarchy,
    SimulationError, Survey, SurveyPath, SurveyResponse, UniformRespondent, ValidityStatus,
};

use crate::analysis::HarnessError;

/// A response reached evaluation without a ground-truth label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("response {response} has unresolved validity at evaluation time")]
pub struct ValidityStateError {
    pub response: String,
}

/// Confusion counts; "positive" means classified valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionCounts {
    pub fn record(&mut self, response: &SurveyResponse, classified_valid: bool) -> Result<(), ValidityStateError> {
        match (response.validity(), classified_valid) {
            (ValidityStatus::Valid, true) => self.true_positive += 1,
            (ValidityStatus::Valid, false) => self.false_negative += 1,
            (ValidityStatus::Invalid, true) => self.false_positive += 1,
            (ValidityStatus::Invalid, false) => self.true_negative += 1,
            (ValidityStatus::Unresolved, _) => {
                return Err(ValidityStateError {
                    response: response.id().to_string(),
                })
            }
        }
        Ok(())
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }
}

/// Per-ratio summary row of the ROC table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocRecord {
    pub bot_fraction: f64,
    pub entropy: f64,
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl RocRecord {
    pub fn confusion(&self) -> ConfusionCounts {
        ConfusionCounts {
            true_positive: self.true_positive,
            false_positive: self.false_positive,
            true_negative: self.true_negative,
            false_negative: self.false_negative,
        }
    }
}

/// Draws `floor(size * bot_ratio)` uniform bots and fills the rest from the
/// shared `profile`, then shuffles the batch.
pub fn simulate_batch(
    survey: &Survey,
    size: usize,
    bot_ratio: f64,
    bot: &UniformRespondent,
    profile: &ProfileRespondent,
    rng: &mut StdRng,
) -> Result<Vec<SurveyResponse>, SimulationError> {
    let bots = ((size as f64) * bot_ratio).floor() as usize;
    let bots = bots.min(size);
    let mut batch = Vec::with_capacity(size);
    for _ in 0..bots {
        batch.push(bot.respond(survey, rng)?);
    }
    for _ in bots..size {
        batch.push(profile.respond(survey, rng)?);
    }
    batch.shuffle(rng);
    Ok(batch)
}

/// Classifies every member of `batch` against the whole batch and tabulates
/// the outcome against the synthetic labels.
///
/// Member `i` bootstraps with the `("bootstrap", i)` stream of `seeds`.
/// Scores are written back onto the batch once every member is classified.
pub fn analyze_batch(
    survey: &Survey,
    paths: &[SurveyPath],
    batch: &mut [SurveyResponse],
    classifier: Classifier,
    params: &ClassifyParams,
    seeds: &RngHierarchy,
) -> Result<RocRecord, HarnessError> {
    let population: &[SurveyResponse] = &*batch;
    let mut results = Vec::with_capacity(population.len());
    for (i, target) in population.iter().enumerate() {
        let member_params = ClassifyParams {
            seed: seeds.sub_seed("bootstrap", i as u64),
            ..*params
        };
        results.push(classifier.classify(target, population, survey, &member_params)?);
    }

    let mut confusion = ConfusionCounts::default();
    let mut bots = 0usize;
    for (response, result) in batch.iter_mut().zip(&results) {
        response.record_score(result.score, result.threshold());
        confusion.record(response, result.valid)?;
        if response.validity() == ValidityStatus::Invalid {
            bots += 1;
        }
    }

    let bot_fraction = if batch.is_empty() {
        0.0
    } else {
        bots as f64 / batch.len() as f64
    };
    Ok(RocRecord {
        bot_fraction,
        entropy: survey_entropy(survey, paths, &*batch),
        true_positive: confusion.true_positive,
        false_positive: confusion.false_positive,
        true_negative: confusion.true_negative,
        false_negative: confusion.false_negative,
    })
}
