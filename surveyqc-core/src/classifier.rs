//! Bootstrap classification of single responses.
//!
//! A target response is scored against probabilities fitted on a comparison
//! population. The population is resampled with replacement; the sorted
//! resample means give an empirical distribution whose `alpha` quantile is
//! the rejection threshold.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::response::{AnswerSet, QuestionSet, SurveyResponse};
use crate::stats::{ProbabilityTable, StatsError};
use crate::survey::Survey;

/// Minimum number of distinct truncated scores for a test to be meaningful.
pub const MIN_DISTINCT_SCORES: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classifier {
    /// Valid iff the response's log-likelihood exceeds the threshold.
    LogLikelihood,
    /// Valid iff the response's entropy is below the threshold.
    Entropy,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifyParams {
    /// Quantile of the bootstrap means used as the threshold.
    pub alpha: f64,
    /// Fit probabilities with a +1 pseudo-count on every survey option.
    pub smoothing: bool,
    pub seed: u64,
}

impl Default for ClassifyParams {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            smoothing: true,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    Tested { threshold: f64 },
    /// Too few distinct scores to test; the response defaults to valid.
    Undetermined { distinct_scores: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub valid: bool,
    pub score: f64,
    pub outcome: Outcome,
}

impl Classification {
    pub fn threshold(&self) -> Option<f64> {
        match self.outcome {
            Outcome::Tested { threshold } => Some(threshold),
            Outcome::Undetermined { .. } => None,
        }
    }
}

impl Classifier {
    pub const fn resamples(self) -> usize {
        match self {
            Classifier::LogLikelihood => 500,
            Classifier::Entropy => 200,
        }
    }

    pub fn score<R: AnswerSet + ?Sized>(
        self,
        probabilities: &ProbabilityTable,
        response: &R,
    ) -> Result<f64, StatsError> {
        match self {
            Classifier::LogLikelihood => probabilities.log_likelihood(response),
            Classifier::Entropy => probabilities.entropy(response),
        }
    }

    fn accepts(self, score: f64, threshold: f64) -> bool {
        match self {
            Classifier::LogLikelihood => score > threshold,
            Classifier::Entropy => score < threshold,
        }
    }

    /// Classifies `target` against `population` without touching either.
    pub fn classify(
        self,
        target: &SurveyResponse,
        population: &[SurveyResponse],
        survey: &Survey,
        params: &ClassifyParams,
    ) -> Result<Classification, StatsError> {
        let probabilities = ProbabilityTable::fit(population, params.smoothing.then_some(survey));
        let score = self.score(&probabilities, target)?;

        let retained = QuestionSet::of(target);
        let mut distinct = HashSet::new();
        for projection in retained.truncate(population) {
            distinct.insert(probabilities.log_likelihood(&projection)?.to_bits());
        }
        if distinct.len() < MIN_DISTINCT_SCORES {
            return Ok(Classification {
                valid: true,
                score,
                outcome: Outcome::Undetermined {
                    distinct_scores: distinct.len(),
                },
            });
        }

        let scores = population
            .iter()
            .map(|r| self.score(&probabilities, r))
            .collect::<Result<Vec<_>, _>>()?;
        let threshold = bootstrap_threshold(&scores, self.resamples(), params.alpha, params.seed);
        log::debug!(
            "{:?} response {}: score {score:.4}, threshold {threshold:.4}",
            self,
            target.id()
        );
        Ok(Classification {
            valid: self.accepts(score, threshold),
            score,
            outcome: Outcome::Tested { threshold },
        })
    }

    /// [`classify`](Self::classify), then stores score and threshold on `target`.
    pub fn classify_and_record(
        self,
        target: &mut SurveyResponse,
        population: &[SurveyResponse],
        survey: &Survey,
        params: &ClassifyParams,
    ) -> Result<Classification, StatsError> {
        let result = self.classify(target, population, survey, params)?;
        target.record_score(result.score, result.threshold());
        Ok(result)
    }
}

/// Sorted-bootstrap quantile of the mean of `scores`.
///
/// Draws `resamples` samples of `scores.len()` with replacement, sorts their
/// means ascending and returns the one at rank `floor(alpha * resamples)`,
/// clamped to the last rank. Returns NaN for empty input.
pub fn bootstrap_threshold(scores: &[f64], resamples: usize, alpha: f64, seed: u64) -> f64 {
    if scores.is_empty() || resamples == 0 {
        return f64::NAN;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let n = scores.len();
    let mut means: Vec<f64> = (0..resamples)
        .map(|_| {
            let total: f64 = (0..n).map(|_| scores[rng.gen_range(0..n)]).sum();
            total / n as f64
        })
        .collect();
    means.sort_by(f64::total_cmp);

    let rank = ((alpha * resamples as f64).floor() as usize).min(resamples - 1);
    means[rank]
}
