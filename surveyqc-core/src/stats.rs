//! Answer frequencies, fitted probabilities and response scores.
//!
//! All logarithms are base 2, so scores are in bits.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;

use crate::paths::SurveyPath;
use crate::response::AnswerSet;
use crate::survey::{BlockId, OptionId, Question, QuestionId, Survey};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    /// The pair was never observed, or its fitted probability is zero.
    #[error("no positive probability for option {option} of question {question}")]
    ZeroProbability {
        question: QuestionId,
        option: OptionId,
    },
}

// ─── Frequencies ────────────────────────────────────────────────────

/// Observation counts per question and option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrequencyTable {
    counts: BTreeMap<QuestionId, BTreeMap<OptionId, u64>>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table with a pseudo-count of 1 for every option of every
    /// non-freetext question in `survey`.
    pub fn smoothed(survey: &Survey) -> Self {
        let mut table = Self::new();
        let mut seeded = 0usize;
        for question in survey.questions().filter(|q| !q.freetext) {
            let row = table.counts.entry(question.id.clone()).or_default();
            for option in question.options.keys() {
                row.insert(option.clone(), 1);
                seeded += 1;
            }
        }
        log::info!("Laplace smoothing seeded {seeded} option counts");
        table
    }

    /// Counts over `responses`, starting from the smoothed table when a
    /// survey is supplied.
    pub fn build<R: AnswerSet>(responses: &[R], smoothing: Option<&Survey>) -> Self {
        let mut table = smoothing.map(Self::smoothed).unwrap_or_default();
        for response in responses {
            table.observe(response);
        }
        table
    }

    pub fn observe<R: AnswerSet + ?Sized>(&mut self, response: &R) {
        for answer in response.answers() {
            let row = self.counts.entry(answer.question.clone()).or_default();
            for option in &answer.options {
                *row.entry(option.clone()).or_insert(0) += 1;
            }
        }
    }

    pub fn count(&self, question: &QuestionId, option: &OptionId) -> u64 {
        self.counts
            .get(question)
            .and_then(|row| row.get(option))
            .copied()
            .unwrap_or(0)
    }

    pub fn question_total(&self, question: &QuestionId) -> u64 {
        self.counts
            .get(question)
            .map(|row| row.values().sum())
            .unwrap_or(0)
    }

    pub fn questions(&self) -> impl Iterator<Item = &QuestionId> + '_ {
        self.counts.keys()
    }
}

// ─── Probabilities ──────────────────────────────────────────────────

/// Per-question categorical distributions fitted from a [`FrequencyTable`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProbabilityTable {
    probabilities: BTreeMap<QuestionId, BTreeMap<OptionId, f64>>,
}

impl ProbabilityTable {
    pub fn from_frequencies(frequencies: &FrequencyTable) -> Self {
        let probabilities = frequencies
            .counts
            .iter()
            .filter_map(|(question, row)| {
                let total: u64 = row.values().sum();
                if total == 0 {
                    return None;
                }
                let dist = row
                    .iter()
                    .map(|(option, &n)| (option.clone(), n as f64 / total as f64))
                    .collect();
                Some((question.clone(), dist))
            })
            .collect();
        Self { probabilities }
    }

    /// Frequencies then probabilities in one step.
    pub fn fit<R: AnswerSet>(responses: &[R], smoothing: Option<&Survey>) -> Self {
        Self::from_frequencies(&FrequencyTable::build(responses, smoothing))
    }

    pub fn distribution(&self, question: &QuestionId) -> Option<&BTreeMap<OptionId, f64>> {
        self.probabilities.get(question)
    }

    pub fn probability(&self, question: &QuestionId, option: &OptionId) -> Result<f64, StatsError> {
        match self.probabilities.get(question).and_then(|d| d.get(option)) {
            Some(&p) if p > 0.0 => Ok(p),
            _ => Err(StatsError::ZeroProbability {
                question: question.clone(),
                option: option.clone(),
            }),
        }
    }

    /// Sum of `log2(p)` over every selected option.
    pub fn log_likelihood<R: AnswerSet + ?Sized>(&self, response: &R) -> Result<f64, StatsError> {
        let mut ll = 0.0;
        for answer in response.answers() {
            for option in &answer.options {
                ll += self.probability(&answer.question, option)?.log2();
            }
        }
        Ok(ll)
    }

    /// `-Σ p·log2(p)` over every selected option.
    pub fn entropy<R: AnswerSet + ?Sized>(&self, response: &R) -> Result<f64, StatsError> {
        let mut ent = 0.0;
        for answer in response.answers() {
            for option in &answer.options {
                let p = self.probability(&answer.question, option)?;
                ent += p * p.log2();
            }
        }
        Ok(-ent)
    }
}

// ─── Survey entropy ─────────────────────────────────────────────────

/// Options treated as the same answer as `option` of `question`.
///
/// Questions of an ALL block are variants of each other; their options
/// correspond when they sit at the same row offset from their question.
/// Other questions only match themselves.
pub fn equivalent_answer_variants<'s>(
    survey: &'s Survey,
    question: &'s Question,
    option: &OptionId,
) -> Vec<&'s OptionId> {
    let Some(target) = question.option(option) else {
        return Vec::new();
    };
    let offset = row_offset(question, target.source_row);
    let variants: Vec<&Question> = match survey.block(&question.block) {
        Some(block) if block.is_all() => survey.block_questions(block).collect(),
        _ => vec![question],
    };
    variants
        .into_iter()
        .flat_map(|variant| {
            variant
                .options
                .values()
                .filter(move |o| row_offset(variant, o.source_row) == offset)
                .map(|o| &o.id)
        })
        .collect()
}

fn row_offset(question: &Question, option_row: u32) -> i64 {
    i64::from(question.source_row) - i64::from(option_row)
}

/// Empirical entropy of a response set over the survey's paths.
///
/// Sums `-p·log2(p)` over every (question, answer class, path), where `p` is
/// the number of that path's responses choosing the class divided by the
/// total number of responses. Empty classes contribute nothing.
pub fn survey_entropy<R: AnswerSet>(survey: &Survey, paths: &[SurveyPath], responses: &[R]) -> f64 {
    if responses.is_empty() {
        return 0.0;
    }
    let total = responses.len() as f64;

    let traversed: Vec<BTreeSet<BlockId>> = responses
        .iter()
        .map(|r| traversed_top_level(survey, r))
        .collect();
    let per_path: Vec<Vec<&R>> = paths
        .iter()
        .map(|path| {
            responses
                .iter()
                .zip(&traversed)
                .filter(|(_, blocks)| blocks.iter().all(|b| path.contains(b)))
                .map(|(r, _)| r)
                .collect()
        })
        .collect();

    let mut entropy = 0.0;
    for question in survey.questions().filter(|q| !q.freetext) {
        for option in question.options.keys() {
            let class = equivalent_answer_variants(survey, question, option);
            for members in &per_path {
                let hits = members.iter().filter(|r| r.contains_any(&class)).count();
                if hits > 0 {
                    let p = hits as f64 / total;
                    entropy -= p * p.log2();
                }
            }
        }
    }
    entropy
}

fn traversed_top_level<R: AnswerSet>(survey: &Survey, response: &R) -> BTreeSet<BlockId> {
    response
        .answers()
        .filter_map(|a| survey.question(&a.question))
        .filter_map(|q| survey.top_level_ancestor(&q.block))
        .map(|b| b.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::PathEnumerator;
    use crate::response::{QuestionResponse, SurveyResponse, ValidityStatus};
    use crate::survey::{BranchParadigm, QuestionSpec, SurveyBuilder};

    fn two_question_survey() -> Survey {
        let mut builder = SurveyBuilder::new("two");
        let b1 = builder.add_block(false);
        let b2 = builder.add_block(false);
        builder.add_question(&b1, QuestionSpec::radio("Q1", &["A", "B"]));
        builder.add_question(&b2, QuestionSpec::radio("Q2", &["C", "D"]));
        builder.build().unwrap()
    }

    /// Response choosing option `picks[i]` of the i-th question.
    fn respond(survey: &Survey, picks: &[usize]) -> SurveyResponse {
        let answers = survey
            .questions()
            .zip(picks)
            .enumerate()
            .map(|(position, (q, &i))| QuestionResponse {
                question: q.id.clone(),
                options: vec![q.options_by_index().unwrap()[i].id.clone()],
                position,
            })
            .collect();
        SurveyResponse::new("r", answers, ValidityStatus::Valid)
    }

    #[test]
    fn smoothing_seeds_every_option() {
        let survey = two_question_survey();
        let responses = vec![respond(&survey, &[0, 0])];
        let table = FrequencyTable::build(&responses, Some(&survey));
        for q in survey.questions() {
            for o in q.options.keys() {
                assert!(table.count(&q.id, o) >= 1);
            }
        }
        let q1 = survey.questions().next().unwrap();
        let a = &q1.options_by_index().unwrap()[0].id;
        assert_eq!(table.count(&q1.id, a), 2);
    }

    #[test]
    fn unsmoothed_counts_only_observations() {
        let survey = two_question_survey();
        let responses = vec![respond(&survey, &[0, 1]), respond(&survey, &[0, 0])];
        let table = FrequencyTable::build(&responses, None);
        let q1 = survey.questions().next().unwrap();
        let opts = q1.options_by_index().unwrap();
        assert_eq!(table.count(&q1.id, &opts[0].id), 2);
        assert_eq!(table.count(&q1.id, &opts[1].id), 0);
        assert_eq!(table.question_total(&q1.id), 2);
    }

    #[test]
    fn log_likelihood_and_entropy_of_uniform_fit() {
        let survey = two_question_survey();
        let responses = vec![respond(&survey, &[0, 0]), respond(&survey, &[1, 1])];
        let probs = ProbabilityTable::fit(&responses, None);

        // Every pair has p = 0.5.
        let ll = probs.log_likelihood(&responses[0]).unwrap();
        assert!((ll + 2.0).abs() < 1e-12);
        let ent = probs.entropy(&responses[0]).unwrap();
        assert!((ent - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unobserved_pair_is_zero_probability() {
        let survey = two_question_survey();
        let fitted = vec![respond(&survey, &[0, 0])];
        let probs = ProbabilityTable::fit(&fitted, None);
        let err = probs.log_likelihood(&respond(&survey, &[1, 0])).unwrap_err();
        assert!(matches!(err, StatsError::ZeroProbability { .. }));
    }

    #[test]
    fn all_block_variants_match_by_offset() {
        let mut builder = SurveyBuilder::new("variants");
        let b1 = builder.add_block(false);
        builder.set_paradigm(&b1, BranchParadigm::All);
        let v1 = builder.add_question(&b1, QuestionSpec::radio("V1", &["yes", "no"]));
        builder.add_question(&b1, QuestionSpec::radio("V2", &["yes", "no"]));
        let survey = builder.build().unwrap();

        let q = survey.question(&v1).unwrap();
        let first = &q.options_by_index().unwrap()[0].id;
        let class = equivalent_answer_variants(&survey, q, first);
        assert_eq!(class.len(), 2);
    }

    #[test]
    fn plain_question_is_its_own_class() {
        let survey = two_question_survey();
        let q = survey.questions().next().unwrap();
        let o = &q.options_by_index().unwrap()[1].id;
        assert_eq!(equivalent_answer_variants(&survey, q, o), vec![o]);
    }

    #[test]
    fn survey_entropy_of_split_answers() {
        let survey = two_question_survey();
        let paths = PathEnumerator::new(&survey).paths().unwrap();
        let responses = vec![respond(&survey, &[0, 0]), respond(&survey, &[1, 1])];
        // Four classes with p = 0.5 each on the single path.
        let h = survey_entropy(&survey, &paths, &responses);
        assert!((h - 2.0).abs() < 1e-12);
    }

    #[test]
    fn survey_entropy_of_nothing_is_zero() {
        let survey = two_question_survey();
        let paths = PathEnumerator::new(&survey).paths().unwrap();
        assert_eq!(survey_entropy::<SurveyResponse>(&survey, &paths, &[]), 0.0);
    }
}
