//! Survey responses and read-only projections of them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::survey::{OptionId, QuestionId};

/// Ground-truth label, used only when evaluating a classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidityStatus {
    Valid,
    Invalid,
    Unresolved,
}

/// The answer to one question. Freetext answers select no options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub question: QuestionId,
    pub options: Vec<OptionId>,
    /// Position in the order the respondent saw the questions.
    pub position: usize,
}

/// Read access to a set of answers.
pub trait AnswerSet {
    fn answers(&self) -> impl Iterator<Item = &QuestionResponse>;

    fn answered_questions(&self) -> BTreeSet<&QuestionId> {
        self.answers().map(|a| &a.question).collect()
    }

    /// True if any answer selects one of `options`.
    fn contains_any(&self, options: &[&OptionId]) -> bool {
        self.answers()
            .any(|a| a.options.iter().any(|o| options.contains(&o)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyResponse {
    id: String,
    answers: Vec<QuestionResponse>,
    validity: ValidityStatus,
    score: Option<f64>,
    threshold: Option<f64>,
}

impl SurveyResponse {
    pub fn new(id: impl Into<String>, answers: Vec<QuestionResponse>, validity: ValidityStatus) -> Self {
        Self {
            id: id.into(),
            answers,
            validity,
            score: None,
            threshold: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn validity(&self) -> ValidityStatus {
        self.validity
    }

    pub fn set_validity(&mut self, validity: ValidityStatus) {
        self.validity = validity;
    }

    /// Score from the most recent classification.
    pub fn score(&self) -> Option<f64> {
        self.score
    }

    /// Threshold from the most recent classification; `None` when the
    /// classifier fell back without testing.
    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    pub fn record_score(&mut self, score: f64, threshold: Option<f64>) {
        self.score = Some(score);
        self.threshold = threshold;
    }
}

impl AnswerSet for SurveyResponse {
    fn answers(&self) -> impl Iterator<Item = &QuestionResponse> {
        self.answers.iter()
    }
}

/// The set of questions a target response answered.
///
/// Used to project a comparison population onto exactly those questions so
/// that scores become comparable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSet(BTreeSet<QuestionId>);

impl QuestionSet {
    pub fn of(response: &impl AnswerSet) -> Self {
        Self(response.answered_questions().into_iter().cloned().collect())
    }

    pub fn contains(&self, question: &QuestionId) -> bool {
        self.0.contains(question)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keeps the responses that answered at least every question in this set,
    /// each restricted to exactly those questions.
    pub fn truncate<'a>(&'a self, population: &'a [SurveyResponse]) -> Vec<TruncatedResponse<'a>> {
        population
            .iter()
            .filter(|r| {
                let answered = r.answered_questions();
                self.0.iter().all(|q| answered.contains(q))
            })
            .map(|source| TruncatedResponse {
                source,
                retained: self,
            })
            .collect()
    }
}

/// Immutable view of a response restricted to a question set.
#[derive(Debug, Clone, Copy)]
pub struct TruncatedResponse<'a> {
    source: &'a SurveyResponse,
    retained: &'a QuestionSet,
}

impl<'a> TruncatedResponse<'a> {
    pub fn source(&self) -> &'a SurveyResponse {
        self.source
    }

    pub fn validity(&self) -> ValidityStatus {
        self.source.validity
    }
}

impl AnswerSet for TruncatedResponse<'_> {
    fn answers(&self) -> impl Iterator<Item = &QuestionResponse> {
        self.source
            .answers
            .iter()
            .filter(move |a| self.retained.contains(&a.question))
    }
}
