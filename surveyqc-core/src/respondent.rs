//! Synthetic respondents.
//!
//! A respondent walks the survey from the first fixed-order block, answers
//! each question it is shown, follows branch answers to their destination
//! block, and finally visits every randomizable top-level block in shuffled
//! order. Strategies only differ in how they pick an option.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::response::{QuestionResponse, SurveyResponse, ValidityStatus};
use crate::survey::{Block, BlockId, OptionId, Question, QuestionId, StructuralError, Survey};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error("respondent gave no answer to branch question {0}")]
    UnansweredBranch(QuestionId),
}

/// Option-selection strategy of a synthetic respondent.
pub trait RespondentStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Ground-truth label attached to every response this strategy produces.
    fn label(&self) -> ValidityStatus;

    /// Chance of stopping at a question that permits breakoff.
    fn breakoff_probability(&self) -> f64 {
        0.0
    }

    /// Picks an option for a question that has options.
    fn choose(&self, question: &Question, rng: &mut StdRng) -> Option<OptionId>;

    /// Produces one complete response.
    fn respond(&self, survey: &Survey, rng: &mut StdRng) -> Result<SurveyResponse, SimulationError> {
        walk(survey, self, rng)
    }
}

/// Adversary answering every question independently and uniformly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformRespondent {
    breakoff: f64,
}

impl UniformRespondent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_breakoff(breakoff: f64) -> Self {
        Self { breakoff }
    }
}

impl RespondentStrategy for UniformRespondent {
    fn name(&self) -> &'static str {
        "uniform"
    }

    fn label(&self) -> ValidityStatus {
        ValidityStatus::Invalid
    }

    fn breakoff_probability(&self) -> f64 {
        self.breakoff
    }

    fn choose(&self, question: &Question, rng: &mut StdRng) -> Option<OptionId> {
        let n = question.options.len();
        if n == 0 {
            return None;
        }
        question.options.keys().nth(rng.gen_range(0..n)).cloned()
    }
}

/// A "real respondent" profile with fixed per-question preferences.
///
/// Every response drawn from one instance shares the same preferences, which
/// is what makes a simulated population look coherent. Build one profile per
/// population, not one per response.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRespondent {
    preferences: BTreeMap<QuestionId, OptionId>,
    bias: f64,
    breakoff: f64,
}

impl ProfileRespondent {
    pub const DEFAULT_BIAS: f64 = 0.75;

    /// Draws a preferred option for every question with options. `bias` is
    /// the probability of answering with the preferred option.
    pub fn new(survey: &Survey, bias: f64, rng: &mut StdRng) -> Self {
        let preferences = survey
            .questions()
            .filter(|q| !q.freetext && !q.options.is_empty())
            .filter_map(|q| {
                let n = q.options.len();
                q.options
                    .keys()
                    .nth(rng.gen_range(0..n))
                    .map(|o| (q.id.clone(), o.clone()))
            })
            .collect();
        Self {
            preferences,
            bias,
            breakoff: 0.0,
        }
    }

    pub fn with_breakoff(mut self, breakoff: f64) -> Self {
        self.breakoff = breakoff;
        self
    }

    pub fn preference(&self, question: &QuestionId) -> Option<&OptionId> {
        self.preferences.get(question)
    }
}

impl RespondentStrategy for ProfileRespondent {
    fn name(&self) -> &'static str {
        "profile"
    }

    fn label(&self) -> ValidityStatus {
        ValidityStatus::Valid
    }

    fn breakoff_probability(&self) -> f64 {
        self.breakoff
    }

    fn choose(&self, question: &Question, rng: &mut StdRng) -> Option<OptionId> {
        let n = question.options.len();
        if n == 0 {
            return None;
        }
        let Some(preferred) = self.preferences.get(&question.id) else {
            return question.options.keys().nth(rng.gen_range(0..n)).cloned();
        };
        if n == 1 || rng.gen::<f64>() < self.bias {
            return Some(preferred.clone());
        }
        let others: Vec<&OptionId> = question.options.keys().filter(|o| *o != preferred).collect();
        others.choose(rng).map(|o| (*o).clone())
    }
}

enum Visit {
    Continue,
    Jump {
        question: QuestionId,
        option: OptionId,
        destination: BlockId,
    },
    BrokeOff,
}

fn walk<S: RespondentStrategy + ?Sized>(
    survey: &Survey,
    strategy: &S,
    rng: &mut StdRng,
) -> Result<SurveyResponse, SimulationError> {
    let id = format!("{}-{:016x}", strategy.name(), rng.gen::<u64>());
    let (fixed, mut randomizable) = survey.partition_top_level();
    randomizable.shuffle(rng);

    let mut answers = Vec::new();
    let mut i = 0;
    while i < fixed.len() {
        match visit(survey, fixed[i], strategy, rng, &mut answers)? {
            Visit::Continue => i += 1,
            Visit::BrokeOff => return Ok(SurveyResponse::new(id, answers, strategy.label())),
            Visit::Jump {
                question,
                option,
                destination,
            } => {
                i = fixed
                    .iter()
                    .skip(i + 1)
                    .position(|b| b.id == destination)
                    .map(|offset| i + 1 + offset)
                    .ok_or(StructuralError::MissingBranchDestination {
                        question,
                        option,
                        destination,
                    })?;
            }
        }
    }
    for block in randomizable {
        if let Visit::BrokeOff = visit(survey, block, strategy, rng, &mut answers)? {
            break;
        }
    }
    Ok(SurveyResponse::new(id, answers, strategy.label()))
}

fn visit<S: RespondentStrategy + ?Sized>(
    survey: &Survey,
    block: &Block,
    strategy: &S,
    rng: &mut StdRng,
    answers: &mut Vec<QuestionResponse>,
) -> Result<Visit, SimulationError> {
    let shown: Vec<&Question> = if block.is_all() {
        let all: Vec<&Question> = survey.block_questions(block).collect();
        all.choose(rng).copied().into_iter().collect()
    } else {
        survey.block_questions(block).collect()
    };

    let breakoff = strategy.breakoff_probability();
    let mut pending = Visit::Continue;
    for question in shown {
        let branching = question.is_branch_question();
        if !branching && question.permit_breakoff && breakoff > 0.0 && rng.gen::<f64>() < breakoff {
            return Ok(Visit::BrokeOff);
        }
        let choice = if question.freetext {
            None
        } else {
            strategy.choose(question, rng)
        };
        if branching {
            let option = choice
                .clone()
                .ok_or_else(|| SimulationError::UnansweredBranch(question.id.clone()))?;
            if let Some(destination) = question.branch_destination(&option) {
                pending = Visit::Jump {
                    question: question.id.clone(),
                    option,
                    destination: destination.clone(),
                };
            }
        }
        answers.push(QuestionResponse {
            question: question.id.clone(),
            options: choice.into_iter().collect(),
            position: answers.len(),
        });
    }

    for sub in survey.sub_blocks(block) {
        match visit(survey, sub, strategy, rng, answers)? {
            Visit::BrokeOff => return Ok(Visit::BrokeOff),
            Visit::Continue => {}
            jump => pending = jump,
        }
    }
    Ok(pending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::AnswerSet;
    use crate::survey::{BranchParadigm, QuestionSpec, SurveyBuilder};
    use rand::SeedableRng;

    fn branching_survey() -> Survey {
        let mut builder = SurveyBuilder::new("branching");
        let b1 = builder.add_block(false);
        let b2 = builder.add_block(false);
        let b3 = builder.add_block(false);
        let q = builder.add_question(&b1, QuestionSpec::radio("Pick", &["left", "right"]));
        builder.add_question(&b2, QuestionSpec::radio("L", &["a", "b"]));
        builder.add_question(&b3, QuestionSpec::radio("R", &["c", "d"]));
        builder.set_branch(&q, 0, b2);
        builder.set_branch(&q, 1, b3);
        builder.build().unwrap()
    }

    #[test]
    fn uniform_response_is_invalid_and_complete() {
        let mut builder = SurveyBuilder::new("flat");
        let b1 = builder.add_block(false);
        builder.add_question(&b1, QuestionSpec::radio("Q1", &["A", "B"]));
        builder.add_question(&b1, QuestionSpec::freetext("Why?"));
        let survey = builder.build().unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let r = UniformRespondent::new().respond(&survey, &mut rng).unwrap();
        assert_eq!(r.validity(), ValidityStatus::Invalid);
        assert_eq!(r.len(), 2);
        let freetext = r.answers().nth(1).unwrap();
        assert!(freetext.options.is_empty());
    }

    #[test]
    fn branch_answer_follows_an_enumerated_path() {
        let survey = branching_survey();
        let paths = crate::paths::PathEnumerator::new(&survey).paths().unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..50 {
            let r = UniformRespondent::new().respond(&survey, &mut rng).unwrap();
            assert!(matches!(r.len(), 2 | 3), "answered {} questions", r.len());

            let visited: Vec<BlockId> = r
                .answers()
                .filter_map(|a| survey.question(&a.question))
                .map(|q| q.block.clone())
                .collect();
            let index = paths
                .iter()
                .position(|p| p.blocks() == visited.as_slice())
                .unwrap_or_else(|| panic!("{visited:?} is not an enumerated path"));
            seen.insert(index);
        }
        assert_eq!(seen.len(), paths.len());
    }

    #[test]
    fn profile_is_biased_toward_preference() {
        let survey = branching_survey();
        let mut rng = StdRng::seed_from_u64(3);
        let profile = ProfileRespondent::new(&survey, 0.9, &mut rng);
        let first = survey.questions().next().unwrap();
        let preferred = profile.preference(&first.id).unwrap().clone();

        let hits = (0..200)
            .filter(|_| profile.choose(first, &mut rng).as_ref() == Some(&preferred))
            .count();
        assert!(hits > 150, "expected strong bias, got {hits}/200");
        assert_eq!(profile.label(), ValidityStatus::Valid);
    }

    #[test]
    fn all_block_shows_one_question() {
        let mut builder = SurveyBuilder::new("all");
        let b1 = builder.add_block(false);
        builder.set_paradigm(&b1, BranchParadigm::All);
        builder.add_question(&b1, QuestionSpec::radio("V1", &["a", "b"]));
        builder.add_question(&b1, QuestionSpec::radio("V2", &["a", "b"]));
        let survey = builder.build().unwrap();

        let mut rng = StdRng::seed_from_u64(5);
        let r = UniformRespondent::new().respond(&survey, &mut rng).unwrap();
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn required_questions_are_never_skipped() {
        let mut builder = SurveyBuilder::new("required");
        let b1 = builder.add_block(false);
        builder.add_question(&b1, QuestionSpec::radio("Q1", &["a", "b"]).required());
        builder.add_question(&b1, QuestionSpec::radio("Q2", &["a", "b"]).required());
        let survey = builder.build().unwrap();

        let mut rng = StdRng::seed_from_u64(11);
        let bot = UniformRespondent::with_breakoff(0.99);
        for _ in 0..20 {
            assert_eq!(bot.respond(&survey, &mut rng).unwrap().len(), 2);
        }
    }

    #[test]
    fn breakoff_shortens_responses() {
        let mut builder = SurveyBuilder::new("breakoff");
        let b1 = builder.add_block(false);
        for i in 0..5 {
            builder.add_question(&b1, QuestionSpec::radio(format!("Q{i}"), &["a", "b"]));
        }
        let survey = builder.build().unwrap();

        let mut rng = StdRng::seed_from_u64(2);
        let bot = UniformRespondent::with_breakoff(0.5);
        let total: usize = (0..100)
            .map(|_| bot.respond(&survey, &mut rng).unwrap().len())
            .sum();
        assert!(total < 500);
    }
}
