//! Path enumeration over the block structure.
//!
//! A path is the ordered list of top-level blocks a respondent can traverse
//! from the start of the survey to an exit. Fixed-order blocks are walked in
//! id order; a block holding a branch question fans out over its distinct
//! destinations and continues from each of them. Randomizable top-level
//! blocks never influence branching, so they are appended to every path
//! instead of being combined into it.
//!
//! Enumeration is exponential in the depth of chained branches. The
//! [`PathLimits`] cap turns runaway inputs into a [`PathError::LimitExceeded`]
//! carrying the paths found so far.

use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::respondent::{RespondentStrategy, SimulationError, UniformRespondent};
use crate::response::AnswerSet;
use crate::survey::{Block, BlockId, Question, StructuralError, Survey};

/// Number of uniform walks behind the average path length estimate.
pub const AVERAGE_LENGTH_WALKS: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathLimits {
    /// Maximum number of fixed-block paths to materialize.
    pub max_paths: usize,
    /// Maximum number of chained branch fan-outs along one path.
    pub max_branch_depth: usize,
}

impl Default for PathLimits {
    fn default() -> Self {
        Self {
            max_paths: 100_000,
            max_branch_depth: 64,
        }
    }
}

/// Which cap stopped the enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathLimit {
    PathCount(usize),
    BranchDepth(usize),
}

impl fmt::Display for PathLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathLimit::PathCount(n) => write!(f, "more than {n} paths"),
            PathLimit::BranchDepth(n) => write!(f, "branch depth above {n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    #[error("path enumeration stopped at {limit} ({} partial paths)", .partial.len())]
    LimitExceeded {
        limit: PathLimit,
        partial: Vec<SurveyPath>,
    },
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

/// Ordered top-level blocks of one traversal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurveyPath {
    blocks: Vec<BlockId>,
}

impl SurveyPath {
    pub fn new(blocks: Vec<BlockId>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn contains(&self, block: &BlockId) -> bool {
        self.blocks.contains(block)
    }
}

/// Summary of the traversal space, as reported alongside ROC results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStatistics {
    pub path_count: usize,
    pub min_path_length: usize,
    pub max_path_length: usize,
    pub average_path_length: f64,
    pub max_possible_entropy: f64,
}

enum Stop {
    Limit(PathLimit),
    Structural(StructuralError),
}

pub struct PathEnumerator<'a> {
    survey: &'a Survey,
    limits: PathLimits,
}

impl<'a> PathEnumerator<'a> {
    pub fn new(survey: &'a Survey) -> Self {
        Self::with_limits(survey, PathLimits::default())
    }

    pub fn with_limits(survey: &'a Survey, limits: PathLimits) -> Self {
        Self { survey, limits }
    }

    /// All traversal paths. Duplicates are kept; empty paths are dropped.
    pub fn paths(&self) -> Result<Vec<SurveyPath>, PathError> {
        let (fixed, randomizable) = self.survey.partition_top_level();
        let tail: Vec<BlockId> = randomizable.iter().map(|b| b.id.clone()).collect();

        let mut prefix = Vec::new();
        let mut found = Vec::new();
        let outcome = self.extract(&fixed, 0, &mut prefix, &mut found);
        log::info!(
            "computed {} paths through {} fixed-order blocks",
            found.len(),
            fixed.len()
        );

        let paths: Vec<SurveyPath> = found
            .into_iter()
            .map(|mut blocks| {
                blocks.extend(tail.iter().cloned());
                SurveyPath::new(blocks)
            })
            .filter(|p| !p.is_empty())
            .collect();

        match outcome {
            Ok(()) => Ok(paths),
            Err(Stop::Limit(limit)) => Err(PathError::LimitExceeded {
                limit,
                partial: paths,
            }),
            Err(Stop::Structural(e)) => Err(PathError::Structural(e)),
        }
    }

    fn extract(
        &self,
        blocks: &[&Block],
        branch_depth: usize,
        prefix: &mut Vec<BlockId>,
        out: &mut Vec<Vec<BlockId>>,
    ) -> Result<(), Stop> {
        let Some(head) = blocks.first() else {
            if out.len() >= self.limits.max_paths {
                return Err(Stop::Limit(PathLimit::PathCount(self.limits.max_paths)));
            }
            out.push(prefix.clone());
            return Ok(());
        };

        prefix.push(head.id.clone());
        let result = match self.survey.branch_question(head) {
            None => self.extract(&blocks[1..], branch_depth, prefix, out),
            Some(_) if branch_depth >= self.limits.max_branch_depth => Err(Stop::Limit(
                PathLimit::BranchDepth(self.limits.max_branch_depth),
            )),
            Some(question) => question
                .branch_destinations()
                .into_iter()
                .try_for_each(|dest| match blocks.iter().position(|b| &b.id == dest) {
                    Some(start) if start > 0 => {
                        self.extract(&blocks[start..], branch_depth + 1, prefix, out)
                    }
                    _ => Err(Stop::Structural(missing_destination(question, dest))),
                }),
        };
        prefix.pop();
        result
    }

    /// Questions a respondent sees along `path`.
    ///
    /// ALL blocks contribute one question drawn from `rng`, so repeated calls
    /// on the same path may differ.
    pub fn path_questions(&self, path: &SurveyPath, rng: &mut StdRng) -> Vec<&'a Question> {
        let mut questions = Vec::new();
        for id in path.blocks() {
            if let Some(block) = self.survey.block(id) {
                self.collect_questions(block, rng, &mut questions);
            }
        }
        questions
    }

    fn collect_questions(&self, block: &'a Block, rng: &mut StdRng, out: &mut Vec<&'a Question>) {
        if block.is_all() {
            let candidates: Vec<&'a Question> = self.survey.block_questions(block).collect();
            out.extend(candidates.choose(rng).copied());
        } else {
            out.extend(self.survey.block_questions(block));
        }
        for sub in self.survey.sub_blocks(block) {
            self.collect_questions(sub, rng, out);
        }
    }

    /// Fewest questions on any path; 0 for a survey without paths.
    pub fn min_path_length(&self, rng: &mut StdRng) -> Result<usize, PathError> {
        let lengths = self.path_lengths(rng)?;
        Ok(lengths.into_iter().min().unwrap_or(0))
    }

    pub fn max_path_length(&self, rng: &mut StdRng) -> Result<usize, PathError> {
        let lengths = self.path_lengths(rng)?;
        Ok(lengths.into_iter().max().unwrap_or(0))
    }

    fn path_lengths(&self, rng: &mut StdRng) -> Result<Vec<usize>, PathError> {
        Ok(self
            .paths()?
            .iter()
            .map(|p| self.path_questions(p, rng).len())
            .collect())
    }

    /// Entropy, in bits, of the path whose questions carry the most
    /// information: max over paths of the sum of `log2(option_count)`.
    pub fn max_possible_entropy(&self, rng: &mut StdRng) -> Result<f64, PathError> {
        Ok(self
            .paths()?
            .iter()
            .map(|p| {
                self.path_questions(p, rng)
                    .iter()
                    .map(|q| q.max_entropy())
                    .sum::<f64>()
            })
            .fold(0.0, f64::max))
    }

    /// Monte-Carlo estimate of the mean number of answered questions over
    /// `walks` uniform-random respondents.
    pub fn average_path_length(&self, rng: &mut StdRng, walks: usize) -> Result<f64, SimulationError> {
        if walks == 0 {
            return Ok(0.0);
        }
        let bot = UniformRespondent::new();
        let mut answered = 0usize;
        for _ in 0..walks {
            answered += bot.respond(self.survey, rng)?.answers().count();
        }
        Ok(answered as f64 / walks as f64)
    }

    /// Every path statistic in one pass over the enumerated paths.
    pub fn statistics(&self, rng: &mut StdRng, walks: usize) -> Result<PathStatistics, PathError> {
        let paths = self.paths()?;
        self.statistics_for(&paths, rng, walks)
    }

    /// [`statistics`](Self::statistics) over paths the caller already enumerated.
    pub fn statistics_for(
        &self,
        paths: &[SurveyPath],
        rng: &mut StdRng,
        walks: usize,
    ) -> Result<PathStatistics, PathError> {
        let mut min = usize::MAX;
        let mut max = 0;
        let mut max_entropy: f64 = 0.0;
        for path in paths {
            let questions = self.path_questions(path, rng);
            min = min.min(questions.len());
            max = max.max(questions.len());
            max_entropy = max_entropy.max(questions.iter().map(|q| q.max_entropy()).sum());
        }
        if paths.is_empty() {
            min = 0;
        }
        Ok(PathStatistics {
            path_count: paths.len(),
            min_path_length: min,
            max_path_length: max,
            average_path_length: self.average_path_length(rng, walks)?,
            max_possible_entropy: max_entropy,
        })
    }
}

fn missing_destination(question: &Question, dest: &BlockId) -> StructuralError {
    let option = question
        .branch_map
        .iter()
        .find(|(_, d)| *d == dest)
        .map(|(o, _)| o.clone())
        .unwrap_or_else(|| crate::survey::OptionId::new("?"));
    StructuralError::MissingBranchDestination {
        question: question.id.clone(),
        option,
        destination: dest.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::{BranchParadigm, QuestionSpec, SurveyBuilder};
    use rand::SeedableRng;

    fn ids(paths: &[SurveyPath]) -> Vec<Vec<u32>> {
        paths
            .iter()
            .map(|p| p.blocks().iter().map(|b| b.0[0]).collect())
            .collect()
    }

    fn flat_survey() -> Survey {
        let mut builder = SurveyBuilder::new("flat");
        let b1 = builder.add_block(false);
        let b2 = builder.add_block(false);
        builder.add_question(&b1, QuestionSpec::radio("Q1", &["A", "B"]));
        builder.add_question(&b2, QuestionSpec::radio("Q2", &["C", "D"]));
        builder.build().unwrap()
    }

    /// Block 1 branches to 2 or 3; block 3 follows 2 in id order.
    fn branch_survey() -> Survey {
        let mut builder = SurveyBuilder::new("branch");
        let b1 = builder.add_block(false);
        let b2 = builder.add_block(false);
        let b3 = builder.add_block(false);
        let q = builder.add_question(&b1, QuestionSpec::radio("Q", &["x", "y"]));
        builder.add_question(&b2, QuestionSpec::radio("Q2", &["a", "b"]));
        builder.add_question(&b3, QuestionSpec::radio("Q3", &["c", "d"]));
        builder.set_branch(&q, 0, b2);
        builder.set_branch(&q, 1, b3);
        builder.build().unwrap()
    }

    #[test]
    fn no_branches_yields_one_path() {
        let survey = flat_survey();
        let paths = PathEnumerator::new(&survey).paths().unwrap();
        assert_eq!(ids(&paths), vec![vec![1, 2]]);
    }

    #[test]
    fn branch_fans_out_from_each_destination() {
        let survey = branch_survey();
        let paths = PathEnumerator::new(&survey).paths().unwrap();
        // Destination 2 continues through 3 because 3 follows it in order.
        assert_eq!(ids(&paths), vec![vec![1, 2, 3], vec![1, 3]]);
    }

    #[test]
    fn randomizable_blocks_are_appended() {
        let mut builder = SurveyBuilder::new("rand");
        let r = builder.add_block(true);
        let b2 = builder.add_block(false);
        builder.add_question(&r, QuestionSpec::radio("R", &["a", "b"]));
        builder.add_question(&b2, QuestionSpec::radio("F", &["a", "b"]));
        let survey = builder.build().unwrap();

        let paths = PathEnumerator::new(&survey).paths().unwrap();
        assert_eq!(ids(&paths), vec![vec![2, 1]]);
    }

    #[test]
    fn only_randomizable_blocks_still_form_a_path() {
        let mut builder = SurveyBuilder::new("rand-only");
        let r = builder.add_block(true);
        builder.add_question(&r, QuestionSpec::radio("R", &["a", "b"]));
        let survey = builder.build().unwrap();
        assert_eq!(PathEnumerator::new(&survey).paths().unwrap().len(), 1);
    }

    #[test]
    fn empty_survey_has_no_paths() {
        let survey = SurveyBuilder::new("empty").build().unwrap();
        let enumerator = PathEnumerator::new(&survey);
        assert!(enumerator.paths().unwrap().is_empty());
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(enumerator.min_path_length(&mut rng).unwrap(), 0);
    }

    #[test]
    fn path_count_cap_reports_partial_result() {
        let survey = branch_survey();
        let limits = PathLimits {
            max_paths: 1,
            max_branch_depth: 8,
        };
        match PathEnumerator::with_limits(&survey, limits).paths() {
            Err(PathError::LimitExceeded { limit, partial }) => {
                assert_eq!(limit, PathLimit::PathCount(1));
                assert_eq!(partial.len(), 1);
            }
            other => panic!("expected limit error, got {other:?}"),
        }
    }

    #[test]
    fn branch_depth_cap() {
        let survey = branch_survey();
        let limits = PathLimits {
            max_paths: 100,
            max_branch_depth: 0,
        };
        assert!(matches!(
            PathEnumerator::with_limits(&survey, limits).paths(),
            Err(PathError::LimitExceeded {
                limit: PathLimit::BranchDepth(0),
                ..
            })
        ));
    }

    #[test]
    fn two_binary_questions_have_two_bits() {
        let survey = flat_survey();
        let enumerator = PathEnumerator::new(&survey);
        let mut rng = StdRng::seed_from_u64(1);
        assert!((enumerator.max_possible_entropy(&mut rng).unwrap() - 2.0).abs() < 1e-12);
        assert_eq!(enumerator.min_path_length(&mut rng).unwrap(), 2);
        assert_eq!(enumerator.max_path_length(&mut rng).unwrap(), 2);
        let avg = enumerator.average_path_length(&mut rng, 200).unwrap();
        assert!((avg - 2.0).abs() < 1e-12);
    }

    #[test]
    fn all_block_counts_as_one_question() {
        let mut builder = SurveyBuilder::new("all");
        let b1 = builder.add_block(false);
        builder.set_paradigm(&b1, BranchParadigm::All);
        builder.add_question(&b1, QuestionSpec::radio("V1", &["a", "b"]));
        builder.add_question(&b1, QuestionSpec::radio("V2", &["a", "b", "c", "d"]));
        let survey = builder.build().unwrap();

        let mut rng = StdRng::seed_from_u64(4);
        let stats = PathEnumerator::new(&survey).statistics(&mut rng, 100).unwrap();
        assert_eq!(stats.min_path_length, 1);
        assert_eq!(stats.max_path_length, 1);
        assert!(stats.max_possible_entropy == 1.0 || stats.max_possible_entropy == 2.0);
    }

    #[test]
    fn branch_survey_statistics() {
        let survey = branch_survey();
        let mut rng = StdRng::seed_from_u64(8);
        let stats = PathEnumerator::new(&survey).statistics(&mut rng, 500).unwrap();
        assert_eq!(stats.path_count, 2);
        assert_eq!(stats.min_path_length, 2);
        assert_eq!(stats.max_path_length, 3);
        // The walk jumps over block 2 or not with even odds.
        assert!(stats.average_path_length > 2.2 && stats.average_path_length < 2.8);
    }

    #[test]
    fn statistics_over_given_paths_match() {
        let survey = branch_survey();
        let enumerator = PathEnumerator::new(&survey);
        let paths = enumerator.paths().unwrap();

        let direct = enumerator
            .statistics(&mut StdRng::seed_from_u64(8), 200)
            .unwrap();
        let reused = enumerator
            .statistics_for(&paths, &mut StdRng::seed_from_u64(8), 200)
            .unwrap();
        assert_eq!(direct, reused);

        let first_only = enumerator
            .statistics_for(&paths[..1], &mut StdRng::seed_from_u64(8), 200)
            .unwrap();
        assert_eq!(first_only.path_count, 1);
        assert_eq!(first_only.max_path_length, 3);
    }
}
