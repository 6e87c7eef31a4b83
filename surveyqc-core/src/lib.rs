//! SurveyQC Core: survey model, path enumeration, respondent simulation and
//! response quality classification.
//!
//! This crate contains the analysis engine:
//! - Block/question/option model with structural validation
//! - Path enumeration over branching blocks, with configurable caps
//! - Uniform-random and biased-profile synthetic respondents
//! - Frequency and probability tables, log-likelihood and entropy scores
//! - Bootstrap classifiers deciding whether a response looks legitimate

pub mod classifier;
pub mod paths;
pub mod respondent;
pub mod response;
pub mod rng;
pub mod stats;
pub mod survey;

pub use classifier::{bootstrap_threshold, Classification, Classifier, ClassifyParams, Outcome};
pub use paths::{PathEnumerator, PathError, PathLimits, PathStatistics, SurveyPath};
pub use respondent::{ProfileRespondent, RespondentStrategy, SimulationError, UniformRespondent};
pub use response::{AnswerSet, QuestionResponse, QuestionSet, SurveyResponse, ValidityStatus};
pub use rng::RngHierarchy;
pub use stats::{FrequencyTable, ProbabilityTable, StatsError};
pub use survey::{StructuralError, Survey, SurveyBuilder};
