use thiserror::Error;

use super::ids::{BlockId, OptionId, QuestionId};

/// Fatal defects in a survey definition. Analysis aborts on any of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructuralError {
    #[error("question {question}: options {first} and {second} share index {index}")]
    DuplicateOptionIndex {
        question: QuestionId,
        first: OptionId,
        second: OptionId,
        index: usize,
    },
    #[error("question {question}: option {option} has index {index}, max is {max}")]
    OptionIndexOutOfRange {
        question: QuestionId,
        option: OptionId,
        index: usize,
        max: usize,
    },
    #[error("question {question}: option {option} defined more than once")]
    DuplicateOption { question: QuestionId, option: OptionId },
    #[error("question {0} defined more than once")]
    DuplicateQuestion(QuestionId),
    #[error("block {0} defined more than once")]
    DuplicateBlock(BlockId),
    #[error("block {block} references unknown question {question}")]
    UnknownQuestion { block: BlockId, question: QuestionId },
    #[error("question {question} belongs to unknown block {block}")]
    UnknownBlock { question: QuestionId, block: BlockId },
    #[error("block {parent} lists unknown sub-block {child}")]
    UnknownSubBlock { parent: BlockId, child: BlockId },
    #[error("block {child} is not nested under its parent {parent}")]
    NotNested { parent: BlockId, child: BlockId },
    #[error("question {question}: option {option} branches to missing block {destination}")]
    MissingBranchDestination {
        question: QuestionId,
        option: OptionId,
        destination: BlockId,
    },
    #[error("question {question}: branch map references unknown option {option}")]
    UnknownBranchOption { question: QuestionId, option: OptionId },
    #[error(
        "question {question} in block {source_block} branches to {destination}, \
         which is not a later fixed-order top-level block"
    )]
    InvalidBranchTarget {
        question: QuestionId,
        source_block: BlockId,
        destination: BlockId,
    },
    #[error("branch question {question}: option {option} has no destination")]
    IncompleteBranchMap { question: QuestionId, option: OptionId },
    #[error("branch question {question} sits in randomizable block {block}")]
    BranchFromRandomizable { question: QuestionId, block: BlockId },
    #[error("branch question {question} cannot belong to ALL block {block}")]
    BranchInAllBlock { question: QuestionId, block: BlockId },
    #[error("block {block} has more than one branch question ({first}, {second})")]
    MultipleBranchQuestions {
        block: BlockId,
        first: QuestionId,
        second: QuestionId,
    },
    #[error("block {0} uses the ALL paradigm but has no questions")]
    EmptyAllBlock(BlockId),
}
