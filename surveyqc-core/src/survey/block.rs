use serde::{Deserialize, Serialize};

use super::ids::{BlockId, QuestionId};

/// How a block participates in branching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BranchParadigm {
    /// No branch question.
    #[default]
    None,
    /// At most one branch question decides the next block.
    One,
    /// Exactly one question, chosen uniformly at random, is shown per traversal.
    All,
}

/// A node in the survey's block tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    /// Questions owned directly by this block, in presentation order.
    pub questions: Vec<QuestionId>,
    /// Nested blocks, ascending by id.
    pub sub_blocks: Vec<BlockId>,
    /// Randomizable blocks float; fixed-order blocks follow id order.
    pub randomize: bool,
    pub paradigm: BranchParadigm,
}

impl Block {
    pub fn new(id: BlockId) -> Self {
        Self {
            id,
            questions: Vec::new(),
            sub_blocks: Vec::new(),
            randomize: false,
            paradigm: BranchParadigm::None,
        }
    }

    pub fn is_all(&self) -> bool {
        self.paradigm == BranchParadigm::All
    }
}
