//! Survey structure: blocks, questions, options and their validation.

pub mod block;
pub mod builder;
pub mod definition;
pub mod error;
pub mod ids;
pub mod question;

pub use block::{Block, BranchParadigm};
pub use builder::{QuestionSpec, RowCursor, SurveyBuilder};
pub use definition::{
    survey_from_json, BlockDefinition, DefinitionError, OptionDefinition, QuestionDefinition,
    SurveyDefinition,
};
pub use error::StructuralError;
pub use ids::{BlockId, OptionId, QuestionId};
pub use question::{Question, SurveyOption};

use std::collections::{BTreeMap, BTreeSet};

/// A validated survey.
///
/// Blocks live in a flat map keyed by their hierarchical id; nesting is
/// expressed through `Block::sub_blocks`. Construction through [`Survey::new`]
/// guarantees the structural invariants the analyses rely on.
#[derive(Debug, Clone)]
pub struct Survey {
    name: String,
    blocks: BTreeMap<BlockId, Block>,
    questions: BTreeMap<QuestionId, Question>,
    question_order: Vec<QuestionId>,
}

impl Survey {
    pub fn new(
        name: impl Into<String>,
        blocks: Vec<Block>,
        questions: Vec<Question>,
    ) -> Result<Self, StructuralError> {
        let mut block_map = BTreeMap::new();
        for block in blocks {
            if block_map.contains_key(&block.id) {
                return Err(StructuralError::DuplicateBlock(block.id));
            }
            block_map.insert(block.id.clone(), block);
        }

        let mut question_map = BTreeMap::new();
        let mut question_order = Vec::with_capacity(questions.len());
        for question in questions {
            if question_map.contains_key(&question.id) {
                return Err(StructuralError::DuplicateQuestion(question.id));
            }
            question_order.push(question.id.clone());
            question_map.insert(question.id.clone(), question);
        }

        let survey = Self {
            name: name.into(),
            blocks: block_map,
            questions: question_map,
            question_order,
        };
        survey.validate()?;
        Ok(survey)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.get(id)
    }

    /// All questions in definition order.
    pub fn questions(&self) -> impl Iterator<Item = &Question> + '_ {
        self.question_order
            .iter()
            .filter_map(move |id| self.questions.get(id))
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Top-level blocks, ascending by id.
    pub fn top_level_blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.blocks.values().filter(|b| b.id.is_top_level())
    }

    /// Splits top-level blocks into `(fixed_order, randomizable)`, each sorted by id.
    pub fn partition_top_level(&self) -> (Vec<&Block>, Vec<&Block>) {
        self.top_level_blocks().partition(|b| !b.randomize)
    }

    /// The top-level block enclosing `id` (itself if already top-level).
    pub fn top_level_ancestor(&self, id: &BlockId) -> Option<&Block> {
        let head = *id.0.first()?;
        self.blocks.get(&BlockId::top(head))
    }

    /// Questions owned directly by `block`, in presentation order.
    pub fn block_questions<'a>(&'a self, block: &'a Block) -> impl Iterator<Item = &'a Question> + 'a {
        block
            .questions
            .iter()
            .filter_map(move |id| self.questions.get(id))
    }

    /// Sub-blocks of `block`, ascending by id.
    pub fn sub_blocks<'a>(&'a self, block: &'a Block) -> impl Iterator<Item = &'a Block> + 'a {
        block
            .sub_blocks
            .iter()
            .filter_map(move |id| self.blocks.get(id))
    }

    /// The branch question of `block` or any of its descendants, if any.
    ///
    /// Validation guarantees there is at most one per top-level block.
    pub fn branch_question<'a>(&'a self, block: &'a Block) -> Option<&'a Question> {
        self.block_questions(block)
            .find(|q| q.is_branch_question())
            .or_else(|| self.sub_blocks(block).find_map(|b| self.branch_question(b)))
    }

    pub fn has_branch_question(&self, block: &Block) -> bool {
        self.branch_question(block).is_some()
    }

    /// Distinct branch destinations reachable from `block`, ascending.
    pub fn branch_destinations<'a>(&'a self, block: &'a Block) -> BTreeSet<&'a BlockId> {
        self.branch_question(block)
            .map(|q| q.branch_destinations())
            .unwrap_or_default()
    }

    fn validate(&self) -> Result<(), StructuralError> {
        for block in self.blocks.values() {
            self.validate_block(block)?;
        }
        for question in self.questions.values() {
            self.validate_question(question)?;
        }
        for top in self.top_level_blocks() {
            let mut found = Vec::new();
            self.collect_branch_questions(top, &mut found);
            if found.len() > 1 {
                return Err(StructuralError::MultipleBranchQuestions {
                    block: top.id.clone(),
                    first: found[0].id.clone(),
                    second: found[1].id.clone(),
                });
            }
        }
        Ok(())
    }

    fn validate_block(&self, block: &Block) -> Result<(), StructuralError> {
        for child in &block.sub_blocks {
            if !self.blocks.contains_key(child) {
                return Err(StructuralError::UnknownSubBlock {
                    parent: block.id.clone(),
                    child: child.clone(),
                });
            }
            if !(block.id.is_ancestor_of(child) && child.depth() == block.id.depth() + 1) {
                return Err(StructuralError::NotNested {
                    parent: block.id.clone(),
                    child: child.clone(),
                });
            }
        }
        if block.id.depth() == 0 {
            return Err(StructuralError::NotNested {
                parent: block.id.clone(),
                child: block.id.clone(),
            });
        }
        if !block.id.is_top_level() {
            let parent_id = BlockId::new(&block.id.0[..block.id.depth() - 1]);
            let listed = self
                .blocks
                .get(&parent_id)
                .is_some_and(|p| p.sub_blocks.contains(&block.id));
            if !listed {
                return Err(StructuralError::NotNested {
                    parent: parent_id,
                    child: block.id.clone(),
                });
            }
        }
        for qid in &block.questions {
            match self.questions.get(qid) {
                Some(q) if q.block == block.id => {}
                _ => {
                    return Err(StructuralError::UnknownQuestion {
                        block: block.id.clone(),
                        question: qid.clone(),
                    })
                }
            }
        }
        if block.is_all() && block.questions.is_empty() {
            return Err(StructuralError::EmptyAllBlock(block.id.clone()));
        }
        Ok(())
    }

    fn validate_question(&self, question: &Question) -> Result<(), StructuralError> {
        let Some(block) = self.blocks.get(&question.block) else {
            return Err(StructuralError::UnknownBlock {
                question: question.id.clone(),
                block: question.block.clone(),
            });
        };
        if !block.questions.contains(&question.id) {
            return Err(StructuralError::UnknownQuestion {
                block: block.id.clone(),
                question: question.id.clone(),
            });
        }
        question.options_by_index()?;

        if !question.is_branch_question() {
            return Ok(());
        }
        if block.is_all() {
            return Err(StructuralError::BranchInAllBlock {
                question: question.id.clone(),
                block: block.id.clone(),
            });
        }
        // Every block has a top-level ancestor once nesting is validated.
        let source_top = match self.top_level_ancestor(&block.id) {
            Some(top) => top,
            None => {
                return Err(StructuralError::UnknownBlock {
                    question: question.id.clone(),
                    block: block.id.clone(),
                })
            }
        };
        if source_top.randomize {
            return Err(StructuralError::BranchFromRandomizable {
                question: question.id.clone(),
                block: source_top.id.clone(),
            });
        }
        for (option, destination) in &question.branch_map {
            if !question.options.contains_key(option) {
                return Err(StructuralError::UnknownBranchOption {
                    question: question.id.clone(),
                    option: option.clone(),
                });
            }
            let Some(dest) = self.blocks.get(destination) else {
                return Err(StructuralError::MissingBranchDestination {
                    question: question.id.clone(),
                    option: option.clone(),
                    destination: destination.clone(),
                });
            };
            if !dest.id.is_top_level() || dest.randomize || !source_top.id.before(&dest.id) {
                return Err(StructuralError::InvalidBranchTarget {
                    question: question.id.clone(),
                    source_block: source_top.id.clone(),
                    destination: destination.clone(),
                });
            }
        }
        if let Some(option) = question
            .options
            .keys()
            .find(|o| !question.branch_map.contains_key(*o))
        {
            return Err(StructuralError::IncompleteBranchMap {
                question: question.id.clone(),
                option: option.clone(),
            });
        }
        Ok(())
    }

    fn collect_branch_questions<'a>(&'a self, block: &'a Block, out: &mut Vec<&'a Question>) {
        out.extend(self.block_questions(block).filter(|q| q.is_branch_question()));
        for sub in self.sub_blocks(block) {
            self.collect_branch_questions(sub, out);
        }
    }
}
