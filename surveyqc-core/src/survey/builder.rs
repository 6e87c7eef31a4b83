//! Programmatic survey construction.
//!
//! Questions created in code have no source file, so their rows are
//! allocated from a [`RowCursor`] that the builder threads through every
//! placement. Row positions feed question/option ids and the relative
//! offsets used for variant matching.

use std::collections::BTreeMap;

use super::block::{Block, BranchParadigm};
use super::error::StructuralError;
use super::ids::{BlockId, OptionId, QuestionId};
use super::question::{Question, SurveyOption};
use super::Survey;

const QUESTION_COL: u32 = 0;
const OPTION_COL: u32 = 1;

/// Next free source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowCursor {
    next_row: u32,
}

impl RowCursor {
    pub fn new(start_row: u32) -> Self {
        Self { next_row: start_row }
    }

    pub fn row(&self) -> u32 {
        self.next_row
    }

    /// Reserves `lines` rows (at least one) and returns the first reserved row
    /// together with the advanced cursor.
    pub fn reserve(self, lines: u32) -> (u32, RowCursor) {
        let start = self.next_row;
        (
            start,
            RowCursor {
                next_row: start + lines.max(1),
            },
        )
    }
}

/// Content of a question before it is placed in a survey.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionSpec {
    pub text: String,
    pub options: Vec<String>,
    pub freetext: bool,
    pub permit_breakoff: bool,
}

impl QuestionSpec {
    pub fn radio(text: impl Into<String>, options: &[&str]) -> Self {
        Self {
            text: text.into(),
            options: options.iter().map(|o| o.to_string()).collect(),
            freetext: false,
            permit_breakoff: true,
        }
    }

    pub fn freetext(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            options: Vec::new(),
            freetext: true,
            permit_breakoff: true,
        }
    }

    pub fn required(mut self) -> Self {
        self.permit_breakoff = false;
        self
    }

    /// Materializes the question at the cursor position.
    pub fn place(self, block: BlockId, cursor: RowCursor) -> (Question, RowCursor) {
        let (row, next) = cursor.reserve(self.options.len() as u32);
        let options = self
            .options
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let source_row = row + index as u32;
                let id = OptionId::from_position(source_row, OPTION_COL);
                (
                    id.clone(),
                    SurveyOption {
                        id,
                        text,
                        index,
                        source_row,
                    },
                )
            })
            .collect();
        let question = Question {
            id: QuestionId::from_position(row, QUESTION_COL),
            text: self.text,
            block,
            options,
            branch_map: BTreeMap::new(),
            freetext: self.freetext,
            permit_breakoff: self.permit_breakoff,
            source_row: row,
        };
        (question, next)
    }
}

#[derive(Debug, Clone)]
struct PendingBranch {
    question: QuestionId,
    option_index: usize,
    destination: BlockId,
}

#[derive(Debug, Clone)]
pub struct SurveyBuilder {
    name: String,
    blocks: BTreeMap<BlockId, Block>,
    questions: Vec<Question>,
    branches: Vec<PendingBranch>,
    top_level_count: u32,
    cursor: RowCursor,
}

impl SurveyBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_cursor(name, RowCursor::new(1))
    }

    pub fn with_cursor(name: impl Into<String>, cursor: RowCursor) -> Self {
        Self {
            name: name.into(),
            blocks: BTreeMap::new(),
            questions: Vec::new(),
            branches: Vec::new(),
            top_level_count: 0,
            cursor,
        }
    }

    pub fn cursor(&self) -> RowCursor {
        self.cursor
    }

    /// Appends a new top-level block and returns its id.
    pub fn add_block(&mut self, randomize: bool) -> BlockId {
        self.top_level_count += 1;
        let id = BlockId::top(self.top_level_count);
        let mut block = Block::new(id.clone());
        block.randomize = randomize;
        self.blocks.insert(id.clone(), block);
        id
    }

    /// Appends a sub-block under `parent`. Unknown parents yield a block that
    /// fails validation at [`build`](Self::build).
    pub fn add_sub_block(&mut self, parent: &BlockId, randomize: bool) -> BlockId {
        let index = self
            .blocks
            .get(parent)
            .map(|p| p.sub_blocks.len() as u32 + 1)
            .unwrap_or(1);
        let id = parent.child(index);
        if let Some(p) = self.blocks.get_mut(parent) {
            p.sub_blocks.push(id.clone());
        }
        let mut block = Block::new(id.clone());
        block.randomize = randomize;
        self.blocks.insert(id.clone(), block);
        id
    }

    pub fn set_paradigm(&mut self, block: &BlockId, paradigm: BranchParadigm) {
        if let Some(b) = self.blocks.get_mut(block) {
            b.paradigm = paradigm;
        }
    }

    pub fn add_question(&mut self, block: &BlockId, spec: QuestionSpec) -> QuestionId {
        let (question, next) = spec.place(block.clone(), self.cursor);
        self.cursor = next;
        let id = question.id.clone();
        if let Some(b) = self.blocks.get_mut(block) {
            b.questions.push(id.clone());
        }
        self.questions.push(question);
        id
    }

    /// Routes the option at `option_index` of `question` to `destination`.
    pub fn set_branch(&mut self, question: &QuestionId, option_index: usize, destination: BlockId) {
        self.branches.push(PendingBranch {
            question: question.clone(),
            option_index,
            destination,
        });
    }

    pub fn build(mut self) -> Result<Survey, StructuralError> {
        for branch in std::mem::take(&mut self.branches) {
            let Some(question) = self.questions.iter_mut().find(|q| q.id == branch.question) else {
                return Err(StructuralError::UnknownQuestion {
                    block: branch.destination,
                    question: branch.question,
                });
            };
            let option = question
                .options
                .values()
                .find(|o| o.index == branch.option_index)
                .map(|o| o.id.clone())
                .ok_or_else(|| StructuralError::UnknownBranchOption {
                    question: question.id.clone(),
                    option: OptionId::new(format!("#{}", branch.option_index)),
                })?;
            question.branch_map.insert(option, branch.destination);
        }
        for block in self.blocks.values_mut() {
            if block.paradigm == BranchParadigm::None
                && block
                    .questions
                    .iter()
                    .any(|qid| self.questions.iter().any(|q| &q.id == qid && q.is_branch_question()))
            {
                block.paradigm = BranchParadigm::One;
            }
        }
        Survey::new(
            self.name,
            self.blocks.into_values().collect(),
            self.questions,
        )
    }
}
