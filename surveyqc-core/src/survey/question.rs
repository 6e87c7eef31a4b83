use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::error::StructuralError;
use super::ids::{BlockId, OptionId, QuestionId};

/// One answer option of a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyOption {
    pub id: OptionId,
    pub text: String,
    /// Display position in `[0, option_count)`; unique within the question.
    pub index: usize,
    pub source_row: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    /// Owning block.
    pub block: BlockId,
    pub options: BTreeMap<OptionId, SurveyOption>,
    /// Option → destination block. Non-empty iff this is a branch question.
    pub branch_map: BTreeMap<OptionId, BlockId>,
    pub freetext: bool,
    /// Whether a respondent may stop the survey at this question.
    pub permit_breakoff: bool,
    pub source_row: u32,
}

impl Question {
    pub fn is_branch_question(&self) -> bool {
        !self.branch_map.is_empty()
    }

    /// Distinct destination blocks, ascending.
    pub fn branch_destinations(&self) -> BTreeSet<&BlockId> {
        self.branch_map.values().collect()
    }

    pub fn branch_destination(&self, option: &OptionId) -> Option<&BlockId> {
        self.branch_map.get(option)
    }

    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    pub fn option(&self, id: &OptionId) -> Option<&SurveyOption> {
        self.options.get(id)
    }

    /// Options ordered by their display index.
    ///
    /// Fails if two options share an index or an index falls outside
    /// `[0, option_count)`. Freetext questions have no options.
    pub fn options_by_index(&self) -> Result<Vec<&SurveyOption>, StructuralError> {
        if self.freetext {
            return Ok(Vec::new());
        }
        let max = self.options.len();
        let mut slots: Vec<Option<&SurveyOption>> = vec![None; max];
        for opt in self.options.values() {
            if opt.index >= max {
                return Err(StructuralError::OptionIndexOutOfRange {
                    question: self.id.clone(),
                    option: opt.id.clone(),
                    index: opt.index,
                    max: max.saturating_sub(1),
                });
            }
            if let Some(existing) = slots[opt.index] {
                return Err(StructuralError::DuplicateOptionIndex {
                    question: self.id.clone(),
                    first: existing.id.clone(),
                    second: opt.id.clone(),
                    index: opt.index,
                });
            }
            slots[opt.index] = Some(opt);
        }
        Ok(slots.into_iter().flatten().collect())
    }

    /// Upper bound on the information one answer carries, in bits.
    pub fn max_entropy(&self) -> f64 {
        let n = self.options.len();
        if self.freetext || n == 0 {
            0.0
        } else {
            (n as f64).log2()
        }
    }
}
