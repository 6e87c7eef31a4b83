//! Serializable survey definition.
//!
//! A plain nested shape suitable for JSON files. Block ids are implied by
//! position (1-based, nested), questions are placed through the builder, and
//! branch targets name a top-level block by its position path.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::block::BranchParadigm;
use super::builder::{QuestionSpec, SurveyBuilder};
use super::error::StructuralError;
use super::ids::BlockId;
use super::Survey;

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("parse survey definition: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Structural(#[from] StructuralError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyDefinition {
    pub name: String,
    pub blocks: Vec<BlockDefinition>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockDefinition {
    #[serde(default)]
    pub randomize: bool,
    #[serde(default)]
    pub paradigm: BranchParadigm,
    #[serde(default)]
    pub questions: Vec<QuestionDefinition>,
    #[serde(default)]
    pub blocks: Vec<BlockDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDefinition {
    pub text: String,
    #[serde(default)]
    pub options: Vec<OptionDefinition>,
    #[serde(default)]
    pub freetext: bool,
    #[serde(default = "default_permit_breakoff")]
    pub permit_breakoff: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDefinition {
    pub text: String,
    /// Destination block id path, e.g. `[3]`.
    #[serde(default)]
    pub branch_to: Option<Vec<u32>>,
}

fn default_permit_breakoff() -> bool {
    true
}

impl SurveyDefinition {
    pub fn from_json(json: &str) -> Result<Self, DefinitionError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Places every block and question and validates the result.
    pub fn into_survey(self) -> Result<Survey, StructuralError> {
        let mut builder = SurveyBuilder::new(self.name);
        for block in self.blocks {
            let id = builder.add_block(block.randomize);
            place_block(&mut builder, &id, block);
        }
        builder.build()
    }
}

fn place_block(builder: &mut SurveyBuilder, id: &BlockId, block: BlockDefinition) {
    builder.set_paradigm(id, block.paradigm);
    for question in block.questions {
        let texts: Vec<&str> = question.options.iter().map(|o| o.text.as_str()).collect();
        let mut spec = if question.freetext {
            QuestionSpec::freetext(question.text.as_str())
        } else {
            QuestionSpec::radio(question.text.as_str(), &texts)
        };
        spec.permit_breakoff = question.permit_breakoff;
        let qid = builder.add_question(id, spec);
        for (index, option) in question.options.iter().enumerate() {
            if let Some(dest) = &option.branch_to {
                builder.set_branch(&qid, index, BlockId::new(dest.clone()));
            }
        }
    }
    for sub in block.blocks {
        let sub_id = builder.add_sub_block(id, sub.randomize);
        place_block(builder, &sub_id, sub);
    }
}

/// Parses and validates a JSON survey definition in one step.
pub fn survey_from_json(json: &str) -> Result<Survey, DefinitionError> {
    Ok(SurveyDefinition::from_json(json)?.into_survey()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BRANCHING: &str = r#"{
        "name": "branching",
        "blocks": [
            { "questions": [ { "text": "Pick", "options": [
                { "text": "left", "branch_to": [2] },
                { "text": "right", "branch_to": [3] }
            ] } ] },
            { "questions": [ { "text": "L", "options": [ { "text": "a" }, { "text": "b" } ] } ] },
            { "questions": [ { "text": "R", "freetext": true } ] },
            { "randomize": true, "questions": [ { "text": "Z", "options": [ { "text": "z1" }, { "text": "z2" } ] } ] }
        ]
    }"#;

    #[test]
    fn parses_branching_definition() {
        let survey = survey_from_json(BRANCHING).unwrap();
        assert_eq!(survey.question_count(), 4);
        let first = survey.block(&BlockId::top(1)).unwrap();
        assert_eq!(first.paradigm, BranchParadigm::One);
        assert_eq!(survey.branch_destinations(first).len(), 2);
        assert!(survey.block(&BlockId::top(4)).unwrap().randomize);
    }

    #[test]
    fn nested_blocks_get_nested_ids() {
        let json = r#"{ "name": "nested", "blocks": [
            { "questions": [], "blocks": [ { "questions": [ { "text": "S", "options": [ { "text": "x" } ] } ] } ] }
        ] }"#;
        let survey = survey_from_json(json).unwrap();
        assert!(survey.block(&BlockId::new([1, 1])).is_some());
    }

    #[test]
    fn bad_json_is_reported() {
        assert!(matches!(
            survey_from_json("{ not json"),
            Err(DefinitionError::Json(_))
        ));
    }

    #[test]
    fn branch_without_destination_for_every_option_is_structural() {
        let json = r#"{ "name": "x", "blocks": [
            { "questions": [ { "text": "Q", "options": [
                { "text": "jump", "branch_to": [3] },
                { "text": "stay" }
            ] } ] },
            { "questions": [ { "text": "Q2", "options": [ { "text": "a" } ] } ] },
            { "questions": [ { "text": "Q3", "options": [ { "text": "b" } ] } ] }
        ] }"#;
        assert!(matches!(
            survey_from_json(json),
            Err(DefinitionError::Structural(StructuralError::IncompleteBranchMap { .. }))
        ));
    }

    #[test]
    fn dangling_branch_is_structural() {
        let json = r#"{ "name": "x", "blocks": [
            { "questions": [ { "text": "Q", "options": [ { "text": "a", "branch_to": [7] } ] } ] }
        ] }"#;
        assert!(matches!(
            survey_from_json(json),
            Err(DefinitionError::Structural(StructuralError::MissingBranchDestination { .. }))
        ));
    }
}
