use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::answers::FieldKey;
use crate::condition::Condition;
use crate::spec::input::InputSpec;

pub type StepId = u32;
pub type QuestionId = u32;

/// One top-level unit of the dialogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    Question(QuestionStep),
    Section(SectionStep),
}

impl Step {
    pub fn id(&self) -> StepId {
        match self {
            Step::Question(step) => step.id,
            Step::Section(section) => section.id,
        }
    }

    pub fn condition(&self) -> Option<&Condition> {
        match self {
            Step::Question(step) => step.condition.as_ref(),
            Step::Section(section) => section.condition.as_ref(),
        }
    }

    pub fn is_section(&self) -> bool {
        matches!(self, Step::Section(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Step::Question(step) if step.terminal)
    }

    pub fn as_section(&self) -> Option<&SectionStep> {
        match self {
            Step::Section(section) => Some(section),
            Step::Question(_) => None,
        }
    }
}

/// A directly answerable step: free input, a set of buttons, or both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuestionStep {
    pub id: StepId,
    pub content: String,
    /// Semantic name the answer is stored under; `step{id}` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<InputSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub intro: bool,
    #[serde(default)]
    pub terminal: bool,
}

impl QuestionStep {
    pub fn field_key(&self) -> FieldKey {
        FieldKey::step(self.id, self.field.as_deref())
    }
}

/// A step owning an ordered list of sub-questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SectionStep {
    pub id: StepId,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub questions: Vec<SubQuestion>,
}

impl SectionStep {
    pub fn question(&self, index: usize) -> Option<&SubQuestion> {
        self.questions.get(index)
    }

    /// Index of the sub-question with the given local id.
    pub fn position(&self, question_id: QuestionId) -> Option<usize> {
        self.questions
            .iter()
            .position(|question| question.id == question_id)
    }

    pub fn field_key(&self, question: &SubQuestion) -> FieldKey {
        FieldKey::sub_question(self.id, question.id)
    }
}

/// A question asked inside a section; `id` is unique within its section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubQuestion {
    pub id: QuestionId,
    pub content: String,
    pub input: InputSpec,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}
