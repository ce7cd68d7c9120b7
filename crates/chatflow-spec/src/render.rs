use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::answers::FieldKey;
use crate::spec::input::{Constraint, InputKind, InputSpec};
use crate::spec::step::{QuestionId, QuestionStep, SectionStep, StepId, SubQuestion};

/// Section a sub-question belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionHeader {
    pub step_id: StepId,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
}

/// Input widget description handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputView {
    #[serde(rename = "type")]
    pub kind: InputKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Constraint>,
}

impl InputView {
    fn new(input: &InputSpec, required: bool) -> Self {
        Self {
            kind: input.kind,
            options: input.options.clone(),
            placeholder: input.placeholder().map(str::to_string),
            required,
            constraint: input.constraint.clone(),
        }
    }
}

/// Everything the presentation layer needs to display one prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepDescriptor {
    pub step_id: StepId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_id: Option<QuestionId>,
    pub field: FieldKey,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<SectionHeader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<InputView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    pub required: bool,
    pub intro: bool,
    pub terminal: bool,
}

impl StepDescriptor {
    pub fn for_question_step(step: &QuestionStep) -> Self {
        Self {
            step_id: step.id,
            question_id: None,
            field: step.field_key(),
            content: step.content.clone(),
            section: None,
            input: step
                .input
                .as_ref()
                .map(|input| InputView::new(input, step.required)),
            buttons: step.buttons.clone(),
            media: step.media.clone(),
            required: step.required,
            intro: step.intro,
            terminal: step.terminal,
        }
    }

    pub fn for_sub_question(section: &SectionStep, question: &SubQuestion) -> Self {
        Self {
            step_id: section.id,
            question_id: Some(question.id),
            field: section.field_key(question),
            content: question.content.clone(),
            section: Some(SectionHeader {
                step_id: section.id,
                content: section.content.clone(),
                media: section.media.clone(),
            }),
            input: Some(InputView::new(&question.input, question.required)),
            buttons: Vec::new(),
            media: None,
            required: question.required,
            intro: false,
            terminal: false,
        }
    }
}

/// Render a descriptor as a structured JSON payload for UI hosts.
pub fn render_json_ui(descriptor: &StepDescriptor) -> Value {
    let mut map = Map::new();
    map.insert("step_id".into(), json!(descriptor.step_id));
    map.insert("question_id".into(), json!(descriptor.question_id));
    map.insert("field".into(), json!(descriptor.field.as_str()));
    map.insert("content".into(), Value::String(descriptor.content.clone()));
    if let Some(section) = &descriptor.section {
        map.insert(
            "section".into(),
            json!({
                "step_id": section.step_id,
                "content": section.content,
                "media": section.media,
            }),
        );
    }
    if let Some(input) = &descriptor.input {
        let mut input_map = Map::new();
        input_map.insert("type".into(), Value::String(input.kind.as_str().into()));
        input_map.insert("required".into(), Value::Bool(input.required));
        if !input.options.is_empty() {
            input_map.insert(
                "options".into(),
                Value::Array(
                    input
                        .options
                        .iter()
                        .map(|option| Value::String(option.clone()))
                        .collect(),
                ),
            );
        }
        if let Some(placeholder) = &input.placeholder {
            input_map.insert("placeholder".into(), Value::String(placeholder.clone()));
        }
        if let Some(constraint) = &input.constraint {
            input_map.insert("constraint".into(), json!(constraint));
        }
        map.insert("input".into(), Value::Object(input_map));
    }
    if !descriptor.buttons.is_empty() {
        map.insert("buttons".into(), json!(descriptor.buttons));
    }
    if let Some(media) = &descriptor.media {
        map.insert("media".into(), Value::String(media.clone()));
    }
    map.insert("required".into(), Value::Bool(descriptor.required));
    map.insert("intro".into(), Value::Bool(descriptor.intro));
    map.insert("terminal".into(), Value::Bool(descriptor.terminal));
    Value::Object(map)
}

/// Render a descriptor as plain text for terminal transcripts.
pub fn render_text(descriptor: &StepDescriptor) -> String {
    let mut lines = Vec::new();
    lines.push(descriptor.content.clone());

    if let Some(input) = &descriptor.input {
        let mut hint = format!("[{}]", input.kind.as_str());
        if input.required {
            hint.push_str(" *");
        }
        if let Some(placeholder) = &input.placeholder {
            hint.push_str(&format!(" ({})", placeholder));
        }
        lines.push(hint);
        for (index, option) in input.options.iter().enumerate() {
            lines.push(format!("  {}. {}", index + 1, option));
        }
        if input.kind == InputKind::MultiChoice {
            lines.push("  (separate several choices with commas)".to_string());
        }
    }

    if !descriptor.buttons.is_empty() {
        let buttons = descriptor
            .buttons
            .iter()
            .map(|button| format!("[ {} ]", button))
            .collect::<Vec<_>>();
        lines.push(buttons.join(" "));
    }

    lines.join("\n")
}
