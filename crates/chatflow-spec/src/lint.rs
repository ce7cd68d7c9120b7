use std::collections::BTreeSet;
use std::fmt;

use regex::Regex;
use serde::Serialize;

use crate::answers::FieldKey;
use crate::condition::{Condition, ConditionMode, Expected, FieldSelector};
use crate::spec::catalog::Catalog;
use crate::spec::input::{InputKind, InputSpec};
use crate::spec::step::{QuestionId, Step};

/// A catalog authoring defect found at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogIssue {
    pub path: String,
    pub code: String,
    pub message: String,
}

impl CatalogIssue {
    fn new(path: impl Into<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for CatalogIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.path, self.message, self.code)
    }
}

/// Reports every structural problem in the catalog.
pub fn lint(catalog: &Catalog) -> Vec<CatalogIssue> {
    let mut issues = Vec::new();

    if catalog.steps.is_empty() {
        issues.push(CatalogIssue::new(
            "/steps",
            "empty_catalog",
            "catalog defines no steps",
        ));
        return issues;
    }

    let settable = catalog.settable_fields();
    let mut seen_steps = BTreeSet::new();
    let mut seen_fields = BTreeSet::new();

    for step in &catalog.steps {
        let path = format!("/steps/{}", step.id());
        let first_use = seen_steps.insert(step.id());
        if !first_use {
            issues.push(CatalogIssue::new(
                &path,
                "duplicate_step",
                format!("step id {} is used more than once", step.id()),
            ));
        }

        if let Some(condition) = step.condition() {
            check_condition(&path, condition, &settable, &mut issues);
        }

        match step {
            Step::Question(question) => {
                if first_use {
                    check_field(&path, question.field_key(), &mut seen_fields, &mut issues);
                }
                if let Some(input) = &question.input {
                    check_input(&path, input, &mut issues);
                }
                if question.input.is_none() && question.buttons.is_empty() && !question.terminal {
                    issues.push(CatalogIssue::new(
                        &path,
                        "unanswerable_step",
                        "question step has neither an input nor buttons",
                    ));
                }
            }
            Step::Section(section) => {
                let mut seen_questions: BTreeSet<QuestionId> = BTreeSet::new();
                for question in &section.questions {
                    let question_path = format!("{}/questions/{}", path, question.id);
                    if !seen_questions.insert(question.id) {
                        issues.push(CatalogIssue::new(
                            &question_path,
                            "duplicate_question",
                            format!(
                                "sub-question id {} is used more than once in section {}",
                                question.id, section.id
                            ),
                        ));
                    } else if first_use {
                        let field = section.field_key(question);
                        check_field(&question_path, field, &mut seen_fields, &mut issues);
                    }
                    if let Some(condition) = &question.condition {
                        check_condition(&question_path, condition, &settable, &mut issues);
                    }
                    check_input(&question_path, &question.input, &mut issues);
                }
            }
        }
    }

    for (index, checkpoint) in catalog.checkpoints.iter().enumerate() {
        let path = format!("/checkpoints/{}", index);
        let exists = match (catalog.step(checkpoint.step), checkpoint.question) {
            (Some(Step::Section(section)), Some(question)) => section.position(question).is_some(),
            (Some(Step::Question(_)), None) => true,
            _ => false,
        };
        if !exists {
            issues.push(CatalogIssue::new(
                path,
                "unknown_checkpoint",
                format!(
                    "checkpoint {}{} does not match any step or sub-question",
                    checkpoint.step,
                    checkpoint
                        .question
                        .map(|question| format!("/{}", question))
                        .unwrap_or_default()
                ),
            ));
        }
    }

    issues
}

fn check_field(
    path: &str,
    field: FieldKey,
    seen: &mut BTreeSet<FieldKey>,
    issues: &mut Vec<CatalogIssue>,
) {
    if seen.contains(&field) {
        issues.push(CatalogIssue::new(
            path,
            "duplicate_field",
            format!("field key '{}' is already stored by an earlier step", field),
        ));
    } else {
        seen.insert(field);
    }
}

fn check_condition(
    path: &str,
    condition: &Condition,
    settable: &BTreeSet<FieldKey>,
    issues: &mut Vec<CatalogIssue>,
) {
    let path = format!("{}/condition", path);
    let fields = condition.fields();

    if fields.is_empty() {
        issues.push(CatalogIssue::new(
            &path,
            "malformed_condition",
            "condition lists no fields",
        ));
    }

    for field in &fields {
        if !settable.contains(*field) {
            issues.push(CatalogIssue::new(
                &path,
                "unknown_field",
                format!("field '{}' is never set by any step", field),
            ));
        }
    }

    match (&condition.field, &condition.value) {
        (FieldSelector::Many(_), Expected::Single(_))
            if condition.mode != Some(ConditionMode::Includes) =>
        {
            issues.push(CatalogIssue::new(
                &path,
                "malformed_condition",
                "multi-field condition needs one expected value per field",
            ));
        }
        (_, Expected::PerField(map)) => {
            let listed: BTreeSet<&str> = fields.iter().copied().collect();
            let mapped: BTreeSet<&str> = map.keys().map(String::as_str).collect();
            if listed != mapped {
                issues.push(CatalogIssue::new(
                    &path,
                    "malformed_condition",
                    "expected values do not match the listed fields",
                ));
            }
        }
        _ => {}
    }

    if condition.mode == Some(ConditionMode::Includes) && fields.len() > 1 {
        issues.push(CatalogIssue::new(
            &path,
            "malformed_condition",
            "includes conditions apply to a single field",
        ));
    }
}

fn check_input(path: &str, input: &InputSpec, issues: &mut Vec<CatalogIssue>) {
    let path = format!("{}/input", path);

    if input.kind.is_choice() && input.options.is_empty() {
        issues.push(CatalogIssue::new(
            &path,
            "missing_options",
            format!("{} input declares no options", input.kind.as_str()),
        ));
    }

    if input.kind == InputKind::MultiChoice {
        for option in input.options.iter().filter(|option| option.contains(',')) {
            issues.push(CatalogIssue::new(
                &path,
                "delimiter_in_option",
                format!("option '{}' contains the answer delimiter", option),
            ));
        }
    }

    if let Some(pattern) = input
        .constraint
        .as_ref()
        .and_then(|constraint| constraint.pattern.as_ref())
        && let Err(err) = Regex::new(pattern)
    {
        issues.push(CatalogIssue::new(
            &path,
            "invalid_pattern",
            format!("pattern '{}' does not compile: {}", pattern, err),
        ));
    }
}
