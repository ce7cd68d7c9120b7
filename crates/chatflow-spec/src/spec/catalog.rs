use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::answers::FieldKey;
use crate::lint::{CatalogIssue, lint};
use crate::spec::step::{QuestionId, Step, StepId};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog has {} issue(s): {}", .0.len(), summarize(.0))]
    Invalid(Vec<CatalogIssue>),
}

fn summarize(issues: &[CatalogIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Point in the dialogue at which the answer record is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Checkpoint {
    pub step: StepId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionId>,
}

/// Navigation policies applied by the flow resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct FlowPolicy {
    /// Evaluate section conditions instead of admitting every section.
    #[serde(default)]
    pub gate_sections: bool,
}

/// Ordered collection of step definitions driving one dialogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Catalog {
    pub id: String,
    pub title: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub policy: FlowPolicy,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checkpoints: Vec<Checkpoint>,
    pub steps: Vec<Step>,
}

impl Catalog {
    /// Parses and validates a catalog. Any lint issue is fatal.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_str(json)?;
        catalog.prepare()
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_value(value)?;
        catalog.prepare()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    fn prepare(mut self) -> Result<Self, CatalogError> {
        self.steps.sort_by_key(Step::id);
        let issues = lint(&self);
        if issues.is_empty() {
            Ok(self)
        } else {
            Err(CatalogError::Invalid(issues))
        }
    }

    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.steps.iter().find(|step| step.id() == id)
    }

    /// Step with the lowest id.
    pub fn first_step(&self) -> Option<&Step> {
        self.steps.iter().min_by_key(|step| step.id())
    }

    /// Steps with an id strictly greater than `id`, ascending.
    pub fn steps_after(&self, id: StepId) -> Vec<&Step> {
        let mut later = self
            .steps
            .iter()
            .filter(|step| step.id() > id)
            .collect::<Vec<_>>();
        later.sort_by_key(|step| step.id());
        later
    }

    pub fn is_checkpoint(&self, step: StepId, question: Option<QuestionId>) -> bool {
        self.checkpoints
            .iter()
            .any(|checkpoint| checkpoint.step == step && checkpoint.question == question)
    }

    /// Every field key some step or sub-question can write.
    pub fn settable_fields(&self) -> BTreeSet<FieldKey> {
        let mut fields = BTreeSet::new();
        for step in &self.steps {
            match step {
                Step::Question(question) => {
                    fields.insert(question.field_key());
                }
                Step::Section(section) => {
                    fields.extend(
                        section
                            .questions
                            .iter()
                            .map(|question| section.field_key(question)),
                    );
                }
            }
        }
        fields
    }
}
