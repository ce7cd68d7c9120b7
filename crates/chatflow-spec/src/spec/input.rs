use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kinds of answer a question can collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Text,
    Numeric,
    Email,
    Phone,
    SingleChoice,
    MultiChoice,
    Date,
    Time,
}

impl InputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::Text => "text",
            InputKind::Numeric => "numeric",
            InputKind::Email => "email",
            InputKind::Phone => "phone",
            InputKind::SingleChoice => "single_choice",
            InputKind::MultiChoice => "multi_choice",
            InputKind::Date => "date",
            InputKind::Time => "time",
        }
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, InputKind::SingleChoice | InputKind::MultiChoice)
    }

    /// Placeholder shown when the catalog does not provide one.
    pub fn default_placeholder(&self) -> Option<&'static str> {
        match self {
            InputKind::Numeric => Some("Numbers only"),
            InputKind::Phone => Some("Mobile phone number"),
            InputKind::Email => Some("Email address"),
            _ => None,
        }
    }
}

/// Validator predicate applied to a raw answer, expressed as data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Constraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_len: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_len: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// How a question collects its answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InputSpec {
    #[serde(rename = "type")]
    pub kind: InputKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Constraint>,
}

impl InputSpec {
    pub fn new(kind: InputKind) -> Self {
        Self {
            kind,
            options: Vec::new(),
            placeholder: None,
            constraint: None,
        }
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder
            .as_deref()
            .or_else(|| self.kind.default_placeholder())
    }
}
