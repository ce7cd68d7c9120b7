use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::step::{QuestionId, StepId};

/// Separator used when a multi-choice answer is stored as one string.
pub const MULTI_VALUE_DELIMITER: &str = ", ";

/// Storage key of one answer.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct FieldKey(String);

impl FieldKey {
    /// Key of a section sub-question, e.g. `4_14`.
    pub fn sub_question(section: StepId, question: QuestionId) -> Self {
        Self(format!("{}_{}", section, question))
    }

    /// Key of a top-level step: its semantic name, or `step{id}`.
    pub fn step(step: StepId, name: Option<&str>) -> Self {
        match name {
            Some(name) => Self(name.to_string()),
            None => Self(format!("step{}", step)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FieldKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Flat mapping of field keys to the raw answers given so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AnswerRecord(BTreeMap<FieldKey, String>);

impl AnswerRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the answer stored under `key`.
    pub fn record(&mut self, key: FieldKey, value: impl Into<String>) -> Option<String> {
        self.0.insert(key, value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Stored answer, or the empty string for fields never answered.
    pub fn value_of(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &str)> {
        self.0.iter().map(|(key, value)| (key, value.as_str()))
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        serde_cbor::to_vec(self)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AnswerRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (FieldKey(key.into()), value.into()))
                .collect(),
        )
    }
}

/// Splits a stored multi-value answer into its trimmed, non-empty tokens.
pub fn split_values(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
