use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use crate::answers::{AnswerRecord, split_values};

/// Field reference of a condition: a single key or a list of keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldSelector {
    One(String),
    Many(Vec<String>),
}

impl FieldSelector {
    pub fn fields(&self) -> Vec<&str> {
        match self {
            FieldSelector::One(field) => vec![field.as_str()],
            FieldSelector::Many(fields) => fields.iter().map(String::as_str).collect(),
        }
    }
}

/// Expected answer for one field: an exact value or a set of accepted values.
///
/// Numbers and booleans are accepted and compared by their text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Expectation {
    Scalar(
        #[serde(deserialize_with = "literal")]
        #[schemars(with = "Literal")]
        String,
    ),
    List(
        #[serde(deserialize_with = "literals")]
        #[schemars(with = "Vec<Literal>")]
        Vec<String>,
    ),
}

#[derive(Deserialize, JsonSchema)]
#[serde(untagged)]
enum Literal {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

impl From<Literal> for String {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Text(text) => text,
            Literal::Number(number) => number.to_string(),
            Literal::Flag(flag) => flag.to_string(),
        }
    }
}

fn literal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Literal::deserialize(deserializer).map(String::from)
}

fn literals<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let literals = Vec::<Literal>::deserialize(deserializer)?;
    Ok(literals.into_iter().map(String::from).collect())
}

impl Expectation {
    pub fn matches(&self, answer: &str) -> bool {
        match self {
            Expectation::Scalar(value) => value == answer,
            Expectation::List(values) => values.iter().any(|value| value == answer),
        }
    }

    fn values(&self) -> Vec<&str> {
        match self {
            Expectation::Scalar(value) => vec![value.as_str()],
            Expectation::List(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// Expected value(s) of a condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Expected {
    Single(Expectation),
    PerField(BTreeMap<String, Expectation>),
}

impl Expected {
    fn for_field(&self, field: &str) -> Option<&Expectation> {
        match self {
            Expected::Single(expectation) => Some(expectation),
            Expected::PerField(map) => map.get(field),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConditionMode {
    #[serde(alias = "OR")]
    Or,
    #[serde(alias = "AND")]
    And,
    Includes,
}

/// Visibility rule attached to a step or sub-question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Condition {
    pub field: FieldSelector,
    pub value: Expected,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ConditionMode>,
}

impl Condition {
    /// `field == value` or, for a list, membership.
    pub fn equals(field: impl Into<String>, value: Expectation) -> Self {
        Self {
            field: FieldSelector::One(field.into()),
            value: Expected::Single(value),
            mode: None,
        }
    }

    /// `value` appears among the delimited tokens of `field`.
    pub fn includes(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: FieldSelector::One(field.into()),
            value: Expected::Single(Expectation::Scalar(value.into())),
            mode: Some(ConditionMode::Includes),
        }
    }

    pub fn fields(&self) -> Vec<&str> {
        self.field.fields()
    }

    /// Evaluates the condition against the answers collected so far.
    ///
    /// Unanswered fields read as the empty string. A field without an
    /// expectation never matches.
    pub fn evaluate(&self, answers: &AnswerRecord) -> bool {
        let fields = self.fields();
        match self.mode {
            Some(ConditionMode::Includes) => fields.iter().any(|field| {
                self.value.for_field(field).is_some_and(|expected| {
                    let expected = expected.values();
                    let answer = answers.value_of(field);
                    if answer.trim().is_empty() {
                        return expected.contains(&"");
                    }
                    split_values(answer).any(|token| expected.contains(&token))
                })
            }),
            Some(ConditionMode::Or) => fields
                .iter()
                .any(|field| self.field_matches(field, answers)),
            Some(ConditionMode::And) | None => fields
                .iter()
                .all(|field| self.field_matches(field, answers)),
        }
    }

    fn field_matches(&self, field: &str, answers: &AnswerRecord) -> bool {
        self.value
            .for_field(field)
            .is_some_and(|expected| expected.matches(answers.value_of(field)))
    }
}

/// Whether a step or sub-question with this condition currently applies.
pub fn applicable(condition: Option<&Condition>, answers: &AnswerRecord) -> bool {
    condition.is_none_or(|condition| condition.evaluate(answers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn answers(pairs: &[(&str, &str)]) -> AnswerRecord {
        pairs.iter().copied().collect()
    }

    fn parse(value: serde_json::Value) -> Condition {
        serde_json::from_value(value).expect("condition")
    }

    #[test]
    fn missing_condition_always_applies() {
        assert!(applicable(None, &AnswerRecord::new()));
        assert!(applicable(None, &answers(&[("4_14", "No")])));
    }

    #[test]
    fn scalar_value_uses_equality() {
        let condition = parse(json!({ "field": "4_14", "value": "Yes" }));
        assert!(condition.evaluate(&answers(&[("4_14", "Yes")])));
        assert!(!condition.evaluate(&answers(&[("4_14", "yes")])));
        assert!(!condition.evaluate(&AnswerRecord::new()));
    }

    #[test]
    fn list_value_uses_membership() {
        let accepted = ["Multi-day trip", "Weekend"];
        let condition = parse(json!({ "field": "4_12", "value": accepted }));
        for value in accepted {
            assert!(condition.evaluate(&answers(&[("4_12", value)])));
        }
        assert!(!condition.evaluate(&answers(&[("4_12", "Day trip")])));
    }

    #[test]
    fn missing_field_matches_only_empty_expectation() {
        let empty = Condition::equals("2_1", Expectation::Scalar(String::new()));
        assert!(empty.evaluate(&AnswerRecord::new()));
        let named = Condition::equals("2_1", Expectation::Scalar("Dana".into()));
        assert!(!named.evaluate(&AnswerRecord::new()));
    }

    #[test]
    fn or_mode_matches_any_listed_field() {
        let condition = parse(json!({
            "field": ["3_11", "3_9"],
            "value": { "3_11": ["Yes"], "3_9": ["Retirees", "Senior citizens"] },
            "mode": "OR"
        }));
        assert!(condition.evaluate(&answers(&[("3_11", "Yes")])));
        assert!(condition.evaluate(&answers(&[("3_11", "No"), ("3_9", "Retirees")])));
        assert!(!condition.evaluate(&answers(&[("3_11", "No"), ("3_9", "Soldiers")])));
        assert!(!condition.evaluate(&AnswerRecord::new()));
    }

    #[test]
    fn unspecified_multi_field_mode_requires_every_pair() {
        let condition = parse(json!({
            "field": ["a", "b"],
            "value": { "a": "1", "b": ["2", "3"] }
        }));
        assert!(condition.evaluate(&answers(&[("a", "1"), ("b", "3")])));
        assert!(!condition.evaluate(&answers(&[("a", "1")])));
    }

    #[test]
    fn listed_field_without_expectation_never_matches() {
        let condition = parse(json!({
            "field": ["a", "b"],
            "value": { "a": "1" },
            "mode": "or"
        }));
        assert!(!condition.evaluate(&answers(&[("b", "1")])));
        assert!(condition.evaluate(&answers(&[("a", "1")])));
    }

    #[test]
    fn includes_mode_checks_delimited_tokens() {
        let condition = Condition::includes("6_24", "Transport booking");
        assert!(condition.evaluate(&answers(&[(
            "6_24",
            "Activity planning, Transport booking"
        )])));
        assert!(condition.evaluate(&answers(&[("6_24", "Transport booking")])));
        assert!(!condition.evaluate(&answers(&[("6_24", "Transport")])));
        assert!(!condition.evaluate(&AnswerRecord::new()));
    }

    #[test]
    fn includes_empty_value_matches_unanswered_field() {
        let condition = Condition::includes("6_24", "");
        assert!(condition.evaluate(&AnswerRecord::new()));
        assert!(condition.evaluate(&answers(&[("6_24", "  ")])));
        assert!(!condition.evaluate(&answers(&[("6_24", "Transport booking")])));
    }

    #[test]
    fn number_and_bool_values_compare_as_text() {
        let condition = parse(json!({ "field": "7_33", "value": 2 }));
        assert_eq!(condition.value, Expected::Single(Expectation::Scalar("2".into())));
        assert!(condition.evaluate(&answers(&[("7_33", "2")])));
        assert!(!condition.evaluate(&answers(&[("7_33", "3")])));

        let condition = parse(json!({ "field": "flag", "value": ["Yes", 3, true] }));
        assert!(condition.evaluate(&answers(&[("flag", "true")])));
        assert!(condition.evaluate(&answers(&[("flag", "3")])));
        assert!(!condition.evaluate(&answers(&[("flag", "false")])));

        let condition = parse(json!({
            "field": ["a", "b"],
            "value": { "a": 1, "b": false }
        }));
        assert!(condition.evaluate(&answers(&[("a", "1"), ("b", "false")])));
    }

    #[test]
    fn deserializes_every_condition_shape() {
        let condition = parse(json!({ "field": "4_13", "value": "Saturday", "mode": "includes" }));
        assert_eq!(condition.mode, Some(ConditionMode::Includes));
        assert_eq!(condition.fields(), vec!["4_13"]);
    }
}
