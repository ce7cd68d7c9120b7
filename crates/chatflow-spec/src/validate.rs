use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::answers::{MULTI_VALUE_DELIMITER, split_values};
use crate::spec::input::{Constraint, InputKind, InputSpec};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));
static TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("time pattern"));

/// Reason a raw answer was refused. The question is asked again.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum InputError {
    #[error("this question requires an answer")]
    Missing,
    #[error("please enter a number")]
    NotNumeric,
    #[error("please enter a valid email address")]
    InvalidEmail,
    #[error("please enter a time as HH:MM")]
    InvalidTime,
    #[error("choose one of: {}", .allowed.join(", "))]
    UnknownChoice { value: String, allowed: Vec<String> },
    #[error("value does not match the expected format")]
    PatternMismatch,
    #[error("answer must be at least {min} characters")]
    TooShort { min: usize },
    #[error("answer must be at most {max} characters")]
    TooLong { max: usize },
    #[error("value must be at least {min}")]
    BelowMinimum { min: f64 },
    #[error("value must be at most {max}")]
    AboveMaximum { max: f64 },
}

impl InputError {
    pub fn code(&self) -> &'static str {
        match self {
            InputError::Missing => "missing",
            InputError::NotNumeric => "not_numeric",
            InputError::InvalidEmail => "invalid_email",
            InputError::InvalidTime => "invalid_time",
            InputError::UnknownChoice { .. } => "unknown_choice",
            InputError::PatternMismatch => "pattern_mismatch",
            InputError::TooShort { .. } => "min_length",
            InputError::TooLong { .. } => "max_length",
            InputError::BelowMinimum { .. } => "min",
            InputError::AboveMaximum { .. } => "max",
        }
    }
}

/// Checks a raw answer and returns the normalized value to record.
pub fn validate_input(input: &InputSpec, required: bool, raw: &str) -> Result<String, InputError> {
    let value = raw.trim();
    if value.is_empty() {
        return if required {
            Err(InputError::Missing)
        } else {
            Ok(String::new())
        };
    }

    let normalized = match input.kind {
        InputKind::Numeric => {
            parse_number(value).ok_or(InputError::NotNumeric)?;
            value.to_string()
        }
        InputKind::Email => {
            if !EMAIL.is_match(value) {
                return Err(InputError::InvalidEmail);
            }
            value.to_string()
        }
        InputKind::Time => {
            if !TIME.is_match(value) {
                return Err(InputError::InvalidTime);
            }
            value.to_string()
        }
        InputKind::SingleChoice => match_choice(&input.options, value)?,
        InputKind::MultiChoice => {
            let mut selected: Vec<String> = Vec::new();
            for token in split_values(value) {
                let choice = match_choice(&input.options, token)?;
                if !selected.contains(&choice) {
                    selected.push(choice);
                }
            }
            if selected.is_empty() && required {
                return Err(InputError::Missing);
            }
            selected.join(MULTI_VALUE_DELIMITER)
        }
        InputKind::Text | InputKind::Phone | InputKind::Date => value.to_string(),
    };

    if let Some(constraint) = &input.constraint {
        enforce_constraint(constraint, &normalized)?;
    }

    Ok(normalized)
}

/// Accepts a click on one of the step's buttons, matched case-insensitively.
pub fn validate_button(buttons: &[String], raw: &str) -> Result<String, InputError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(InputError::Missing);
    }
    match_choice(buttons, value)
}

fn match_choice(options: &[String], raw: &str) -> Result<String, InputError> {
    let wanted = raw.to_lowercase();
    options
        .iter()
        .find(|option| option.to_lowercase() == wanted)
        .cloned()
        .ok_or_else(|| InputError::UnknownChoice {
            value: raw.to_string(),
            allowed: options.to_vec(),
        })
}

fn parse_number(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|number| number.is_finite())
}

fn enforce_constraint(constraint: &Constraint, value: &str) -> Result<(), InputError> {
    if let Some(pattern) = &constraint.pattern
        && let Ok(regex) = Regex::new(pattern)
        && !regex.is_match(value)
    {
        return Err(InputError::PatternMismatch);
    }

    let length = value.chars().count();
    if let Some(min) = constraint.min_len
        && length < min
    {
        return Err(InputError::TooShort { min });
    }

    if let Some(max) = constraint.max_len
        && length > max
    {
        return Err(InputError::TooLong { max });
    }

    if let Some(min) = constraint.min
        && let Some(number) = parse_number(value)
        && number < min
    {
        return Err(InputError::BelowMinimum { min });
    }

    if let Some(max) = constraint.max
        && let Some(number) = parse_number(value)
        && number > max
    {
        return Err(InputError::AboveMaximum { max });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice(kind: InputKind, options: &[&str]) -> InputSpec {
        InputSpec {
            options: options.iter().map(|option| option.to_string()).collect(),
            ..InputSpec::new(kind)
        }
    }

    #[test]
    fn blank_answers_depend_on_required_flag() {
        let input = InputSpec::new(InputKind::Text);
        assert_eq!(validate_input(&input, true, "   "), Err(InputError::Missing));
        assert_eq!(validate_input(&input, false, ""), Ok(String::new()));
    }

    #[test]
    fn email_must_look_like_an_address() {
        let input = InputSpec::new(InputKind::Email);
        assert_eq!(
            validate_input(&input, true, "not-an-email"),
            Err(InputError::InvalidEmail)
        );
        assert_eq!(
            validate_input(&input, true, " dana@example.org "),
            Ok("dana@example.org".into())
        );
    }

    #[test]
    fn numeric_rejects_words_and_infinity() {
        let input = InputSpec::new(InputKind::Numeric);
        assert_eq!(validate_input(&input, true, "350"), Ok("350".into()));
        assert_eq!(validate_input(&input, true, "12.5"), Ok("12.5".into()));
        assert_eq!(
            validate_input(&input, true, "lots"),
            Err(InputError::NotNumeric)
        );
        assert_eq!(validate_input(&input, true, "inf"), Err(InputError::NotNumeric));
    }

    #[test]
    fn time_requires_clock_format() {
        let input = InputSpec::new(InputKind::Time);
        assert_eq!(validate_input(&input, true, "07:30"), Ok("07:30".into()));
        assert_eq!(
            validate_input(&input, true, "25:00"),
            Err(InputError::InvalidTime)
        );
    }

    #[test]
    fn single_choice_returns_canonical_option() {
        let input = choice(InputKind::SingleChoice, &["Yes", "No", "Other"]);
        assert_eq!(validate_input(&input, true, "yes"), Ok("Yes".into()));
        let err = validate_input(&input, true, "Maybe").expect_err("unknown choice");
        assert_eq!(err.code(), "unknown_choice");
    }

    #[test]
    fn multi_choice_joins_with_record_delimiter() {
        let input = choice(InputKind::MultiChoice, &["Family", "Friends", "Other"]);
        assert_eq!(
            validate_input(&input, true, "friends,Family, friends"),
            Ok("Friends, Family".into())
        );
        assert_eq!(validate_input(&input, true, " , "), Err(InputError::Missing));
        assert_eq!(validate_input(&input, false, " , "), Ok(String::new()));
    }

    #[test]
    fn constraint_pattern_applies_to_phone() {
        let input = InputSpec {
            constraint: Some(Constraint {
                pattern: Some(r"^05\d{8}$".into()),
                ..Constraint::default()
            }),
            ..InputSpec::new(InputKind::Phone)
        };
        assert_eq!(validate_input(&input, true, "0521234567"), Ok("0521234567".into()));
        assert_eq!(
            validate_input(&input, true, "12345"),
            Err(InputError::PatternMismatch)
        );
    }

    #[test]
    fn constraint_bounds_are_enforced() {
        let input = InputSpec {
            constraint: Some(Constraint {
                min_len: Some(2),
                max: Some(100.0),
                ..Constraint::default()
            }),
            ..InputSpec::new(InputKind::Numeric)
        };
        assert_eq!(
            validate_input(&input, true, "5"),
            Err(InputError::TooShort { min: 2 })
        );
        assert_eq!(
            validate_input(&input, true, "150"),
            Err(InputError::AboveMaximum { max: 100.0 })
        );
    }

    #[test]
    fn buttons_match_case_insensitively() {
        let buttons = vec!["Let's get going!".to_string()];
        assert_eq!(
            validate_button(&buttons, "let's get going!"),
            Ok("Let's get going!".into())
        );
        assert!(validate_button(&buttons, "nope").is_err());
    }
}
