//! Per-answer validation.
//!
//! Checks run in three categories: required, type, then constraints. The
//! first failing category ends validation and every violation inside it is
//! reported. Messages come from fixed templates so internal parser errors
//! never reach the user.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::answers::{format_number, parse_bool, AnswerValue};
use crate::schema::{Constraints, Question, QuestionType, ValueType};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Outcome of validating one proposed answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learn_more: Option<String>,
    /// The coerced answer to store. `None` for an optional question left blank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<AnswerValue>,
}

impl ValidationResult {
    fn accepted(value: Option<AnswerValue>) -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            examples: None,
            learn_more: None,
            value,
        }
    }

    fn rejected(question: &Question, errors: Vec<String>) -> Self {
        let help = question.help.as_ref();
        Self {
            valid: false,
            errors,
            examples: help
                .filter(|h| !h.examples.is_empty())
                .map(|h| h.examples.clone()),
            learn_more: help.and_then(|h| h.learn_more.clone()),
            value: None,
        }
    }
}

pub fn validate(question: &Question, raw: &AnswerValue) -> ValidationResult {
    let rules = &question.validation;

    if raw.is_empty() {
        if rules.required {
            return ValidationResult::rejected(question, vec![required_message(question)]);
        }
        // An empty selection is an explicit answer; blank scalars are "skipped".
        if question.kind != QuestionType::MultiSelect {
            return ValidationResult::accepted(None);
        }
    }

    let value = match coerce(question.kind, raw) {
        Ok(value) => value,
        Err(message) => return ValidationResult::rejected(question, vec![message]),
    };

    if let Some(expected) = rules.value_type {
        if !matches_value_type(expected, &value) {
            return ValidationResult::rejected(question, vec![value_type_message(expected)]);
        }
    }

    let errors = constraint_errors(question, rules, &value);
    if errors.is_empty() {
        ValidationResult::accepted(Some(value))
    } else {
        ValidationResult::rejected(question, errors)
    }
}

fn required_message(question: &Question) -> String {
    match (question.kind, question.validation.min_items) {
        (QuestionType::MultiSelect, Some(min)) if min > 0 => {
            format!("Must select at least {} {}", min, plural(min, "item"))
        }
        _ => "This field is required".to_string(),
    }
}

fn coerce(kind: QuestionType, raw: &AnswerValue) -> Result<AnswerValue, String> {
    match kind {
        QuestionType::Text | QuestionType::Textarea => match raw {
            AnswerValue::Text(s) => Ok(AnswerValue::Text(s.trim().to_string())),
            AnswerValue::Number(n) => Ok(AnswerValue::Text(format_number(*n))),
            AnswerValue::Bool(b) => Ok(AnswerValue::Text(b.to_string())),
            AnswerValue::List(_) => Err("Must be a single text value".to_string()),
        },
        QuestionType::Select => match raw {
            AnswerValue::Text(s) => Ok(AnswerValue::Text(s.trim().to_string())),
            AnswerValue::List(items) if items.len() == 1 => Ok(AnswerValue::Text(items[0].clone())),
            _ => Err("Must select exactly one option".to_string()),
        },
        QuestionType::MultiSelect => match raw {
            AnswerValue::List(items) => Ok(AnswerValue::List(items.clone())),
            AnswerValue::Text(s) => Ok(AnswerValue::List(
                s.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(String::from)
                    .collect(),
            )),
            _ => Err("Must be a list of options".to_string()),
        },
        QuestionType::Boolean => match raw {
            AnswerValue::Bool(b) => Ok(AnswerValue::Bool(*b)),
            AnswerValue::Text(s) => parse_bool(s)
                .map(AnswerValue::Bool)
                .ok_or_else(|| "Must be yes or no".to_string()),
            _ => Err("Must be yes or no".to_string()),
        },
        QuestionType::Number => match raw {
            AnswerValue::Number(n) if n.is_finite() => Ok(AnswerValue::Number(*n)),
            AnswerValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(AnswerValue::Number)
                .ok_or_else(|| "Must be a number".to_string()),
            _ => Err("Must be a number".to_string()),
        },
        QuestionType::Date => match raw {
            AnswerValue::Text(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                .map(|date| AnswerValue::Text(date.format(DATE_FORMAT).to_string()))
                .map_err(|_| "Must be a date in YYYY-MM-DD format".to_string()),
            _ => Err("Must be a date in YYYY-MM-DD format".to_string()),
        },
    }
}

fn matches_value_type(expected: ValueType, value: &AnswerValue) -> bool {
    matches!(
        (expected, value),
        (ValueType::String, AnswerValue::Text(_))
            | (ValueType::Number, AnswerValue::Number(_))
            | (ValueType::Boolean, AnswerValue::Bool(_))
            | (ValueType::Array, AnswerValue::List(_))
    )
}

fn value_type_message(expected: ValueType) -> String {
    match expected {
        ValueType::String => "Must be text".to_string(),
        ValueType::Number => "Must be a number".to_string(),
        ValueType::Boolean => "Must be yes or no".to_string(),
        ValueType::Array => "Must be a list of options".to_string(),
    }
}

fn constraint_errors(question: &Question, rules: &Constraints, value: &AnswerValue) -> Vec<String> {
    let mut errors = Vec::new();

    match value {
        AnswerValue::Text(text) => {
            let length = text.chars().count();
            if let Some(min) = rules.min_length {
                if length < min {
                    errors.push(format!("Must be at least {} {}", min, plural(min, "character")));
                }
            }
            if let Some(max) = rules.max_length {
                if length > max {
                    errors.push(format!("Must be at most {} {}", max, plural(max, "character")));
                }
            }
            if let Some(pattern) = &rules.pattern {
                if !pattern.is_match(text) {
                    errors.push("Does not match the expected format".to_string());
                }
            }
            if !is_allowed(question, text) {
                errors.push("Must be one of the allowed values".to_string());
            }
        }
        AnswerValue::Number(n) => {
            if let Some(min) = rules.minimum {
                if *n < min {
                    errors.push(format!("Must be at least {}", format_number(min)));
                }
            }
            if let Some(max) = rules.maximum {
                if *n > max {
                    errors.push(format!("Must be at most {}", format_number(max)));
                }
            }
        }
        AnswerValue::List(items) => {
            let count = items.len();
            let too_few = rules.min_items.map(|min| count < min).unwrap_or(false);
            let too_many = rules.max_items.map(|max| count > max).unwrap_or(false);
            if too_few || too_many {
                errors.push(match (rules.min_items, rules.max_items) {
                    (Some(min), Some(max)) => {
                        format!("Must select between {} and {} items", min, max)
                    }
                    (Some(min), None) => {
                        format!("Must select at least {} {}", min, plural(min, "item"))
                    }
                    (None, Some(max)) => {
                        format!("Must select at most {} {}", max, plural(max, "item"))
                    }
                    (None, None) => unreachable!("count checks need a bound"),
                });
            }
            if items.iter().any(|item| !is_allowed(question, item)) {
                errors.push("Must be one of the allowed values".to_string());
            }
        }
        AnswerValue::Bool(_) => {}
    }

    errors
}

/// Membership against the declared options plus any `allowed_values`.
/// Questions declaring neither accept anything.
fn is_allowed(question: &Question, value: &str) -> bool {
    let allowed = &question.validation.allowed_values;
    let restricts = question.kind.has_options() || !allowed.is_empty();
    if !restricts {
        return true;
    }
    question.options.iter().any(|o| o == value) || allowed.iter().any(|a| a == value)
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        noun.to_string()
    } else {
        format!("{}s", noun)
    }
}
