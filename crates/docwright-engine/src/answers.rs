//! The answer map: the only mutable state the engine reads.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single collected answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl AnswerValue {
    pub fn text(s: impl Into<String>) -> Self {
        AnswerValue::Text(s.into())
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AnswerValue::List(items.into_iter().map(Into::into).collect())
    }

    /// True for empty text (after trimming) and empty lists.
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Text(s) => s.trim().is_empty(),
            AnswerValue::List(items) => items.is_empty(),
            AnswerValue::Bool(_) | AnswerValue::Number(_) => false,
        }
    }

    /// Keys used to look this answer up in a question's `triggers` map.
    pub fn trigger_keys(&self) -> Vec<String> {
        match self {
            AnswerValue::List(items) => items.clone(),
            other => vec![other.to_string()],
        }
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerValue::Bool(b) => write!(f, "{}", b),
            AnswerValue::Number(n) => write!(f, "{}", format_number(*n)),
            AnswerValue::Text(s) => write!(f, "{}", s),
            AnswerValue::List(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

impl From<bool> for AnswerValue {
    fn from(value: bool) -> Self {
        AnswerValue::Bool(value)
    }
}

impl From<f64> for AnswerValue {
    fn from(value: f64) -> Self {
        AnswerValue::Number(value)
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        AnswerValue::Text(value)
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(value: Vec<String>) -> Self {
        AnswerValue::List(value)
    }
}

/// Whole numbers print without a fractional part so `2` and `2.0` produce the
/// same trigger key.
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Answers keyed by question id. A missing key means "unanswered", which is
/// distinct from an explicit empty value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap {
    values: BTreeMap<String, AnswerValue>,
}

impl AnswerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, value: impl Into<AnswerValue>) {
        self.values.insert(id.into(), value.into());
    }

    pub fn remove(&mut self, id: &str) -> Option<AnswerValue> {
        self.values.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&AnswerValue> {
        self.values.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.values.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AnswerValue)> {
        self.values.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    /// Later answers win on key collisions.
    pub fn merge(&mut self, other: AnswerMap) {
        self.values.extend(other.values);
    }

    pub fn as_bool(&self, id: &str) -> Option<bool> {
        match self.get(id)? {
            AnswerValue::Bool(b) => Some(*b),
            AnswerValue::Text(s) => parse_bool(s),
            _ => None,
        }
    }

    pub fn as_text(&self, id: &str) -> Option<&str> {
        match self.get(id)? {
            AnswerValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numbers, and text that parses as one (`"99.99"`, `"99.99%"`).
    pub fn as_number(&self, id: &str) -> Option<f64> {
        match self.get(id)? {
            AnswerValue::Number(n) => Some(*n),
            AnswerValue::Text(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
            _ => None,
        }
    }

    /// A list answer, or a one-item list for scalar text.
    pub fn as_list(&self, id: &str) -> Vec<String> {
        match self.get(id) {
            Some(AnswerValue::List(items)) => items.clone(),
            Some(AnswerValue::Text(s)) if !s.trim().is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }
}

impl FromIterator<(String, AnswerValue)> for AnswerMap {
    fn from_iter<T: IntoIterator<Item = (String, AnswerValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_serialization_is_flat() {
        let mut answers = AnswerMap::new();
        answers.insert("privacy.pii", true);
        answers.insert("project.name", "Ledger");
        answers.insert("privacy.regulations", AnswerValue::list(["gdpr", "hipaa"]));
        answers.insert("architecture.expected_users", 5000.0);

        let json = serde_json::to_value(&answers).unwrap();
        assert_eq!(json["privacy.pii"], serde_json::json!(true));
        assert_eq!(json["privacy.regulations"], serde_json::json!(["gdpr", "hipaa"]));

        let parsed: AnswerMap = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, answers);
    }

    #[test]
    fn test_number_trigger_keys_drop_fraction() {
        assert_eq!(AnswerValue::Number(3.0).trigger_keys(), vec!["3"]);
        assert_eq!(AnswerValue::Number(99.9).trigger_keys(), vec!["99.9"]);
        assert_eq!(AnswerValue::Bool(true).trigger_keys(), vec!["true"]);
    }

    #[test]
    fn test_lenient_accessors() {
        let mut answers = AnswerMap::new();
        answers.insert("operations.sla", "99.95%");
        answers.insert("flag", "yes");
        answers.insert("single", "cloud");

        assert_eq!(answers.as_number("operations.sla"), Some(99.95));
        assert_eq!(answers.as_bool("flag"), Some(true));
        assert_eq!(answers.as_list("single"), vec!["cloud".to_string()]);
        assert!(answers.as_list("missing").is_empty());
    }

    #[test]
    fn test_empty_values_are_distinct_from_absent() {
        let mut answers = AnswerMap::new();
        answers.insert("notes", "");
        assert!(answers.contains("notes"));
        assert!(answers.get("notes").unwrap().is_empty());
        assert!(!answers.contains("other"));
    }
}
