//! Answer file export and import.
//!
//! An answer file is a flat JSON object of question id to answer plus two
//! reserved keys recording the tier used and when the file was written.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use docwright_engine::{AnswerMap, AnswerValue, ComplexityLevel};

pub const LEVEL_KEY: &str = "_complexity_level";
pub const EXPORTED_AT_KEY: &str = "_exported_at";

/// Default answer file name inside the output directory
pub const ANSWERS_FILE_NAME: &str = "docwright-answers.json";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} must contain a JSON object of answers")]
    NotAnObject(PathBuf),

    #[error("Answer '{key}' in {path} is not a string, number, boolean or list of strings")]
    UnsupportedValue { path: PathBuf, key: String },

    #[error("Unknown complexity level '{value}' in {path}")]
    InvalidLevel { path: PathBuf, value: String },
}

/// Answers read back from an answer file.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedAnswers {
    pub answers: AnswerMap,
    pub level: Option<ComplexityLevel>,
    pub exported_at: Option<DateTime<Utc>>,
}

/// The JSON document written by [`export_answers`].
pub fn answers_to_json(
    answers: &AnswerMap,
    level: ComplexityLevel,
    exported_at: DateTime<Utc>,
) -> Value {
    let mut object = Map::new();
    for (id, value) in answers.iter() {
        object.insert(id.clone(), answer_to_json(value));
    }
    object.insert(LEVEL_KEY.to_string(), Value::String(level.to_string()));
    object.insert(
        EXPORTED_AT_KEY.to_string(),
        Value::String(exported_at.to_rfc3339()),
    );
    Value::Object(object)
}

fn answer_to_json(value: &AnswerValue) -> Value {
    match value {
        AnswerValue::Bool(b) => Value::Bool(*b),
        AnswerValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        AnswerValue::Text(s) => Value::String(s.clone()),
        AnswerValue::List(items) => {
            Value::Array(items.iter().cloned().map(Value::String).collect())
        }
    }
}

/// Write `answers` as pretty JSON to `path`, creating parent directories.
pub fn export_answers(
    answers: &AnswerMap,
    level: ComplexityLevel,
    path: &Path,
) -> Result<(), ExportError> {
    let io_error = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }

    let document = answers_to_json(answers, level, Utc::now());
    let content = serde_json::to_string_pretty(&document).map_err(|source| ExportError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, content + "\n").map_err(io_error)
}

pub fn import_answers(path: &Path) -> Result<ImportedAnswers, ExportError> {
    let content = std::fs::read_to_string(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_answers(&content, path)
}

/// Parse an answer file's contents. `path` is only used in errors.
pub fn parse_answers(content: &str, path: &Path) -> Result<ImportedAnswers, ExportError> {
    let document: Value = serde_json::from_str(content).map_err(|source| ExportError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Object(object) = document else {
        return Err(ExportError::NotAnObject(path.to_path_buf()));
    };

    let mut imported = ImportedAnswers {
        answers: AnswerMap::new(),
        level: None,
        exported_at: None,
    };

    for (key, value) in object {
        match key.as_str() {
            LEVEL_KEY => {
                let text = value.as_str().unwrap_or_default();
                let level = text.parse().map_err(|_| ExportError::InvalidLevel {
                    path: path.to_path_buf(),
                    value: value.to_string(),
                })?;
                imported.level = Some(level);
            }
            // an unreadable timestamp is informational only
            EXPORTED_AT_KEY => {
                imported.exported_at = value
                    .as_str()
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    .map(|dt| dt.with_timezone(&Utc));
            }
            _ => {
                if value.is_null() {
                    continue;
                }
                let answer = json_to_answer(value).ok_or_else(|| ExportError::UnsupportedValue {
                    path: path.to_path_buf(),
                    key: key.clone(),
                })?;
                imported.answers.insert(key, answer);
            }
        }
    }

    Ok(imported)
}

fn json_to_answer(value: Value) -> Option<AnswerValue> {
    match value {
        Value::Bool(b) => Some(AnswerValue::Bool(b)),
        Value::Number(n) => n.as_f64().map(AnswerValue::Number),
        Value::String(s) => Some(AnswerValue::Text(s)),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect::<Option<Vec<String>>>()
            .map(AnswerValue::List),
        Value::Null | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docwright_engine::assess;
    use tempfile::TempDir;

    fn sample() -> AnswerMap {
        let mut answers = AnswerMap::new();
        answers.insert("project.name", "Patient Portal");
        answers.insert("privacy.pii", true);
        answers.insert("privacy.regulations", AnswerValue::list(["hipaa", "gdpr"]));
        answers.insert("operations.sla", "99.99");
        answers.insert("architecture.expected_users", 120000.0);
        answers
    }

    #[test]
    fn test_export_is_flat_with_reserved_keys() {
        let at = Utc::now();
        let json = answers_to_json(&sample(), ComplexityLevel::Comprehensive, at);

        assert_eq!(json["project.name"], "Patient Portal");
        assert_eq!(json["privacy.pii"], true);
        assert_eq!(json["privacy.regulations"][1], "gdpr");
        assert_eq!(json[LEVEL_KEY], "comprehensive");
        assert_eq!(json[EXPORTED_AT_KEY], at.to_rfc3339());
    }

    #[test]
    fn test_round_trip_keeps_answers_and_level() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join(ANSWERS_FILE_NAME);
        let answers = sample();
        let level = assess(&answers).level;

        export_answers(&answers, level, &path).unwrap();
        let imported = import_answers(&path).unwrap();

        assert_eq!(imported.answers, answers);
        assert_eq!(imported.level, Some(level));
        assert!(imported.exported_at.is_some());
        assert_eq!(assess(&imported.answers).level, level);
    }

    #[test]
    fn test_rejects_non_object_and_nested_values() {
        let path = Path::new("answers.json");
        assert!(matches!(
            parse_answers("[1, 2]", path).unwrap_err(),
            ExportError::NotAnObject(_)
        ));
        assert!(matches!(
            parse_answers(r#"{"a": {"b": 1}}"#, path).unwrap_err(),
            ExportError::UnsupportedValue { key, .. } if key == "a"
        ));
        assert!(matches!(
            parse_answers(r#"{"a": [1, 2]}"#, path).unwrap_err(),
            ExportError::UnsupportedValue { .. }
        ));
        assert!(matches!(
            parse_answers(r#"{"_complexity_level": "huge"}"#, path).unwrap_err(),
            ExportError::InvalidLevel { .. }
        ));
        assert!(matches!(
            parse_answers("{not json", path).unwrap_err(),
            ExportError::Json { .. }
        ));
    }

    #[test]
    fn test_nulls_are_unanswered_and_reserved_keys_are_stripped() {
        let imported = parse_answers(
            r#"{"a": null, "b": "x", "_exported_at": "garbage"}"#,
            Path::new("answers.json"),
        )
        .unwrap();
        assert!(!imported.answers.contains("a"));
        assert_eq!(imported.answers.as_text("b"), Some("x"));
        assert_eq!(imported.answers.len(), 1);
        assert!(imported.level.is_none());
        assert!(imported.exported_at.is_none());
    }
}
