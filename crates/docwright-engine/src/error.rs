use std::path::PathBuf;

use thiserror::Error;

use crate::expr::ExpressionError;

/// Structural problems found while loading a catalog. Always fatal: once a
/// [`Schema`](crate::Schema) exists every reference inside it resolves.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Duplicate question id '{0}'")]
    DuplicateId(String),

    #[error("Question '{0}' has no tags")]
    MissingTags(String),

    #[error("Question '{0}' is a {1} question but declares no options")]
    MissingOptions(String, &'static str),

    #[error("Question '{question}' skip_if references unknown question '{reference}'")]
    UnknownSkipReference { question: String, reference: String },

    #[error("Question '{0}' skip_if references itself")]
    SelfReference(String),

    #[error("Question '{question}' trigger '{answer}' references unknown question '{reference}'")]
    UnknownTriggerReference {
        question: String,
        answer: String,
        reference: String,
    },

    #[error("Question '{question}' has an invalid skip_if expression: {source}")]
    InvalidExpression {
        question: String,
        #[source]
        source: ExpressionError,
    },

    #[error("Tag metadata references unknown question '{0}'")]
    UnknownMetadataField(String),

    #[error("Catalog defines no questions")]
    Empty,
}
