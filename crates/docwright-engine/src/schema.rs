//! Question catalog and tag metadata.
//!
//! Loading is the single validation gate: every check that can be done
//! against the catalog alone happens here, so the rest of the engine can
//! assume ids are unique and every reference resolves.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::complexity::ComplexityLevel;
use crate::error::SchemaError;
use crate::expr::{Condition, ConditionSource};

const BUILTIN_QUESTIONS: &str = include_str!("../catalog/questions.yaml");
const BUILTIN_TAGS: &str = include_str!("../catalog/tags.yaml");

/// Tag every foundational question carries; always retained by the router.
pub const FOUNDATION_TAG: &str = "foundation";

/// Interview pass in which a question is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Core,
    Review,
    DeepDive,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Core, Stage::Review, Stage::DeepDive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Core => "core",
            Stage::Review => "review",
            Stage::DeepDive => "deep_dive",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "core" => Ok(Stage::Core),
            "review" => Ok(Stage::Review),
            "deep_dive" | "deepdive" => Ok(Stage::DeepDive),
            _ => Err(format!("Unknown stage: {}", s)),
        }
    }
}

/// Kind of input a question expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Text,
    Textarea,
    Select,
    MultiSelect,
    Boolean,
    Number,
    Date,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::Textarea => "textarea",
            QuestionType::Select => "select",
            QuestionType::MultiSelect => "multi_select",
            QuestionType::Boolean => "boolean",
            QuestionType::Number => "number",
            QuestionType::Date => "date",
        }
    }

    pub fn has_options(&self) -> bool {
        matches!(self, QuestionType::Select | QuestionType::MultiSelect)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value shape named by a constraint bag's `type` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Array,
}

/// A compiled `pattern` constraint.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for Pattern {
    type Error = regex::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Regex::new(&value).map(Pattern)
    }
}

impl Serialize for Pattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Pattern::try_from(raw).map_err(serde::de::Error::custom)
    }
}

/// Declared constraints on an answer. Closed set of keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Constraints {
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "type", default)]
    pub value_type: Option<ValueType>,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
    #[serde(default)]
    pub min_items: Option<usize>,
    #[serde(default)]
    pub max_items: Option<usize>,
    #[serde(default)]
    pub pattern: Option<Pattern>,
    #[serde(default)]
    pub allowed_values: Vec<String>,
}

/// Guidance shown alongside a question. Opaque to the engine apart from
/// being copied into failed validation results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Help {
    #[serde(default)]
    pub why: Option<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub learn_more: Option<String>,
}

/// One interview item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub stage: Stage,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub prompt: String,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub validation: Constraints,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub skip_if: Option<ConditionSource>,
    #[serde(default)]
    pub triggers: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub help: Option<Help>,
}

impl Question {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn is_foundation(&self) -> bool {
        self.has_tag(FOUNDATION_TAG)
    }

    pub fn is_required(&self) -> bool {
        self.validation.required
    }

    /// The parsed skip condition. Always a tree for questions loaded
    /// through a [`Schema`].
    pub fn skip_condition(&self) -> Option<&Condition> {
        match &self.skip_if {
            Some(ConditionSource::Tree(condition)) => Some(condition),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    #[allow(dead_code)]
    version: Option<u32>,
    questions: Vec<Question>,
}

/// The validated, read-only question catalog.
#[derive(Debug, Clone)]
pub struct Schema {
    questions: Vec<Question>,
    index: HashMap<String, usize>,
    follow_ups: BTreeSet<String>,
}

/// Load the catalog compiled into the binary.
pub fn load_questionnaire() -> Result<Schema, SchemaError> {
    Schema::from_yaml_str(BUILTIN_QUESTIONS)
}

/// Load an operator-supplied catalog (YAML or JSON).
pub fn load_questionnaire_from_path(path: &Path) -> Result<Schema, SchemaError> {
    let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Schema::from_yaml_str(&content)
}

impl Schema {
    pub fn from_yaml_str(content: &str) -> Result<Self, SchemaError> {
        let file: CatalogFile = serde_yaml::from_str(content)?;
        Self::from_questions(file.questions)
    }

    /// Validate structural integrity and compile legacy skip conditions.
    pub fn from_questions(mut questions: Vec<Question>) -> Result<Self, SchemaError> {
        if questions.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut index = HashMap::with_capacity(questions.len());
        for (position, question) in questions.iter().enumerate() {
            if index.insert(question.id.clone(), position).is_some() {
                return Err(SchemaError::DuplicateId(question.id.clone()));
            }
            if question.tags.iter().all(|t| t.trim().is_empty()) {
                return Err(SchemaError::MissingTags(question.id.clone()));
            }
            if question.kind.has_options() && question.options.is_empty() {
                return Err(SchemaError::MissingOptions(
                    question.id.clone(),
                    question.kind.as_str(),
                ));
            }
        }

        let mut follow_ups = BTreeSet::new();
        for question in &mut questions {
            for (answer, targets) in &question.triggers {
                for target in targets {
                    if !index.contains_key(target) {
                        return Err(SchemaError::UnknownTriggerReference {
                            question: question.id.clone(),
                            answer: answer.clone(),
                            reference: target.clone(),
                        });
                    }
                    follow_ups.insert(target.clone());
                }
            }

            if let Some(source) = &question.skip_if {
                let condition =
                    source
                        .compile()
                        .map_err(|source| SchemaError::InvalidExpression {
                            question: question.id.clone(),
                            source,
                        })?;
                for field in condition.referenced_fields() {
                    if field == question.id {
                        return Err(SchemaError::SelfReference(question.id.clone()));
                    }
                    if !index.contains_key(field) {
                        return Err(SchemaError::UnknownSkipReference {
                            question: question.id.clone(),
                            reference: field.to_string(),
                        });
                    }
                }
                question.skip_if = Some(ConditionSource::Tree(condition));
            }
        }

        debug!(
            questions = questions.len(),
            follow_ups = follow_ups.len(),
            "Loaded questionnaire"
        );

        Ok(Self {
            questions,
            index,
            follow_ups,
        })
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn question_by_id(&self, id: &str) -> Option<&Question> {
        self.index.get(id).map(|&i| &self.questions[i])
    }

    pub fn questions_by_stage(&self, stage: Stage) -> Vec<&Question> {
        self.questions.iter().filter(|q| q.stage == stage).collect()
    }

    pub fn questions_by_tag(&self, tag: &str) -> Vec<&Question> {
        self.questions.iter().filter(|q| q.has_tag(tag)).collect()
    }

    /// Ids that some question's `triggers` can reveal.
    pub fn follow_up_ids(&self) -> &BTreeSet<String> {
        &self.follow_ups
    }

    pub fn is_follow_up(&self, id: &str) -> bool {
        self.follow_ups.contains(id)
    }

    /// Every tag used by the catalog, sorted.
    pub fn tags(&self) -> BTreeSet<&str> {
        self.questions
            .iter()
            .flat_map(|q| q.tags.iter().map(String::as_str))
            .collect()
    }
}

/// Display metadata for one tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagInfo {
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Routing and scoring metadata for one question id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMetadata {
    /// Extra tags, merged with the question's own.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub related: Vec<String>,
    /// Tiers at which the field matters. Empty means every tier.
    #[serde(default)]
    pub levels: Vec<ComplexityLevel>,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

impl FieldMetadata {
    pub fn relevant_at(&self, level: ComplexityLevel) -> bool {
        self.levels.is_empty() || self.levels.contains(&level)
    }
}

/// Tag labels plus per-field metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagMetadata {
    #[serde(default)]
    pub tags: BTreeMap<String, TagInfo>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldMetadata>,
}

/// Load the tag metadata compiled into the binary.
pub fn load_tag_metadata() -> Result<TagMetadata, SchemaError> {
    TagMetadata::from_yaml_str(BUILTIN_TAGS)
}

pub fn load_tag_metadata_from_path(path: &Path) -> Result<TagMetadata, SchemaError> {
    let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    TagMetadata::from_yaml_str(&content)
}

impl TagMetadata {
    pub fn from_yaml_str(content: &str) -> Result<Self, SchemaError> {
        let metadata: TagMetadata = serde_yaml::from_str(content)?;
        debug!(
            tags = metadata.tags.len(),
            fields = metadata.fields.len(),
            "Loaded tag metadata"
        );
        Ok(metadata)
    }

    /// Reject metadata that names questions the catalog does not define.
    pub fn check_against(&self, schema: &Schema) -> Result<(), SchemaError> {
        for (id, field) in &self.fields {
            if schema.question_by_id(id).is_none() {
                return Err(SchemaError::UnknownMetadataField(id.clone()));
            }
            if let Some(missing) = field
                .related
                .iter()
                .find(|related| schema.question_by_id(related).is_none())
            {
                return Err(SchemaError::UnknownMetadataField(missing.clone()));
            }
        }
        Ok(())
    }

    pub fn field(&self, id: &str) -> Option<&FieldMetadata> {
        self.fields.get(id)
    }

    /// The display label for a tag, falling back to the tag itself.
    pub fn label_for<'a>(&'a self, tag: &'a str) -> &'a str {
        self.tags
            .get(tag)
            .map(|info| info.label.as_str())
            .unwrap_or(tag)
    }

    /// A question's own tags followed by any metadata-declared extras.
    pub fn effective_tags<'a>(&'a self, question: &'a Question) -> Vec<&'a str> {
        let mut tags: Vec<&str> = question.tags.iter().map(String::as_str).collect();
        if let Some(field) = self.fields.get(&question.id) {
            for extra in &field.tags {
                if !tags.contains(&extra.as_str()) {
                    tags.push(extra.as_str());
                }
            }
        }
        tags
    }

    /// Weight of a field for completeness scoring; 1 when undeclared.
    pub fn weight_of(&self, id: &str) -> u32 {
        self.fields.get(id).map(|f| f.weight).unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
questions:
  - id: deployment.model
    stage: core
    type: select
    prompt: Where will it run?
    options: [cloud, on-premise, hybrid]
    tags: [foundation, infrastructure]
    triggers:
      cloud: [cloud.provider]
  - id: cloud.provider
    stage: core
    type: select
    prompt: Which provider?
    options: [aws, gcp, azure]
    tags: [infrastructure]
    skip_if: "deployment.model != 'cloud'"
"#;

    #[test]
    fn test_loads_and_compiles_legacy_skip() {
        let schema = Schema::from_yaml_str(CATALOG).unwrap();
        assert_eq!(schema.len(), 2);
        let provider = schema.question_by_id("cloud.provider").unwrap();
        assert_eq!(
            provider.skip_condition(),
            Some(&Condition::Neq("deployment.model".into(), "cloud".into()))
        );
        assert!(schema.is_follow_up("cloud.provider"));
        assert!(!schema.is_follow_up("deployment.model"));
    }

    #[test]
    fn test_lookup_helpers() {
        let schema = Schema::from_yaml_str(CATALOG).unwrap();
        assert_eq!(schema.questions_by_stage(Stage::Core).len(), 2);
        assert!(schema.questions_by_stage(Stage::Review).is_empty());
        assert_eq!(schema.questions_by_tag("foundation").len(), 1);
        assert!(schema.question_by_id("missing").is_none());
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let catalog = r#"
questions:
  - {id: a, stage: core, type: text, prompt: A, tags: [foundation]}
  - {id: a, stage: review, type: text, prompt: A again, tags: [foundation]}
"#;
        let err = Schema::from_yaml_str(catalog).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateId(id) if id == "a"));
    }

    #[test]
    fn test_rejects_dangling_references() {
        let skip = r#"
questions:
  - id: a
    stage: core
    type: text
    prompt: A
    tags: [foundation]
    skip_if: {eq: [ghost, x]}
"#;
        assert!(matches!(
            Schema::from_yaml_str(skip).unwrap_err(),
            SchemaError::UnknownSkipReference { reference, .. } if reference == "ghost"
        ));

        let trigger = r#"
questions:
  - id: a
    stage: core
    type: boolean
    prompt: A
    tags: [foundation]
    triggers:
      "true": [ghost]
"#;
        assert!(matches!(
            Schema::from_yaml_str(trigger).unwrap_err(),
            SchemaError::UnknownTriggerReference { reference, .. } if reference == "ghost"
        ));
    }

    #[test]
    fn test_rejects_structural_problems() {
        let no_tags = "questions:\n  - {id: a, stage: core, type: text, prompt: A}\n";
        assert!(matches!(
            Schema::from_yaml_str(no_tags).unwrap_err(),
            SchemaError::MissingTags(_)
        ));

        let no_options =
            "questions:\n  - {id: a, stage: core, type: select, prompt: A, tags: [x]}\n";
        assert!(matches!(
            Schema::from_yaml_str(no_options).unwrap_err(),
            SchemaError::MissingOptions(_, "select")
        ));

        let bad_pattern = "questions:\n  - {id: a, stage: core, type: text, prompt: A, tags: [x], validation: {pattern: '(unclosed'}}\n";
        assert!(matches!(
            Schema::from_yaml_str(bad_pattern).unwrap_err(),
            SchemaError::Parse(_)
        ));

        let bad_expr = "questions:\n  - {id: a, stage: core, type: text, prompt: A, tags: [x], skip_if: 'a =='}\n";
        assert!(matches!(
            Schema::from_yaml_str(bad_expr).unwrap_err(),
            SchemaError::InvalidExpression { .. } | SchemaError::SelfReference(_)
        ));

        let unknown_constraint = "questions:\n  - {id: a, stage: core, type: text, prompt: A, tags: [x], validation: {shape: round}}\n";
        assert!(matches!(
            Schema::from_yaml_str(unknown_constraint).unwrap_err(),
            SchemaError::Parse(_)
        ));
    }

    #[test]
    fn test_tag_metadata_extends_tags_and_checks_fields() {
        let schema = Schema::from_yaml_str(CATALOG).unwrap();
        let metadata = TagMetadata::from_yaml_str(
            r#"
tags:
  infrastructure: {label: Infrastructure}
fields:
  cloud.provider:
    tags: [operations]
    levels: [standard, enterprise]
    weight: 3
"#,
        )
        .unwrap();
        metadata.check_against(&schema).unwrap();

        let provider = schema.question_by_id("cloud.provider").unwrap();
        assert_eq!(
            metadata.effective_tags(provider),
            vec!["infrastructure", "operations"]
        );
        assert_eq!(metadata.label_for("infrastructure"), "Infrastructure");
        assert_eq!(metadata.label_for("unknown"), "unknown");
        assert_eq!(metadata.weight_of("cloud.provider"), 3);
        assert_eq!(metadata.weight_of("deployment.model"), 1);

        let dangling = TagMetadata::from_yaml_str("fields:\n  ghost: {weight: 2}\n").unwrap();
        assert!(matches!(
            dangling.check_against(&schema).unwrap_err(),
            SchemaError::UnknownMetadataField(id) if id == "ghost"
        ));
    }

    #[test]
    fn test_builtin_catalog_is_consistent() {
        let schema = load_questionnaire().unwrap();
        let metadata = load_tag_metadata().unwrap();
        metadata.check_against(&schema).unwrap();
        for stage in Stage::ALL {
            assert!(!schema.questions_by_stage(stage).is_empty());
        }
        assert!(!schema.questions_by_tag(FOUNDATION_TAG).is_empty());
    }
}
