//! # docwright-engine
//!
//! The adaptive questionnaire engine behind docwright.
//!
//! ## Key Types
//!
//! - [`Schema`] - Validated question catalog, loaded once
//! - [`TagMetadata`] - Tag labels and per-field routing/scoring metadata
//! - [`AnswerMap`] - Answers keyed by question id
//! - [`Condition`] - Parsed skip condition
//! - [`ComplexityLevel`] - Five graduated document tiers
//! - [`ValidationResult`] - Outcome of validating one answer
//!
//! Every operation except catalog loading is a pure function of its inputs.

mod answers;
mod completeness;
pub mod complexity;
mod error;
mod expr;
mod router;
mod rules;
mod schema;
mod validate;

pub use answers::{AnswerMap, AnswerValue};
pub use completeness::{assess_completeness, Completeness};
pub use complexity::{
    assess, detect_risk_factors, meets_minimum_fields, recommend_level, score,
    sections_for_level, ComplexityAssessment, ComplexityLevel, RiskFactors, ScoreComponent,
};
pub use error::SchemaError;
pub use expr::{Condition, ConditionSource, ExpressionError};
pub use router::{filter_by_tags, TagRouter};
pub use rules::{evaluate_skip, evaluate_skip_with, expand_triggers, filter_questions};
pub use schema::{
    load_questionnaire, load_questionnaire_from_path, load_tag_metadata,
    load_tag_metadata_from_path, Constraints, FieldMetadata, Help, Pattern, Question,
    QuestionType, Schema, Stage, TagInfo, TagMetadata, ValueType, FOUNDATION_TAG,
};
pub use validate::{validate, ValidationResult, DATE_FORMAT};
