//! How complete ("honest") an answer set is for a given tier.

use serde::{Deserialize, Serialize};

use crate::answers::AnswerMap;
use crate::complexity::ComplexityLevel;
use crate::rules::evaluate_skip;
use crate::schema::{Schema, TagMetadata};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completeness {
    pub answered_weight: u32,
    pub total_weight: u32,
    /// `answered_weight / total_weight`, 1.0 when nothing is relevant.
    pub ratio: f64,
    /// Relevant, visible, unanswered ids in catalog order.
    pub missing: Vec<String>,
}

/// Weighted share of the fields relevant at `level` that have an answer.
///
/// Questions hidden by their skip condition are not counted; a field with no
/// metadata weighs 1 and is relevant at every tier.
pub fn assess_completeness(
    schema: &Schema,
    metadata: &TagMetadata,
    answers: &AnswerMap,
    level: ComplexityLevel,
) -> Completeness {
    let mut answered_weight = 0;
    let mut total_weight = 0;
    let mut missing = Vec::new();

    for question in schema.questions() {
        let relevant = metadata
            .field(&question.id)
            .map(|field| field.relevant_at(level))
            .unwrap_or(true);
        if !relevant || evaluate_skip(question, answers) {
            continue;
        }

        let weight = metadata.weight_of(&question.id);
        total_weight += weight;
        match answers.get(&question.id) {
            Some(value) if !value.is_empty() => answered_weight += weight,
            _ => missing.push(question.id.clone()),
        }
    }

    let ratio = if total_weight == 0 {
        1.0
    } else {
        f64::from(answered_weight) / f64::from(total_weight)
    };

    Completeness {
        answered_weight,
        total_weight,
        ratio,
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_ratio_respects_levels_and_skips() {
        let schema = Schema::from_yaml_str(
            r#"
questions:
  - {id: a, stage: core, type: text, prompt: A, tags: [foundation]}
  - {id: b, stage: core, type: text, prompt: B, tags: [x]}
  - {id: c, stage: review, type: text, prompt: C, tags: [x], skip_if: "a == 'skip'"}
  - {id: d, stage: deep_dive, type: text, prompt: D, tags: [x]}
"#,
        )
        .unwrap();
        let metadata = TagMetadata::from_yaml_str(
            r#"
fields:
  b: {weight: 3}
  d: {levels: [enterprise], weight: 5}
"#,
        )
        .unwrap();

        let mut answers = AnswerMap::new();
        answers.insert("b", "done");

        let base = assess_completeness(&schema, &metadata, &answers, ComplexityLevel::Base);
        assert_eq!(base.total_weight, 5);
        assert_eq!(base.answered_weight, 3);
        assert_eq!(base.missing, vec!["a", "c"]);

        answers.insert("a", "skip");
        let enterprise =
            assess_completeness(&schema, &metadata, &answers, ComplexityLevel::Enterprise);
        assert_eq!(enterprise.total_weight, 9);
        assert_eq!(enterprise.answered_weight, 4);
        assert_eq!(enterprise.missing, vec!["d"]);
    }
}
