//! Tag-based question routing.

use tracing::trace;

use crate::answers::AnswerMap;
use crate::rules::filter_questions;
use crate::schema::{Question, TagMetadata};

/// Narrows a question list to the requested topics.
///
/// Foundation questions always pass. Everything else passes when any of its
/// tags is selected. Skip conditions are applied afterwards, so routing never
/// surfaces a question its dependencies hide.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagRouter<'m> {
    metadata: Option<&'m TagMetadata>,
}

impl<'m> TagRouter<'m> {
    pub fn new() -> Self {
        Self { metadata: None }
    }

    /// Match against metadata-extended tags as well as each question's own.
    pub fn with_metadata(metadata: &'m TagMetadata) -> Self {
        Self {
            metadata: Some(metadata),
        }
    }

    pub fn route<'a, I, S>(&self, questions: I, selected_tags: &[S], answers: &AnswerMap) -> Vec<&'a Question>
    where
        I: IntoIterator<Item = &'a Question>,
        S: AsRef<str>,
    {
        let selected: Vec<String> = selected_tags
            .iter()
            .map(|t| normalize(t.as_ref()))
            .filter(|t| !t.is_empty())
            .collect();

        if selected.is_empty() {
            return filter_questions(questions, answers);
        }

        let tagged: Vec<&'a Question> = questions
            .into_iter()
            .filter(|q| q.is_foundation() || self.intersects(q, &selected))
            .collect();
        trace!(selected = ?selected, retained = tagged.len(), "Routed questions by tag");

        filter_questions(tagged, answers)
    }

    fn intersects(&self, question: &Question, selected: &[String]) -> bool {
        let tags: Vec<&str> = match self.metadata {
            Some(metadata) => metadata.effective_tags(question),
            None => question.tags.iter().map(String::as_str).collect(),
        };
        tags.into_iter().any(|tag| selected.contains(&normalize(tag)))
    }
}

fn normalize(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Route by each question's own tags.
pub fn filter_by_tags<'a, I, S>(questions: I, selected_tags: &[S], answers: &AnswerMap) -> Vec<&'a Question>
where
    I: IntoIterator<Item = &'a Question>,
    S: AsRef<str>,
{
    TagRouter::new().route(questions, selected_tags, answers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    fn schema() -> Schema {
        Schema::from_yaml_str(
            r#"
questions:
  - {id: project.name, stage: core, type: text, prompt: Name, tags: [foundation]}
  - {id: deployment.model, stage: core, type: select, prompt: Model, options: [cloud, on-premise], tags: [infrastructure]}
  - id: cloud.provider
    stage: core
    type: select
    prompt: Provider
    options: [aws, gcp]
    tags: [infrastructure, cloud]
    skip_if: {neq: [deployment.model, cloud]}
  - {id: privacy.pii, stage: core, type: boolean, prompt: PII, tags: [privacy, security]}
  - {id: api.style, stage: core, type: select, prompt: Style, options: [rest, grpc], tags: [api]}
"#,
        )
        .unwrap()
    }

    fn ids<'a>(questions: &[&'a Question]) -> Vec<&'a str> {
        questions.iter().map(|q| q.id.as_str()).collect()
    }

    #[test]
    fn test_empty_selection_only_applies_skips() {
        let schema = schema();
        let mut answers = AnswerMap::new();
        answers.insert("deployment.model", "on-premise");
        let none: [&str; 0] = [];
        assert_eq!(
            ids(&filter_by_tags(schema.questions(), &none, &answers)),
            ids(&filter_questions(schema.questions(), &answers))
        );
    }

    #[test]
    fn test_or_semantics_keep_catalog_order_and_foundation() {
        let schema = schema();
        let answers = AnswerMap::new();
        let routed = filter_by_tags(schema.questions(), &["api", "privacy"], &answers);
        assert_eq!(ids(&routed), vec!["project.name", "privacy.pii", "api.style"]);
    }

    #[test]
    fn test_routing_never_bypasses_skip() {
        let schema = schema();
        let mut answers = AnswerMap::new();
        answers.insert("deployment.model", "on-premise");
        let routed = filter_by_tags(schema.questions(), &["cloud"], &answers);
        assert_eq!(ids(&routed), vec!["project.name"]);
    }

    #[test]
    fn test_metadata_tags_extend_matching() {
        let schema = schema();
        let metadata =
            TagMetadata::from_yaml_str("fields:\n  api.style: {tags: [integrations]}\n").unwrap();
        let answers = AnswerMap::new();

        let plain = filter_by_tags(schema.questions(), &["Integrations"], &answers);
        assert_eq!(ids(&plain), vec!["project.name"]);

        let routed =
            TagRouter::with_metadata(&metadata).route(schema.questions(), &["Integrations"], &answers);
        assert_eq!(ids(&routed), vec!["project.name", "api.style"]);
    }
}
