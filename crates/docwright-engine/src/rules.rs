//! Visibility and follow-up expansion.

use tracing::debug;

use crate::answers::{AnswerMap, AnswerValue};
use crate::expr::ConditionSource;
use crate::schema::{Question, Schema};

/// Whether `question` should be hidden given the current answers.
///
/// Questions without a skip condition are never skipped. A question is only
/// hidden once its condition is definitely true; while the outcome still hangs
/// on an unanswered field it stays visible.
pub fn evaluate_skip(question: &Question, answers: &AnswerMap) -> bool {
    evaluate_skip_with(question, answers, &|_| false)
}

/// Like [`evaluate_skip`], but fields for which `settled` returns true are
/// treated as final even when absent (e.g. an optional question left blank).
pub fn evaluate_skip_with(
    question: &Question,
    answers: &AnswerMap,
    settled: &dyn Fn(&str) -> bool,
) -> bool {
    let compiled;
    let condition = match &question.skip_if {
        None => return false,
        Some(ConditionSource::Tree(condition)) => condition,
        // Legacy text only survives on questions built outside a Schema.
        Some(source) => match source.compile() {
            Ok(condition) => {
                compiled = condition;
                &compiled
            }
            Err(_) => return false,
        },
    };

    condition.evaluate_partial(answers, settled) == Some(true)
}

/// Follow-up questions revealed by `answer`.
///
/// Multi-select answers reveal the union over every selected value, in
/// selection order, without duplicates. Unknown ids are skipped.
pub fn expand_triggers<'a>(
    question: &Question,
    answer: &AnswerValue,
    schema: &'a Schema,
) -> Vec<&'a Question> {
    if question.triggers.is_empty() {
        return Vec::new();
    }

    let mut revealed: Vec<&'a Question> = Vec::new();
    for key in answer.trigger_keys() {
        let Some(targets) = question.triggers.get(&key) else {
            continue;
        };
        for id in targets {
            match schema.question_by_id(id) {
                Some(target) if !revealed.iter().any(|q| q.id == target.id) => {
                    revealed.push(target)
                }
                Some(_) => {}
                None => debug!(question = %question.id, target = %id, "Skipping unknown trigger"),
            }
        }
    }
    revealed
}

/// Questions that are not skipped, in their original order.
pub fn filter_questions<'a, I>(questions: I, answers: &AnswerMap) -> Vec<&'a Question>
where
    I: IntoIterator<Item = &'a Question>,
{
    questions
        .into_iter()
        .filter(|q| !evaluate_skip(q, answers))
        .collect()
}
