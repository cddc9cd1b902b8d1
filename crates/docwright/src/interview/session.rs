//! Interview state: which question comes next and what has been collected.
//!
//! The session owns the answer map and the follow-up queue. It never
//! prompts; the caller asks each question and feeds the raw answer back
//! through [`InterviewSession::submit`].

use std::collections::{BTreeSet, VecDeque};

use docwright_engine::{
    assess, assess_completeness, evaluate_skip_with, expand_triggers, validate, AnswerMap,
    AnswerValue, Completeness, ComplexityAssessment, ComplexityLevel, Question, Schema, Stage,
    TagMetadata, TagRouter, ValidationResult,
};

/// Outcome of submitting one answer
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Stored (or recorded as declined when blank). Lists newly queued follow-ups.
    Accepted { follow_ups: Vec<String> },
    /// Nothing stored; re-prompt with the guidance in the result.
    Rejected(ValidationResult),
}

pub struct InterviewSession<'s> {
    schema: &'s Schema,
    metadata: &'s TagMetadata,
    tags: Vec<String>,
    answers: AnswerMap,
    /// Optional questions the user left blank
    declined: BTreeSet<String>,
    pending: VecDeque<String>,
    level_override: Option<ComplexityLevel>,
    imported: usize,
}

impl<'s> InterviewSession<'s> {
    pub fn new(schema: &'s Schema, metadata: &'s TagMetadata, tags: Vec<String>) -> Self {
        Self {
            schema,
            metadata,
            tags,
            answers: AnswerMap::new(),
            declined: BTreeSet::new(),
            pending: VecDeque::new(),
            level_override: None,
            imported: 0,
        }
    }

    /// Seed with previously exported answers; they are not asked again.
    pub fn with_answers(mut self, answers: AnswerMap) -> Self {
        self.imported = answers.len();
        self.answers.merge(answers);
        self
    }

    pub fn with_level_override(mut self, level: Option<ComplexityLevel>) -> Self {
        self.level_override = level;
        self
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn into_answers(self) -> AnswerMap {
        self.answers
    }

    pub fn imported(&self) -> usize {
        self.imported
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Base questions for `stage` in catalog order: stage members that are
    /// not follow-ups (unless an existing answer already revealed them),
    /// narrowed by the tag filter and skip conditions.
    pub fn stage_questions(&self, stage: Stage) -> Vec<&'s Question> {
        let revealed = self.revealed_follow_ups();
        let candidates = self
            .schema
            .questions_by_stage(stage)
            .into_iter()
            .filter(|q| !self.schema.is_follow_up(&q.id) || revealed.contains(q.id.as_str()));

        TagRouter::with_metadata(self.metadata)
            .route(candidates, &self.tags, &self.answers)
            .into_iter()
            .filter(|q| self.should_ask(q))
            .collect()
    }

    /// Unanswered, not declined and currently visible. Declined fields count
    /// as settled when deciding skip conditions.
    pub fn should_ask(&self, question: &Question) -> bool {
        !self.answers.contains(&question.id)
            && !self.declined.contains(&question.id)
            && !evaluate_skip_with(question, &self.answers, &|id| self.declined.contains(id))
    }

    pub fn submit(&mut self, question: &Question, raw: &AnswerValue) -> Submission {
        let result = validate(question, raw);
        if !result.valid {
            return Submission::Rejected(result);
        }

        let Some(value) = result.value else {
            self.declined.insert(question.id.clone());
            return Submission::Accepted {
                follow_ups: Vec::new(),
            };
        };

        self.declined.remove(&question.id);
        self.answers.insert(question.id.clone(), value.clone());

        let mut queued = Vec::new();
        for follow_up in expand_triggers(question, &value, self.schema) {
            if self.should_ask(follow_up) && !self.pending.contains(&follow_up.id) {
                self.pending.push_back(follow_up.id.clone());
                queued.push(follow_up.id.clone());
            }
        }
        Submission::Accepted { follow_ups: queued }
    }

    /// Next queued follow-up that still needs asking.
    pub fn next_follow_up(&mut self) -> Option<&'s Question> {
        while let Some(id) = self.pending.pop_front() {
            if let Some(question) = self.schema.question_by_id(&id) {
                if self.should_ask(question) {
                    return Some(question);
                }
            }
        }
        None
    }

    pub fn assessment(&self) -> ComplexityAssessment {
        assess(&self.answers)
    }

    /// The override when set, otherwise the recommended tier.
    pub fn level(&self) -> ComplexityLevel {
        self.level_override
            .unwrap_or_else(|| self.assessment().level)
    }

    pub fn is_overridden(&self) -> bool {
        self.level_override.is_some()
    }

    /// The deep dive only runs from the standard tier upwards.
    pub fn should_run_stage(&self, stage: Stage) -> bool {
        match stage {
            Stage::Core | Stage::Review => true,
            Stage::DeepDive => self.level() >= ComplexityLevel::Standard,
        }
    }

    pub fn completeness(&self) -> Completeness {
        assess_completeness(self.schema, self.metadata, &self.answers, self.level())
    }

    fn revealed_follow_ups(&self) -> BTreeSet<&'s str> {
        self.answers
            .iter()
            .filter_map(|(id, value)| {
                self.schema
                    .question_by_id(id)
                    .map(|question| expand_triggers(question, value, self.schema))
            })
            .flatten()
            .map(|q| q.id.as_str())
            .collect()
    }
}
