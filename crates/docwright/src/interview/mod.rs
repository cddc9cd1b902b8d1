//! The interactive interview.
//!
//! Runs the stages in order, re-assessing complexity between them, then
//! writes the answer file and the rendered document.

mod prompt;
mod session;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::{debug, warn};

use docwright_engine::{ComplexityLevel, Question, Stage};
use docwright_logging::{LogEvent, Logger, SessionWriter};

use crate::catalog::Catalog;
use crate::export::{export_answers, import_answers, ANSWERS_FILE_NAME};
use crate::render::{render_document, to_plain_text, DOCUMENT_FILE_NAME};

use session::{InterviewSession, Submission};

/// Arguments for the interview command, after config resolution
pub struct InterviewArgs {
    pub working_dir: PathBuf,
    pub output_dir: PathBuf,
    pub tags: Vec<String>,
    pub level: Option<ComplexityLevel>,
    pub import: Option<PathBuf>,
    pub plain_text: bool,
    pub session_log: bool,
}

/// Handle the `docwright interview` command
pub fn handle_interview_command(args: InterviewArgs, catalog: &Catalog, logger: &Logger) -> Result<()> {
    let started = Instant::now();

    let imported = match &args.import {
        Some(path) => {
            let imported = import_answers(path)
                .with_context(|| format!("Failed to import answers from {}", path.display()))?;
            debug!(
                answers = imported.answers.len(),
                level = ?imported.level,
                "Imported answers"
            );
            imported.answers
        }
        None => Default::default(),
    };

    let mut session = InterviewSession::new(&catalog.schema, &catalog.metadata, args.tags.clone())
        .with_answers(imported)
        .with_level_override(args.level);

    let recorder = if args.session_log {
        match SessionWriter::new(&args.working_dir.display().to_string()) {
            Ok(writer) => Some(writer),
            Err(err) => {
                warn!(error = %err, "Session log disabled");
                None
            }
        }
    } else {
        None
    };

    logger.log(&LogEvent::InterviewStarted {
        working_dir: args.working_dir.clone(),
        questions: catalog.schema.len(),
        tags: session.tags().to_vec(),
        imported: session.imported(),
    });
    if let Some(recorder) = &recorder {
        recorder.write_start(catalog.schema.len(), session.tags(), session.imported());
    }

    for stage in Stage::ALL {
        run_stage(&mut session, stage, logger, recorder.as_ref())?;
    }

    let level = session.level();
    let completeness = session.completeness();
    let answers = session.into_answers();

    let answers_path = args.output_dir.join(ANSWERS_FILE_NAME);
    export_answers(&answers, level, &answers_path)
        .with_context(|| format!("Failed to write {}", answers_path.display()))?;

    let document = render_document(&catalog.template, &catalog.schema, &answers, level);
    let (document, file_name) = if args.plain_text {
        (to_plain_text(&document), DOCUMENT_FILE_NAME.replace(".md", ".txt"))
    } else {
        (document, DOCUMENT_FILE_NAME.to_string())
    };
    let document_path = args.output_dir.join(file_name);
    std::fs::write(&document_path, document)
        .with_context(|| format!("Failed to write {}", document_path.display()))?;

    logger.log(&LogEvent::DocumentWritten {
        path: document_path.clone(),
        sections: level_sections(level),
    });

    let duration_secs = started.elapsed().as_secs_f64();
    logger.log(&LogEvent::InterviewCompleted {
        answered: answers.len(),
        level: level.to_string(),
        duration_secs,
    });
    if let Some(recorder) = &recorder {
        recorder.write_end(answers.len(), level.as_str(), completeness.ratio, duration_secs);
    }

    eprintln!();
    eprintln!("{}", "=== INTERVIEW COMPLETE ===".bold());
    eprintln!("Answers:      {}", answers.len());
    eprintln!("Level:        {}", level.to_string().bright_white().bold());
    eprintln!("Completeness: {:.0}%", completeness.ratio * 100.0);
    if !completeness.missing.is_empty() {
        eprintln!(
            "Missing:      {}",
            completeness.missing.join(", ").dimmed()
        );
    }
    eprintln!("Answer file:  {}", answers_path.display());
    eprintln!("Document:     {}", document_path.display());

    Ok(())
}

fn run_stage(
    session: &mut InterviewSession<'_>,
    stage: Stage,
    logger: &Logger,
    recorder: Option<&SessionWriter>,
) -> Result<()> {
    if !session.should_run_stage(stage) {
        logger.log(&LogEvent::StageSkipped {
            stage: stage.to_string(),
            reason: format!("{} tier does not need it", session.level()),
        });
        return Ok(());
    }

    let questions = session.stage_questions(stage);
    if questions.is_empty() {
        logger.log(&LogEvent::StageSkipped {
            stage: stage.to_string(),
            reason: "nothing left to ask".to_string(),
        });
        return Ok(());
    }

    logger.log(&LogEvent::StageStarted {
        stage: stage.to_string(),
        questions: questions.len(),
    });

    let before = session.answers().len();
    for question in questions {
        // earlier answers in this stage may have hidden it
        if !session.should_ask(question) {
            continue;
        }
        ask_until_accepted(session, question, stage, logger, recorder)?;
        while let Some(follow_up) = session.next_follow_up() {
            ask_until_accepted(session, follow_up, stage, logger, recorder)?;
        }
    }

    logger.log(&LogEvent::StageCompleted {
        stage: stage.to_string(),
        answered: session.answers().len().saturating_sub(before),
    });

    let assessment = session.assessment();
    logger.log(&LogEvent::ComplexityAssessed {
        score: assessment.score,
        level: session.level().to_string(),
        overridden: session.is_overridden(),
    });
    if let Some(recorder) = recorder {
        recorder.write_assessment(stage.as_str(), assessment.score, session.level().as_str());
    }

    Ok(())
}

fn ask_until_accepted(
    session: &mut InterviewSession<'_>,
    question: &Question,
    stage: Stage,
    logger: &Logger,
    recorder: Option<&SessionWriter>,
) -> Result<()> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        let raw = prompt::ask(question)?;
        match session.submit(question, &raw) {
            Submission::Accepted { follow_ups } => {
                logger.log(&LogEvent::AnswerAccepted {
                    question_id: question.id.clone(),
                    attempts,
                });
                if let Some(recorder) = recorder {
                    recorder.write_answer(&question.id, stage.as_str(), attempts);
                }
                if !follow_ups.is_empty() {
                    logger.log(&LogEvent::FollowUpsQueued {
                        question_id: question.id.clone(),
                        follow_ups,
                    });
                }
                return Ok(());
            }
            Submission::Rejected(result) => {
                logger.log(&LogEvent::AnswerRejected {
                    question_id: question.id.clone(),
                    errors: result.errors.clone(),
                });
                prompt::print_guidance_for(&result);
            }
        }
    }
}

fn level_sections(level: ComplexityLevel) -> usize {
    docwright_engine::sections_for_level(level).len()
}
