//! Non-interactive subcommands: check, assess, questions, render.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use docwright_engine::{
    assess, assess_completeness, filter_questions, sections_for_level, AnswerMap, Completeness,
    ComplexityAssessment, ComplexityLevel, Question, Stage, TagRouter,
};

use crate::catalog::Catalog;
use crate::export::import_answers;
use crate::render::{placeholders, render_document, section_names, to_plain_text};

pub fn handle_check(catalog: &Catalog) -> Result<()> {
    let schema = &catalog.schema;

    println!("{} {} questions", "✓".bright_green(), schema.len());
    for stage in Stage::ALL {
        println!(
            "  {:<10} {}",
            stage.to_string(),
            schema.questions_by_stage(stage).len()
        );
    }
    println!(
        "  {:<10} {}",
        "follow-ups",
        schema.follow_up_ids().len()
    );

    println!();
    println!("{}", "Tags:".bold());
    for tag in schema.tags() {
        println!(
            "  {:<16} {:>3}  {}",
            tag,
            schema.questions_by_tag(tag).len(),
            catalog.metadata.label_for(tag).dimmed()
        );
    }

    let unknown: Vec<String> = placeholders(&catalog.template)
        .into_iter()
        .filter(|key| !key.starts_with("meta.") && schema.question_by_id(key).is_none())
        .collect();
    let known_sections = sections_for_level(ComplexityLevel::Enterprise);
    let stray_sections: Vec<String> = section_names(&catalog.template)
        .into_iter()
        .filter(|name| !known_sections.contains(&name.as_str()))
        .collect();

    println!();
    if unknown.is_empty() && stray_sections.is_empty() {
        println!("{} template placeholders resolve", "✓".bright_green());
    } else {
        for key in &unknown {
            println!(
                "{} template placeholder {{{{{}}}}} names no question",
                "⚠".bright_yellow(),
                key
            );
        }
        for name in &stray_sections {
            println!(
                "{} template section '{}' is never rendered",
                "⚠".bright_yellow(),
                name
            );
        }
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct AssessReport {
    #[serde(flatten)]
    assessment: ComplexityAssessment,
    /// Tier the completeness figure was computed at
    evaluated_level: ComplexityLevel,
    sections: Vec<&'static str>,
    completeness: Completeness,
}

pub fn handle_assess(
    catalog: &Catalog,
    answers_path: &Path,
    level: Option<ComplexityLevel>,
    json: bool,
) -> Result<()> {
    let imported = import_answers(answers_path)
        .with_context(|| format!("Failed to read {}", answers_path.display()))?;
    let assessment = assess(&imported.answers);
    let evaluated_level = level.unwrap_or(assessment.level);
    let completeness = assess_completeness(
        &catalog.schema,
        &catalog.metadata,
        &imported.answers,
        evaluated_level,
    );

    let report = AssessReport {
        sections: sections_for_level(evaluated_level),
        assessment,
        evaluated_level,
        completeness,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_assessment(&report);
    if let Some(recorded) = imported.level {
        if recorded != report.assessment.level {
            println!(
                "{} file was exported at {} but now scores {}",
                "⚠".bright_yellow(),
                recorded,
                report.assessment.level
            );
        }
    }
    Ok(())
}

fn print_assessment(report: &AssessReport) {
    let assessment = &report.assessment;
    println!(
        "{} {} (score {})",
        "Level:".bold(),
        assessment.level.to_string().bright_white().bold(),
        assessment.score
    );
    println!();
    println!("{}", "Score breakdown:".bold());
    println!("  {:<24} {:>3}", "base", docwright_engine::complexity::BASE_SCORE);
    for component in &assessment.components {
        println!(
            "  {:<24} {:>3}  {}",
            component.factor,
            format!("+{}", component.points).green(),
            component.note.dimmed()
        );
    }
    println!();
    println!(
        "{} {}",
        "Sections:".bold(),
        report.sections.join(", ")
    );
    let completeness = &report.completeness;
    println!(
        "{} {:.0}% at {} ({}/{})",
        "Completeness:".bold(),
        completeness.ratio * 100.0,
        report.evaluated_level,
        completeness.answered_weight,
        completeness.total_weight
    );
    if !completeness.missing.is_empty() {
        println!("  missing: {}", completeness.missing.join(", ").dimmed());
    }
}

pub fn handle_questions(
    catalog: &Catalog,
    stage: Option<&str>,
    tags: &[String],
    answers_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let stage: Option<Stage> = stage
        .map(|s| s.parse::<Stage>().map_err(anyhow::Error::msg))
        .transpose()?;
    let answers = match answers_path {
        Some(path) => {
            import_answers(path)
                .with_context(|| format!("Failed to read {}", path.display()))?
                .answers
        }
        None => AnswerMap::new(),
    };

    let candidates = catalog
        .schema
        .questions()
        .iter()
        .filter(|q| stage.map(|s| q.stage == s).unwrap_or(true));
    let mut listed: Vec<&Question> = if tags.is_empty() {
        filter_questions(candidates, &answers)
    } else {
        TagRouter::with_metadata(&catalog.metadata).route(candidates, tags, &answers)
    };
    if answers_path.is_some() {
        listed.retain(|q| !answers.contains(&q.id));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&listed)?);
        return Ok(());
    }

    if listed.is_empty() {
        println!("{}", "No questions match.".dimmed());
        return Ok(());
    }

    println!(
        "{:<30} {:<10} {:<13} {}",
        "ID".bold(),
        "STAGE".bold(),
        "TYPE".bold(),
        "TAGS".bold()
    );
    for question in listed {
        let marker = if catalog.schema.is_follow_up(&question.id) {
            "↳"
        } else if question.is_required() {
            "*"
        } else {
            " "
        };
        println!(
            "{:<30} {:<10} {:<13} {} {}",
            question.id,
            question.stage.to_string(),
            question.kind.to_string(),
            question.tags.join(",").dimmed(),
            marker.bright_yellow()
        );
    }
    Ok(())
}

pub fn handle_render(
    catalog: &Catalog,
    answers_path: &Path,
    level: Option<ComplexityLevel>,
    output: Option<&Path>,
    plain_text: bool,
) -> Result<()> {
    let imported = import_answers(answers_path)
        .with_context(|| format!("Failed to read {}", answers_path.display()))?;
    let level = level
        .or(imported.level)
        .unwrap_or_else(|| assess(&imported.answers).level);

    let mut document = render_document(&catalog.template, &catalog.schema, &imported.answers, level);
    if plain_text {
        document = to_plain_text(&document);
    }

    match output {
        Some(path) => {
            std::fs::write(path, &document)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{} Wrote {} at {} tier",
                "✓".bright_green(),
                path.display(),
                level
            );
        }
        None => print!("{}", document),
    }
    Ok(())
}
