//! Document rendering from a markdown template.
//!
//! Templates use `{{question.id}}` placeholders plus `{{meta.level}}` and
//! `{{meta.date}}`. Blocks between `<!-- section:NAME -->` and
//! `<!-- /section -->` survive only when NAME is unlocked at the tier.

use chrono::{NaiveDate, Utc};
use tracing::debug;

use docwright_engine::{sections_for_level, AnswerMap, AnswerValue, ComplexityLevel, Schema, DATE_FORMAT};

/// Template compiled into the binary
pub const BUILTIN_TEMPLATE: &str = include_str!("../templates/design_doc.md");

/// Default document file name inside the output directory
pub const DOCUMENT_FILE_NAME: &str = "design-doc.md";

const SECTION_OPEN: &str = "<!-- section:";
const SECTION_CLOSE: &str = "<!-- /section -->";
const NOT_SPECIFIED: &str = "_Not specified_";

pub fn render_document(
    template: &str,
    schema: &Schema,
    answers: &AnswerMap,
    level: ComplexityLevel,
) -> String {
    render_document_on(template, schema, answers, level, Utc::now().date_naive())
}

/// [`render_document`] with a fixed `{{meta.date}}`.
pub fn render_document_on(
    template: &str,
    schema: &Schema,
    answers: &AnswerMap,
    level: ComplexityLevel,
    date: NaiveDate,
) -> String {
    let unlocked = sections_for_level(level);
    let kept = select_sections(template, &unlocked);

    let body = substitute(&kept, |key| match key {
        "meta.level" => level.to_string(),
        "meta.date" => date.format(DATE_FORMAT).to_string(),
        id => {
            if schema.question_by_id(id).is_none() {
                debug!(placeholder = %id, "Template placeholder names no question");
            }
            answers
                .get(id)
                .map(format_answer)
                .unwrap_or_else(|| NOT_SPECIFIED.to_string())
        }
    });

    collapse_blank_lines(&body)
}

/// Section names declared by a template, in order.
pub fn section_names(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find(SECTION_OPEN) {
        let after = &rest[start + SECTION_OPEN.len()..];
        let Some(end) = after.find("-->") else { break };
        names.push(after[..end].trim().to_string());
        rest = &after[end..];
    }
    names
}

/// Placeholder keys used by a template, in order of first use.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    substitute(template, |key| {
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
        String::new()
    });
    keys
}

fn select_sections(template: &str, unlocked: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(SECTION_OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + SECTION_OPEN.len()..];
        let Some(name_end) = after_open.find("-->") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = after_open[..name_end].trim();
        let body_start = &after_open[name_end + 3..];
        let (body, remainder) = match body_start.find(SECTION_CLOSE) {
            Some(close) => (&body_start[..close], &body_start[close + SECTION_CLOSE.len()..]),
            // an unclosed block runs to the end of the template
            None => (body_start, ""),
        };

        if unlocked.contains(&name) {
            out.push_str(body.trim_start_matches('\n'));
        }
        rest = remainder.strip_prefix('\n').unwrap_or(remainder);
    }

    out.push_str(rest);
    out
}

fn substitute(text: &str, mut value_for: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                out.push_str(&value_for(after[..end].trim()));
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

fn format_answer(value: &AnswerValue) -> String {
    match value {
        AnswerValue::Bool(true) => "Yes".to_string(),
        AnswerValue::Bool(false) => "No".to_string(),
        AnswerValue::List(items) if items.is_empty() => NOT_SPECIFIED.to_string(),
        AnswerValue::List(items) => items.join(", "),
        AnswerValue::Text(s) if s.trim().is_empty() => NOT_SPECIFIED.to_string(),
        other => other.to_string(),
    }
}

fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Plain-text rendering of a markdown document.
///
/// Drops HTML comments and heading markers and unwraps bold and italic
/// markers. Used when a formatted export is unavailable.
pub fn to_plain_text(markdown: &str) -> String {
    let mut without_comments = String::with_capacity(markdown.len());
    let mut rest = markdown;
    while let Some(start) = rest.find("<!--") {
        without_comments.push_str(&rest[..start]);
        rest = match rest[start..].find("-->") {
            Some(end) => &rest[start + end + 3..],
            None => "",
        };
    }
    without_comments.push_str(rest);

    let lines: Vec<String> = without_comments
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            let line = if trimmed.starts_with('#') {
                trimmed.trim_start_matches('#').trim_start()
            } else {
                line
            };
            strip_emphasis(line)
        })
        .collect();

    collapse_blank_lines(lines.join("\n").trim())
}

fn strip_emphasis(line: &str) -> String {
    let line = line.replace("**", "").replace("__", "");
    line.split(' ')
        .map(|word| {
            let word = word.strip_prefix('_').unwrap_or(word);
            match word.strip_suffix('_') {
                Some(stripped) => stripped.to_string(),
                None => word
                    .find("_.")
                    .or_else(|| word.find("_,"))
                    .map(|i| format!("{}{}", &word[..i], &word[i + 1..]))
                    .unwrap_or_else(|| word.to_string()),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use docwright_engine::load_questionnaire;

    const TEMPLATE: &str = "# {{project.name}}\n\nTier: {{ meta.level }} on {{meta.date}}\n\n<!-- section:overview -->\n## Overview\n\n{{project.summary}}\n<!-- /section -->\n\n<!-- section:security -->\n## Security\n\nPII: {{privacy.pii}}\n<!-- /section -->\n\n<!-- section:risk_register -->\n## Risks\n\n{{risks.top}}\n<!-- /section -->\n";

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    #[test]
    fn test_sections_follow_the_tier() {
        let schema = load_questionnaire().unwrap();
        let mut answers = AnswerMap::new();
        answers.insert("project.name", "Ledger Sync");
        answers.insert("privacy.pii", true);

        let base = render_document_on(TEMPLATE, &schema, &answers, ComplexityLevel::Base, date());
        assert!(base.contains("## Overview"));
        assert!(!base.contains("## Security"));
        assert!(!base.contains("<!--"));

        let standard =
            render_document_on(TEMPLATE, &schema, &answers, ComplexityLevel::Standard, date());
        assert!(standard.contains("PII: Yes"));
        assert!(!standard.contains("## Risks"));

        let enterprise =
            render_document_on(TEMPLATE, &schema, &answers, ComplexityLevel::Enterprise, date());
        assert!(enterprise.contains("## Risks"));
    }

    #[test]
    fn test_placeholders_are_filled() {
        let schema = load_questionnaire().unwrap();
        let mut answers = AnswerMap::new();
        answers.insert("project.name", "Ledger Sync");

        let doc = render_document_on(TEMPLATE, &schema, &answers, ComplexityLevel::Base, date());
        assert!(doc.starts_with("# Ledger Sync\n"));
        assert!(doc.contains("Tier: base on 2026-03-14"));
        assert!(doc.contains(NOT_SPECIFIED));
        assert!(!doc.contains("{{"));
        assert!(!doc.contains("\n\n\n"));
    }

    #[test]
    fn test_answer_formatting() {
        assert_eq!(format_answer(&AnswerValue::list(["aws", "gcp"])), "aws, gcp");
        assert_eq!(format_answer(&AnswerValue::Bool(false)), "No");
        assert_eq!(format_answer(&AnswerValue::Number(99.0)), "99");
        assert_eq!(format_answer(&AnswerValue::List(Vec::new())), NOT_SPECIFIED);
    }

    #[test]
    fn test_builtin_template_covers_every_section_and_known_ids() {
        let schema = load_questionnaire().unwrap();
        let names = section_names(BUILTIN_TEMPLATE);
        assert_eq!(names, sections_for_level(ComplexityLevel::Enterprise));

        for key in placeholders(BUILTIN_TEMPLATE) {
            assert!(
                key.starts_with("meta.") || schema.question_by_id(&key).is_some(),
                "unknown placeholder {}",
                key
            );
        }
    }

    #[test]
    fn test_plain_text_strips_markup() {
        let text = to_plain_text("# Title\n\n<!-- note -->\n- **Style:** _Not specified_\n");
        assert_eq!(text, "Title\n\n- Style: Not specified\n");
    }
}
