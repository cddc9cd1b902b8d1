//! Terminal prompts for each question type.

use anyhow::Result;
use colored::Colorize;
use dialoguer::{Confirm, Editor, FuzzySelect, Input, MultiSelect, Select};

use docwright_engine::{AnswerValue, Question, QuestionType, ValidationResult};

const SKIP_ITEM: &str = "(skip)";

/// Option lists longer than this get a type-to-filter picker.
const FUZZY_THRESHOLD: usize = 8;

/// Ask `question` once and return the raw answer for validation.
pub fn ask(question: &Question) -> Result<AnswerValue> {
    print_guidance(question);

    let prompt = if question.is_required() {
        format!("{} {}", question.prompt, "*".bright_red())
    } else {
        question.prompt.clone()
    };

    let answer = match question.kind {
        QuestionType::Text | QuestionType::Number | QuestionType::Date => {
            AnswerValue::Text(ask_line(&prompt)?)
        }
        QuestionType::Textarea => AnswerValue::Text(ask_long_text(&prompt, question)?),
        QuestionType::Select => {
            let mut items: Vec<&str> = question.options.iter().map(String::as_str).collect();
            if !question.is_required() {
                items.push(SKIP_ITEM);
            }
            let index = if items.len() > FUZZY_THRESHOLD {
                FuzzySelect::new()
                    .with_prompt(&prompt)
                    .items(&items)
                    .default(0)
                    .interact()?
            } else {
                Select::new()
                    .with_prompt(&prompt)
                    .items(&items)
                    .default(0)
                    .interact()?
            };
            match question.options.get(index) {
                Some(choice) => AnswerValue::Text(choice.clone()),
                None => AnswerValue::Text(String::new()),
            }
        }
        QuestionType::MultiSelect => {
            let chosen = MultiSelect::new()
                .with_prompt(format!("{} {}", prompt, "(space to toggle)".dimmed()))
                .items(&question.options)
                .interact()?;
            AnswerValue::List(
                chosen
                    .into_iter()
                    .filter_map(|i| question.options.get(i).cloned())
                    .collect(),
            )
        }
        QuestionType::Boolean => {
            AnswerValue::Bool(Confirm::new().with_prompt(&prompt).default(false).interact()?)
        }
    };

    Ok(answer)
}

fn ask_line(prompt: &str) -> Result<String> {
    let line: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    Ok(line)
}

/// Long answers go through `$VISUAL`/`$EDITOR` when one is configured,
/// falling back to a single line.
fn ask_long_text(prompt: &str, question: &Question) -> Result<String> {
    let has_editor = std::env::var_os("VISUAL").is_some() || std::env::var_os("EDITOR").is_some();
    if has_editor {
        let seed = seed_line(question);
        match Editor::new().edit(&format!("{}\n", seed)) {
            Ok(Some(text)) => return Ok(strip_seed(&text, &seed)),
            Ok(None) => return Ok(String::new()),
            Err(err) => {
                tracing::debug!(error = %err, "Editor unavailable, reading a single line");
            }
        }
    }
    ask_line(prompt)
}

fn seed_line(question: &Question) -> String {
    format!("# {}", question.prompt)
}

/// Drop the prompt line the editor was seeded with. Headings the user wrote
/// are kept.
fn strip_seed(text: &str, seed: &str) -> String {
    let body: Vec<&str> = text.lines().filter(|line| line.trim_end() != seed).collect();
    body.join("\n").trim().to_string()
}

fn print_guidance(question: &Question) {
    eprintln!();
    if let Some(hint) = &question.hint {
        eprintln!("  {}", hint.dimmed());
    }
    if let Some(why) = question.help.as_ref().and_then(|h| h.why.as_ref()) {
        eprintln!("  {} {}", "why:".dimmed(), why.dimmed());
    }
    if question.kind == QuestionType::Date {
        eprintln!("  {}", "format: YYYY-MM-DD".dimmed());
    }
}

/// Examples and reference link attached to a rejected answer. The errors
/// themselves go through the logger.
pub fn print_guidance_for(result: &ValidationResult) {
    if let Some(examples) = &result.examples {
        eprintln!("  {} {}", "e.g.".bright_yellow(), examples.join(" | "));
    }
    if let Some(link) = &result.learn_more {
        eprintln!("  {} {}", "see".dimmed(), link.underline());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_seed_keeps_user_headings() {
        let seed = "# Describe the data model";
        let edited = "# Describe the data model\n# Entities\n- account\n\n## Notes\nappend only\n";
        assert_eq!(
            strip_seed(edited, seed),
            "# Entities\n- account\n\n## Notes\nappend only"
        );
    }

    #[test]
    fn test_strip_seed_without_seed_line() {
        assert_eq!(strip_seed("  plain answer  \n", "# Prompt"), "plain answer");
        assert_eq!(strip_seed("# Prompt\n", "# Prompt"), "");
    }
}
