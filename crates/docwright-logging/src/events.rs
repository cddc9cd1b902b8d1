use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Structured events emitted while an interview runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    InterviewStarted {
        working_dir: PathBuf,
        questions: usize,
        tags: Vec<String>,
        imported: usize,
    },
    StageStarted {
        stage: String,
        questions: usize,
    },
    /// A stage with nothing left to ask, or gated off by the tier
    StageSkipped {
        stage: String,
        reason: String,
    },
    AnswerAccepted {
        question_id: String,
        attempts: usize,
    },
    AnswerRejected {
        question_id: String,
        errors: Vec<String>,
    },
    FollowUpsQueued {
        question_id: String,
        follow_ups: Vec<String>,
    },
    StageCompleted {
        stage: String,
        answered: usize,
    },
    ComplexityAssessed {
        score: u32,
        level: String,
        overridden: bool,
    },
    DocumentWritten {
        path: PathBuf,
        sections: usize,
    },
    InterviewCompleted {
        answered: usize,
        level: String,
        duration_secs: f64,
    },
    ErrorEncountered {
        error: String,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for interview events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::InterviewStarted {
                working_dir,
                questions,
                tags,
                imported,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╭─────────────────────────────────────────────────────────────────────╮"
                        .bright_blue()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {}{}",
                    "│".bright_blue(),
                    "docwright".bold().bright_white(),
                    " ".repeat(58) + &"│".bright_blue().to_string()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Dir:".dimmed(),
                    Self::truncate_with_padding(&working_dir.display().to_string(), 63, 68)
                        .dimmed()
                );
                let scope = if tags.is_empty() {
                    format!("{} questions, all topics", questions)
                } else {
                    format!("{} questions, topics: {}", questions, tags.join(", "))
                };
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Scope:".dimmed(),
                    Self::truncate_with_padding(&scope, 61, 66).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╰─────────────────────────────────────────────────────────────────────╯"
                        .bright_blue()
                );
                if *imported > 0 {
                    let _ = writeln!(
                        stderr,
                        "  {} {} imported answers will not be asked again",
                        "↺".dimmed(),
                        imported
                    );
                }
                let _ = writeln!(stderr);
            }
            LogEvent::StageStarted { stage, questions } => {
                let header = format!("─ {} ({}) ", stage.to_uppercase(), questions);
                let padding = "─".repeat(67usize.saturating_sub(header.chars().count()));
                let _ = writeln!(
                    stderr,
                    "{}{}{}",
                    "┌".bright_blue(),
                    header.bright_blue().bold(),
                    padding.bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::StageSkipped { stage, reason } => {
                let _ = writeln!(
                    stderr,
                    "{} {} skipped: {}",
                    "⏭".dimmed(),
                    stage.dimmed(),
                    reason.dimmed()
                );
            }
            LogEvent::AnswerAccepted { .. } => {
                // The prompt itself echoes accepted answers
            }
            LogEvent::AnswerRejected { errors, .. } => {
                for error in errors {
                    let _ = writeln!(stderr, "    {} {}", "✗".bright_red(), error.bright_red());
                }
            }
            LogEvent::FollowUpsQueued { follow_ups, .. } => {
                let _ = writeln!(
                    stderr,
                    "    {} {} follow-up {}",
                    "→".bright_yellow(),
                    follow_ups.len(),
                    if follow_ups.len() == 1 { "question" } else { "questions" }
                );
            }
            LogEvent::StageCompleted { stage, answered } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "    {} {} done ({} answered)",
                    "✓".bright_green(),
                    stage,
                    answered
                );
                let _ = writeln!(
                    stderr,
                    "{}",
                    "└─────────────────────────────────────────────────────────────────────┘"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::ComplexityAssessed {
                score,
                level,
                overridden,
            } => {
                let note = if *overridden { " (overridden)" } else { "" };
                let _ = writeln!(
                    stderr,
                    "  {} {} {} score {}{}",
                    "◆".bright_magenta(),
                    "Complexity:".bright_magenta().bold(),
                    level.bright_white().bold(),
                    score,
                    note.dimmed()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::DocumentWritten { path, sections } => {
                let _ = writeln!(
                    stderr,
                    "{} Wrote {} ({} sections)",
                    "✓".bright_green(),
                    path.display().to_string().bold(),
                    sections
                );
            }
            LogEvent::InterviewCompleted { .. } => {
                // Summary is printed by main.rs
            }
            LogEvent::ErrorEncountered { error } => {
                let _ = writeln!(stderr);
                let _ = writeln!(stderr, "{} {}", "✗".bright_red(), error.bright_red());
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::InterviewStarted {
                questions, imported, ..
            } => format!("[{}] interview:start q={} imported={}", timestamp, questions, imported),
            LogEvent::StageStarted { stage, questions } => {
                format!("[{}] stage:start:{} q={}", timestamp, stage, questions)
            }
            LogEvent::StageSkipped { stage, reason } => {
                format!("[{}] stage:skip:{} {}", timestamp, stage, reason)
            }
            LogEvent::AnswerAccepted {
                question_id,
                attempts,
            } => format!("[{}] answer:ok:{} attempts={}", timestamp, question_id, attempts),
            LogEvent::AnswerRejected {
                question_id,
                errors,
            } => format!("[{}] answer:rejected:{} {}", timestamp, question_id, errors.join("; ")),
            LogEvent::FollowUpsQueued {
                question_id,
                follow_ups,
            } => format!(
                "[{}] followup:{} -> {}",
                timestamp,
                question_id,
                follow_ups.join(",")
            ),
            LogEvent::StageCompleted { stage, answered } => {
                format!("[{}] stage:done:{} answered={}", timestamp, stage, answered)
            }
            LogEvent::ComplexityAssessed {
                score,
                level,
                overridden,
            } => format!(
                "[{}] complexity:{} score={}{}",
                timestamp,
                level,
                score,
                if *overridden { " override" } else { "" }
            ),
            LogEvent::DocumentWritten { path, sections } => format!(
                "[{}] document:{} sections={}",
                timestamp,
                path.display(),
                sections
            ),
            LogEvent::InterviewCompleted {
                answered,
                level,
                duration_secs,
            } => format!(
                "[{}] interview:done answered={} level={} {:.1}s",
                timestamp, answered, level, duration_secs
            ),
            LogEvent::ErrorEncountered { error } => format!("[{}] error:{}", timestamp, error),
        };
        let _ = writeln!(stderr, "{}", msg);
    }

    /// Truncate a string and pad to exact width
    fn truncate_with_padding(s: &str, max_len: usize, total_width: usize) -> String {
        let truncated = if s.chars().count() > max_len {
            let kept: String = s.chars().take(max_len - 3).collect();
            format!("{}...", kept)
        } else {
            s.to_string()
        };

        let padding_needed = total_width.saturating_sub(truncated.chars().count() + 1);
        format!("{}{}│", truncated, " ".repeat(padding_needed))
    }
}
