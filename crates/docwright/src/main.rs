mod catalog;
mod commands;
mod config;
mod export;
mod interview;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use docwright_engine::ComplexityLevel;
use docwright_logging::{init_tracing, LogFormat, Logger};

use crate::catalog::Catalog;
use crate::config::{effective_settings, GlobalConfig, ProjectConfig, Settings};
use crate::interview::{handle_interview_command, InterviewArgs};

#[derive(Parser, Debug)]
#[command(
    name = "docwright",
    about = "Adaptive interview that drafts technical design documents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Working directory (default: current directory)
    #[arg(short = 'd', long, global = true)]
    working_dir: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormatChoice>,

    /// Tracing filter, e.g. "info" or "docwright=debug" (RUST_LOG wins)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Question catalog to use instead of the built-in one
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Tag metadata to use instead of the built-in one
    #[arg(long, global = true)]
    tag_metadata: Option<PathBuf>,

    /// Document template to use instead of the built-in one
    #[arg(long, global = true)]
    template: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the interview (default)
    Interview(InterviewOpts),

    /// Validate the catalog, tag metadata and template
    Check,

    /// Score an answer file and show the recommended tier
    Assess {
        /// Answer file written by a previous interview
        answers: PathBuf,

        /// Compute completeness at this tier instead of the recommended one
        #[arg(long)]
        level: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List catalog questions
    Questions {
        /// Only this stage (core, review, deep_dive)
        #[arg(long)]
        stage: Option<String>,

        /// Only these topics (foundation questions always shown)
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Hide questions this answer file answers or skips
        #[arg(long)]
        answers: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render the document from an answer file without interviewing
    Render {
        /// Answer file written by a previous interview
        answers: PathBuf,

        /// Tier to render at (default: recorded in the file, else recommended)
        #[arg(long)]
        level: Option<String>,

        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Plain text instead of markdown
        #[arg(long)]
        text: bool,
    },
}

#[derive(Args, Debug, Default)]
struct InterviewOpts {
    /// Only ask about these topics (comma separated)
    #[arg(long, value_delimiter = ',')]
    tags: Vec<String>,

    /// Force a complexity tier instead of the recommendation
    #[arg(long)]
    level: Option<String>,

    /// Start from a previous answer file; its answers are not asked again
    #[arg(long)]
    import: Option<PathBuf>,

    /// Where the answer file and document are written
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Write the document as plain text
    #[arg(long)]
    text: bool,

    /// Do not record an anonymized session log
    #[arg(long)]
    no_session_log: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let working_dir = match cli.working_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    // Precedence: CLI flags > project config > global config > defaults
    let global_config = GlobalConfig::load().context("Failed to load global configuration")?;
    let project_config =
        ProjectConfig::load(&working_dir).context("Failed to load project configuration")?;
    let settings = apply_flags(&cli, effective_settings(project_config, global_config));

    let log_format: LogFormat = cli
        .log_format
        .map(Into::into)
        .or(settings.logging.format)
        .unwrap_or_default();
    let log_level = cli
        .log_level
        .clone()
        .or_else(|| settings.logging.level.clone())
        .unwrap_or_else(|| "warn".to_string());
    let _guard = init_tracing(&log_level, log_format, settings.logging.file.as_deref());
    let logger = Logger::new(log_format);

    let catalog = Catalog::load(&settings)?;

    match cli.command {
        None => run_interview(InterviewOpts::default(), working_dir, &settings, &catalog, &logger),
        Some(Command::Interview(opts)) => {
            run_interview(opts, working_dir, &settings, &catalog, &logger)
        }
        Some(Command::Check) => commands::handle_check(&catalog),
        Some(Command::Assess {
            answers,
            level,
            json,
        }) => commands::handle_assess(&catalog, &answers, parse_level(level.as_deref())?, json),
        Some(Command::Questions {
            stage,
            tags,
            answers,
            json,
        }) => commands::handle_questions(&catalog, stage.as_deref(), &tags, answers.as_deref(), json),
        Some(Command::Render {
            answers,
            level,
            output,
            text,
        }) => commands::handle_render(
            &catalog,
            &answers,
            parse_level(level.as_deref())?,
            output.as_deref(),
            text,
        ),
    }
}

fn apply_flags(cli: &Cli, settings: Settings) -> Settings {
    Settings {
        catalog: cli.catalog.clone().or(settings.catalog),
        tag_metadata: cli.tag_metadata.clone().or(settings.tag_metadata),
        template: cli.template.clone().or(settings.template),
        ..settings
    }
}

fn run_interview(
    opts: InterviewOpts,
    working_dir: PathBuf,
    settings: &Settings,
    catalog: &Catalog,
    logger: &Logger,
) -> Result<()> {
    let tags = if opts.tags.is_empty() {
        settings.tags.clone().unwrap_or_default()
    } else {
        opts.tags
    };
    let level = parse_level(opts.level.as_deref().or(settings.level.as_deref()))?;
    let output_dir = opts
        .output_dir
        .or_else(|| settings.output_dir.clone())
        .unwrap_or_else(|| working_dir.clone());
    let session_log = !opts.no_session_log && settings.session_log.unwrap_or(true);

    let args = InterviewArgs {
        working_dir,
        output_dir,
        tags,
        level,
        import: opts.import,
        plain_text: opts.text,
        session_log,
    };
    handle_interview_command(args, catalog, logger)
}

fn parse_level(level: Option<&str>) -> Result<Option<ComplexityLevel>> {
    level
        .map(|l| l.parse::<ComplexityLevel>().map_err(anyhow::Error::msg))
        .transpose()
}
