use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One line of the anonymized session JSONL file.
///
/// Lines carry question ids, counts and tiers. Answer text never leaves the
/// answer file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionLine {
    SessionStart {
        timestamp: DateTime<Utc>,
        project_hash: String,
        questions: usize,
        tags: Vec<String>,
        imported: usize,
    },
    Answer {
        question_id: String,
        stage: String,
        attempts: usize,
        timestamp: DateTime<Utc>,
    },
    Assessment {
        after_stage: String,
        score: u32,
        level: String,
        timestamp: DateTime<Utc>,
    },
    SessionEnd {
        answered: usize,
        level: String,
        completeness: f64,
        duration_secs: f64,
        timestamp: DateTime<Utc>,
    },
}

/// Writes session data as JSONL to a file in ~/.local/share/docwright/sessions/.
pub struct SessionWriter {
    file: Mutex<BufWriter<File>>,
    path: PathBuf,
    project_hash: String,
}

impl SessionWriter {
    /// Create a writer in the default sessions directory.
    pub fn new(project_name: &str) -> io::Result<Self> {
        Self::new_in(&Self::sessions_dir()?, project_name)
    }

    /// Create a writer in `sessions_dir`. The file name is the current UTC
    /// timestamp plus a short hash of the project name.
    pub fn new_in(sessions_dir: &Path, project_name: &str) -> io::Result<Self> {
        fs::create_dir_all(sessions_dir)?;

        let now = Utc::now();
        let timestamp_str = now.format("%Y-%m-%dT%H-%M-%SZ").to_string();

        let project_hash = hash_project(project_name);
        let filename = format!("{}_{}.jsonl", timestamp_str, &project_hash[..6]);
        let path = sessions_dir.join(filename);

        let file = File::create(&path)?;

        Ok(Self {
            file: Mutex::new(BufWriter::new(file)),
            path,
            project_hash,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_start(&self, questions: usize, tags: &[String], imported: usize) {
        let line = SessionLine::SessionStart {
            timestamp: Utc::now(),
            project_hash: self.project_hash.clone(),
            questions,
            tags: tags.to_vec(),
            imported,
        };
        self.write_line(&line);
    }

    pub fn write_answer(&self, question_id: &str, stage: &str, attempts: usize) {
        let line = SessionLine::Answer {
            question_id: question_id.to_string(),
            stage: stage.to_string(),
            attempts,
            timestamp: Utc::now(),
        };
        self.write_line(&line);
    }

    pub fn write_assessment(&self, after_stage: &str, score: u32, level: &str) {
        let line = SessionLine::Assessment {
            after_stage: after_stage.to_string(),
            score,
            level: level.to_string(),
            timestamp: Utc::now(),
        };
        self.write_line(&line);
    }

    pub fn write_end(&self, answered: usize, level: &str, completeness: f64, duration_secs: f64) {
        let line = SessionLine::SessionEnd {
            answered,
            level: level.to_string(),
            completeness,
            duration_secs,
            timestamp: Utc::now(),
        };
        self.write_line(&line);
    }

    fn write_line(&self, line: &SessionLine) {
        if let Ok(json) = serde_json::to_string(line) {
            if let Ok(mut writer) = self.file.lock() {
                let _ = writeln!(writer, "{}", json);
                let _ = writer.flush();
            }
        }
    }

    fn sessions_dir() -> io::Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine data directory",
            )
        })?;
        Ok(data_dir.join("docwright").join("sessions"))
    }
}

fn hash_project(project_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(project_name.trim().as_bytes());
    hex::encode(hasher.finalize())
}
