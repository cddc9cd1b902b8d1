//! Configuration file support for docwright.
//!
//! Loads `docwright.toml` from the working directory and a global
//! `config.toml` from the user config directory. CLI flags win over the
//! project file, which wins over the global file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use docwright_logging::LogFormat;

/// The project config file name
pub const CONFIG_FILE_NAME: &str = "docwright.toml";

/// Directory under the user config dir holding the global config
pub const GLOBAL_CONFIG_DIR: &str = "docwright";

/// The global config file name
pub const GLOBAL_CONFIG_FILE: &str = "config.toml";

/// Settings shared by the project and global files
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Question catalog replacing the built-in one
    pub catalog: Option<PathBuf>,
    /// Tag metadata replacing the built-in one
    pub tag_metadata: Option<PathBuf>,
    /// Document template replacing the built-in one
    pub template: Option<PathBuf>,
    /// Where the answer file and document are written
    pub output_dir: Option<PathBuf>,
    /// Default topic filter
    pub tags: Option<Vec<String>>,
    /// Complexity level forced instead of the recommendation
    pub level: Option<String>,
    /// Record an anonymized session log
    pub session_log: Option<bool>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
    /// Also write tracing output to this file
    pub file: Option<PathBuf>,
}

impl Settings {
    /// Fill every unset value from `fallback`.
    pub fn or(self, fallback: Settings) -> Settings {
        Settings {
            catalog: self.catalog.or(fallback.catalog),
            tag_metadata: self.tag_metadata.or(fallback.tag_metadata),
            template: self.template.or(fallback.template),
            output_dir: self.output_dir.or(fallback.output_dir),
            tags: self.tags.or(fallback.tags),
            level: self.level.or(fallback.level),
            session_log: self.session_log.or(fallback.session_log),
            logging: LoggingConfig {
                level: self.logging.level.or(fallback.logging.level),
                format: self.logging.format.or(fallback.logging.format),
                file: self.logging.file.or(fallback.logging.file),
            },
        }
    }

    /// Resolve relative paths against `base`.
    fn anchored(mut self, base: &Path) -> Settings {
        let anchor = |path: Option<PathBuf>| {
            path.map(|p| if p.is_absolute() { p } else { base.join(p) })
        };
        self.catalog = anchor(self.catalog);
        self.tag_metadata = anchor(self.tag_metadata);
        self.template = anchor(self.template);
        self.output_dir = anchor(self.output_dir);
        self.logging.file = anchor(self.logging.file);
        self
    }
}

/// Project-level configuration loaded from `docwright.toml`
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProjectConfig {
    pub settings: Settings,
}

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(Self {
            settings: settings.anchored(working_dir),
        }))
    }
}

/// User-level defaults loaded from `<config_dir>/docwright/config.toml`
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    #[serde(default)]
    pub defaults: Settings,
}

impl GlobalConfig {
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(GLOBAL_CONFIG_DIR).join(GLOBAL_CONFIG_FILE))
    }

    pub fn exists() -> bool {
        Self::path().map(|p| p.exists()).unwrap_or(false)
    }

    pub fn load() -> Result<Option<Self>> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config: GlobalConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(Some(config))
    }
}

/// Merge project and global settings, project first.
pub fn effective_settings(project: Option<ProjectConfig>, global: Option<GlobalConfig>) -> Settings {
    let project = project.map(|p| p.settings).unwrap_or_default();
    let global = global.map(|g| g.defaults).unwrap_or_default();
    project.or(global)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_project_config_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(ProjectConfig::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_project_config_parses_and_anchors_paths() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
catalog = "catalog/questions.yaml"
output_dir = "/tmp/docs"
tags = ["privacy", "api"]
level = "standard"

[logging]
format = "compact"
"#,
        )
        .unwrap();

        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        let settings = config.settings;
        assert_eq!(
            settings.catalog,
            Some(dir.path().join("catalog/questions.yaml"))
        );
        assert_eq!(settings.output_dir, Some(PathBuf::from("/tmp/docs")));
        assert_eq!(
            settings.tags,
            Some(vec!["privacy".to_string(), "api".to_string()])
        );
        assert_eq!(settings.logging.format, Some(LogFormat::Compact));
    }

    #[test]
    fn test_unknown_keys_are_hard_errors() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "colour = \"blue\"\n").unwrap();
        assert!(ProjectConfig::load(dir.path()).is_err());
    }

    #[test]
    fn test_project_settings_win_over_global() {
        let dir = TempDir::new().unwrap();
        let global_path = dir.path().join(GLOBAL_CONFIG_FILE);
        std::fs::write(
            &global_path,
            r#"
[defaults]
level = "minimal"
session_log = false

[defaults.logging]
level = "debug"
"#,
        )
        .unwrap();
        let global = GlobalConfig::load_from(&global_path).unwrap();

        let project = ProjectConfig {
            settings: Settings {
                level: Some("enterprise".to_string()),
                ..Settings::default()
            },
        };

        let settings = effective_settings(Some(project), global);
        assert_eq!(settings.level.as_deref(), Some("enterprise"));
        assert_eq!(settings.session_log, Some(false));
        assert_eq!(settings.logging.level.as_deref(), Some("debug"));
    }
}
