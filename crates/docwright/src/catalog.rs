//! Resolves the question catalog, tag metadata and template to use.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use docwright_engine::{
    load_questionnaire, load_questionnaire_from_path, load_tag_metadata,
    load_tag_metadata_from_path, Schema, TagMetadata,
};

use crate::config::Settings;
use crate::render::BUILTIN_TEMPLATE;

pub struct Catalog {
    pub schema: Schema,
    pub metadata: TagMetadata,
    pub template: String,
}

impl Catalog {
    /// Load configured files, falling back to the built-in ones. Any
    /// structural problem is fatal.
    pub fn load(settings: &Settings) -> Result<Self> {
        let schema = match &settings.catalog {
            Some(path) => load_questionnaire_from_path(path)
                .with_context(|| format!("Invalid question catalog {}", path.display()))?,
            None => load_questionnaire().context("Invalid built-in question catalog")?,
        };

        let metadata = match &settings.tag_metadata {
            Some(path) => load_tag_metadata_from_path(path)
                .with_context(|| format!("Invalid tag metadata {}", path.display()))?,
            None => load_tag_metadata().context("Invalid built-in tag metadata")?,
        };
        metadata
            .check_against(&schema)
            .context("Tag metadata does not match the question catalog")?;

        let template = match &settings.template {
            Some(path) => read_template(path)?,
            None => BUILTIN_TEMPLATE.to_string(),
        };

        info!(
            questions = schema.len(),
            follow_ups = schema.follow_up_ids().len(),
            custom_catalog = settings.catalog.is_some(),
            "Catalog ready"
        );

        Ok(Self {
            schema,
            metadata,
            template,
        })
    }
}

fn read_template(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read template {}", path.display()))
}
