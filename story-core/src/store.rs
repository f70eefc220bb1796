//! Template store: genre and creativity fragments plus the two prompt templates.
//!
//! The data is parsed from a YAML file into an immutable [`TemplateData`].
//! [`TemplateStore`] hands out `Arc` snapshots; a reload parses the file
//! completely before swapping the pointer, so readers never observe a
//! partially loaded structure.

use crate::template::Template;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{info, warn};

/// Placeholders the composer supplies to `base_prompt`.
pub const BASE_PLACEHOLDERS: &[&str] = &[
    "genre",
    "category",
    "word_count",
    "creativity_level",
    "suggestions",
];

/// Placeholders the composer supplies to `prompt_template`.
pub const FINAL_PLACEHOLDERS: &[&str] = &[
    "base_prompt",
    "genre",
    "genre_description",
    "genre_elements",
    "genre_tone",
    "creativity_level",
    "creativity_instructions",
];

/// Errors from loading the template file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read prompt templates at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid prompt template file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Descriptive fragments for one genre.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreEntry {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub elements: String,
    #[serde(default)]
    pub tone: String,
}

/// Instructions for one creativity level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativityEntry {
    #[serde(default)]
    pub instructions: String,
}

/// Everything loaded from the template file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateData {
    #[serde(default)]
    pub genres: HashMap<String, GenreEntry>,
    #[serde(default)]
    pub creativity_levels: HashMap<String, CreativityEntry>,
    pub base_prompt: String,
    pub prompt_template: String,
}

impl TemplateData {
    /// Parse template data from YAML text.
    pub fn parse(text: &str) -> Result<Self, LoadError> {
        let data: Self = serde_yaml::from_str(text)?;
        data.warn_on_unknown_placeholders();
        Ok(data)
    }

    /// Read and parse a template file.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Genre ids present in this data, sorted.
    pub fn available_genres(&self) -> Vec<String> {
        sorted_keys(&self.genres)
    }

    /// Creativity level ids present in this data, sorted.
    pub fn available_creativity_levels(&self) -> Vec<String> {
        sorted_keys(&self.creativity_levels)
    }

    /// Log placeholders the composer will not be able to fill.
    ///
    /// The file is still accepted; composition reports the failure per request.
    fn warn_on_unknown_placeholders(&self) {
        for (which, source, known) in [
            ("base_prompt", &self.base_prompt, BASE_PLACEHOLDERS),
            ("prompt_template", &self.prompt_template, FINAL_PLACEHOLDERS),
        ] {
            match Template::parse(source) {
                Ok(template) => {
                    for name in template.placeholders() {
                        if !known.contains(&name) {
                            warn!(template = which, placeholder = name, "Unknown placeholder in prompt template");
                        }
                    }
                }
                Err(e) => warn!(template = which, error = %e, "Prompt template does not parse"),
            }
        }
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<String> {
    let mut keys: Vec<String> = map.keys().cloned().collect();
    keys.sort();
    keys
}

/// Shared, reloadable holder of [`TemplateData`].
#[derive(Debug)]
pub struct TemplateStore {
    source: Option<PathBuf>,
    current: RwLock<Arc<TemplateData>>,
}

impl TemplateStore {
    /// Load templates from `path` and remember it for [`reload`](Self::reload).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LoadError> {
        let path = path.into();
        let data = TemplateData::load(&path)?;
        info!(
            path = %path.display(),
            genres = data.genres.len(),
            creativity_levels = data.creativity_levels.len(),
            "Prompt templates loaded"
        );
        Ok(Self {
            source: Some(path),
            current: RwLock::new(Arc::new(data)),
        })
    }

    /// Wrap already-parsed data. Such a store has nothing to reload from.
    pub fn from_data(data: TemplateData) -> Self {
        Self {
            source: None,
            current: RwLock::new(Arc::new(data)),
        }
    }

    /// The file this store was opened from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// The current data. The snapshot stays valid across later reloads.
    pub fn snapshot(&self) -> Arc<TemplateData> {
        // The lock only guards a pointer swap, so a poisoned lock still holds consistent data.
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Re-read the source file and swap it in.
    ///
    /// On failure the previous data stays active. A store built with
    /// [`from_data`](Self::from_data) keeps its data and returns it unchanged.
    pub fn reload(&self) -> Result<Arc<TemplateData>, LoadError> {
        let Some(path) = &self.source else {
            return Ok(self.snapshot());
        };
        let data = Arc::new(TemplateData::load(path)?);
        self.replace(Arc::clone(&data));
        info!(
            path = %path.display(),
            genres = data.genres.len(),
            creativity_levels = data.creativity_levels.len(),
            "Prompt templates reloaded"
        );
        Ok(data)
    }

    /// Swap in new data wholesale.
    pub fn replace(&self, data: Arc<TemplateData>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = data;
    }

    pub fn available_genres(&self) -> Vec<String> {
        self.snapshot().available_genres()
    }

    pub fn available_creativity_levels(&self) -> Vec<String> {
        self.snapshot().available_creativity_levels()
    }
}
