//! Prompt composition.
//!
//! A prompt is built in two independent substitution passes:
//! 1. `base_prompt` is filled with the request parameters.
//! 2. `prompt_template` is filled with the pass-1 result plus the genre and
//!    creativity fragments from the template store.
//!
//! Genre and creativity entries are resolved before either pass, falling back
//! to [`DEFAULT_GENRE`] / [`DEFAULT_CREATIVITY`] and finally to empty entries,
//! so only a placeholder missing from the parameter maps can fail.

use crate::request::StoryRequest;
use crate::store::{CreativityEntry, GenreEntry, TemplateData, TemplateStore};
use crate::template::{substitute, Params, TemplateError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Genre used when the requested one has no template entry.
pub const DEFAULT_GENRE: &str = "fantasy";
/// Creativity level used when the requested one has no template entry.
pub const DEFAULT_CREATIVITY: &str = "creative";
/// Substituted for `{suggestions}` when the request has none.
pub const NO_SUGGESTIONS: &str = "no specific suggestions";

/// Look up a genre entry, falling back to [`DEFAULT_GENRE`].
pub fn lookup_genre<'a>(data: &'a TemplateData, genre: &str) -> Option<&'a GenreEntry> {
    data.genres.get(genre).or_else(|| {
        warn!(genre, fallback = DEFAULT_GENRE, "Unknown genre, using fallback");
        data.genres.get(DEFAULT_GENRE)
    })
}

/// Look up a creativity entry, falling back to [`DEFAULT_CREATIVITY`].
pub fn lookup_creativity<'a>(data: &'a TemplateData, level: &str) -> Option<&'a CreativityEntry> {
    data.creativity_levels.get(level).or_else(|| {
        warn!(
            creativity_level = level,
            fallback = DEFAULT_CREATIVITY,
            "Unknown creativity level, using fallback"
        );
        data.creativity_levels.get(DEFAULT_CREATIVITY)
    })
}

/// Compose the final prompt against one snapshot of template data.
pub fn compose_with(data: &TemplateData, request: &StoryRequest) -> Result<String, TemplateError> {
    let genre_id = request.genre().as_str();
    let creativity_id = request.creativity_level().as_str();

    let genre = lookup_genre(data, genre_id).cloned().unwrap_or_default();
    let creativity = lookup_creativity(data, creativity_id)
        .cloned()
        .unwrap_or_default();

    let base_params: Params<'_> = Params::from([
        ("genre", genre_id.to_string()),
        ("category", request.category().as_str().to_string()),
        ("word_count", request.word_count().to_string()),
        ("creativity_level", creativity_id.to_string()),
        (
            "suggestions",
            request.suggestions().unwrap_or(NO_SUGGESTIONS).to_string(),
        ),
    ]);
    let base_prompt = substitute(&data.base_prompt, &base_params)?;

    let final_params: Params<'_> = Params::from([
        ("base_prompt", base_prompt),
        ("genre", genre_id.to_string()),
        ("genre_description", genre.description),
        ("genre_elements", genre.elements),
        ("genre_tone", genre.tone),
        ("creativity_level", creativity_id.to_string()),
        ("creativity_instructions", creativity.instructions),
    ]);
    let prompt = substitute(&data.prompt_template, &final_params)?;

    debug!(genre = genre_id, creativity_level = creativity_id, chars = prompt.len(), "Prompt composed");
    Ok(prompt)
}

/// Composes prompts from the current contents of a [`TemplateStore`].
#[derive(Debug, Clone)]
pub struct PromptComposer {
    store: Arc<TemplateStore>,
}

impl PromptComposer {
    pub fn new(store: Arc<TemplateStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<TemplateStore> {
        &self.store
    }

    /// Compose a prompt for `request`.
    ///
    /// One snapshot is taken up front, so a concurrent reload is either
    /// fully visible or not at all.
    pub fn compose(&self, request: &StoryRequest) -> Result<String, TemplateError> {
        let data = self.store.snapshot();
        compose_with(&data, request)
    }
}
