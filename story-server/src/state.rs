//! Shared application state.
//!
//! [`AppState`] is built once in `main` and cloned into every handler.
//! It owns the configuration, the template store and the story service.

use std::sync::Arc;

use story_core::{
    LoadError, OpenAiGenerator, PromptComposer, StoryGenerator, StoryService, TemplateStore,
};

use crate::config::Settings;
use crate::error::ReloadError;

/// State shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    settings: Arc<Settings>,
    store: Arc<TemplateStore>,
    service: StoryService,
}

impl AppState {
    /// Assemble state from explicit parts.
    pub fn new(
        settings: Settings,
        store: Arc<TemplateStore>,
        generator: Arc<dyn StoryGenerator>,
    ) -> Self {
        let service = StoryService::new(PromptComposer::new(Arc::clone(&store)), generator);
        Self {
            settings: Arc::new(settings),
            store,
            service,
        }
    }

    /// Load templates from `settings.prompts_file` and build the OpenAI generator.
    pub fn from_settings(settings: Settings) -> Result<Self, LoadError> {
        let store = Arc::new(TemplateStore::open(settings.prompts_file.clone())?);
        let generator = OpenAiGenerator::new(settings.openai_api_key.as_deref(), settings.sampling())
            .with_base_url(&settings.openai_base_url);
        Ok(Self::new(settings, store, Arc::new(generator)))
    }

    /// Re-read the template file on the blocking pool and swap it in.
    ///
    /// On failure the previous templates stay active.
    pub async fn reload_templates(&self) -> Result<(), ReloadError> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.reload()).await??;
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<TemplateStore> {
        &self.store
    }

    pub fn service(&self) -> &StoryService {
        &self.service
    }
}
