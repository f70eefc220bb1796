//! Story prompt composition and generation.
//!
//! This crate provides:
//! - A reloadable template store of genre and creativity fragments
//! - Two-stage prompt composition with default fallbacks
//! - A story generator backed by the OpenAI chat-completions API
//! - A service that ties them together and reports metadata
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use story_core::{
//!     Category, CreativityLevel, Genre, OpenAiGenerator, PromptComposer, SamplingConfig,
//!     StoryRequest, StoryService, TemplateStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(TemplateStore::open("prompts.yaml")?);
//!     let key = std::env::var("OPENAI_API_KEY").ok();
//!     let generator = OpenAiGenerator::new(key.as_deref(), SamplingConfig::default());
//!     let service = StoryService::new(PromptComposer::new(store), Arc::new(generator));
//!
//!     let request = StoryRequest::new(300, CreativityLevel::Creative, Genre::Fantasy, Category::Children)?;
//!     let story = service.generate(&request).await?;
//!     println!("{}", story.story);
//!     Ok(())
//! }
//! ```

pub mod composer;
pub mod generator;
pub mod request;
pub mod service;
pub mod store;
pub mod template;
pub mod testing;

// Primary public API
pub use composer::{compose_with, lookup_creativity, lookup_genre, PromptComposer};
pub use generator::{GenerationError, OpenAiGenerator, SamplingConfig, StoryGenerator};
pub use request::{
    Category, CreativityLevel, FieldError, Genre, StoryRequest, StoryRequestBody, ValidationErrors,
};
pub use service::{GeneratedStory, StoryError, StoryMetadata, StoryService};
pub use store::{CreativityEntry, GenreEntry, LoadError, TemplateData, TemplateStore};
pub use template::{Template, TemplateError};
pub use testing::MockGenerator;
