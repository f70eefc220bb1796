//! StoryService - compose, generate and describe one story.

use crate::composer::PromptComposer;
use crate::generator::{GenerationError, StoryGenerator};
use crate::request::{Category, CreativityLevel, Genre, StoryRequest};
use crate::template::TemplateError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};

/// Errors from generating a story.
#[derive(Debug, Error)]
pub enum StoryError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Metadata returned alongside a story.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryMetadata {
    pub word_count: u32,
    pub genre: Genre,
    pub category: Category,
    pub creativity_level: CreativityLevel,
    /// ISO-8601 UTC timestamp.
    pub generated_at: String,
    /// Seconds, rounded to two decimals.
    pub processing_time: f64,
    pub model: String,
}

/// A generated story and its metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedStory {
    pub story: String,
    pub metadata: StoryMetadata,
}

/// Wires the prompt composer to a story generator.
#[derive(Clone)]
pub struct StoryService {
    composer: PromptComposer,
    generator: Arc<dyn StoryGenerator>,
}

impl StoryService {
    pub fn new(composer: PromptComposer, generator: Arc<dyn StoryGenerator>) -> Self {
        Self {
            composer,
            generator,
        }
    }

    pub fn composer(&self) -> &PromptComposer {
        &self.composer
    }

    /// Model identifier reported in metadata.
    pub fn model(&self) -> &str {
        self.generator.model()
    }

    /// Compose a prompt for `request` and generate a story from it.
    pub async fn generate(&self, request: &StoryRequest) -> Result<GeneratedStory, StoryError> {
        let started = Instant::now();
        info!(
            word_count = request.word_count(),
            genre = %request.genre(),
            creativity_level = %request.creativity_level(),
            category = %request.category(),
            suggestions = request.suggestions().unwrap_or("none"),
            "Generating story"
        );

        let prompt = self.composer.compose(request).map_err(|e| {
            error!(error = %e, genre = %request.genre(), "Prompt composition failed");
            e
        })?;
        let story = self.generator.generate(&prompt).await?;

        let elapsed = started.elapsed().as_secs_f64();
        info!(processing_time = round_secs(elapsed), "Story generated successfully");

        Ok(GeneratedStory {
            story,
            metadata: StoryMetadata {
                word_count: request.word_count(),
                genre: request.genre(),
                category: request.category(),
                creativity_level: request.creativity_level(),
                generated_at: iso_timestamp(Utc::now()),
                processing_time: round_secs(elapsed),
                model: self.model().to_string(),
            },
        })
    }
}

impl std::fmt::Debug for StoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryService")
            .field("composer", &self.composer)
            .field("model", &self.model())
            .finish()
    }
}

/// Format a timestamp as ISO-8601 with millisecond precision.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn round_secs(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{TemplateData, TemplateStore};
    use crate::testing::MockGenerator;
    use chrono::TimeZone;

    fn service(generator: MockGenerator) -> (StoryService, Arc<MockGenerator>) {
        let data = TemplateData::parse(include_str!("../../prompts.yaml")).unwrap();
        let composer = PromptComposer::new(Arc::new(TemplateStore::from_data(data)));
        let generator = Arc::new(generator);
        (StoryService::new(composer, generator.clone()), generator)
    }

    fn request() -> StoryRequest {
        StoryRequest::new(300, CreativityLevel::Creative, Genre::Fantasy, Category::Children)
            .unwrap()
    }

    #[tokio::test]
    async fn test_generate_builds_metadata() {
        let (service, generator) =
            service(MockGenerator::new(vec![Ok("Once upon a time there was a dragon...".into())]));

        let generated = service.generate(&request()).await.unwrap();

        assert_eq!(generated.story, "Once upon a time there was a dragon...");
        assert_eq!(generated.metadata.word_count, 300);
        assert_eq!(generated.metadata.genre, Genre::Fantasy);
        assert_eq!(generated.metadata.category, Category::Children);
        assert_eq!(generated.metadata.creativity_level, CreativityLevel::Creative);
        assert_eq!(generated.metadata.model, MockGenerator::MODEL);
        assert!(generated.metadata.processing_time >= 0.0);
        assert!(DateTime::parse_from_rfc3339(&generated.metadata.generated_at).is_ok());

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("300"));
    }

    #[tokio::test]
    async fn test_generation_failure_is_propagated_once() {
        let (service, generator) =
            service(MockGenerator::new(vec![Err(GenerationError::RateLimited("slow".into()))]));

        let err = service.generate(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            StoryError::Generation(GenerationError::RateLimited(_))
        ));
        assert_eq!(generator.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_template_failure_skips_generation() {
        let mut data = TemplateData::parse(include_str!("../../prompts.yaml")).unwrap();
        data.prompt_template = "{base_prompt} {plot_twist}".to_string();
        let composer = PromptComposer::new(Arc::new(TemplateStore::from_data(data)));
        let generator = Arc::new(MockGenerator::new(vec![]));
        let service = StoryService::new(composer, generator.clone());

        let err = service.generate(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            StoryError::Template(TemplateError::MissingPlaceholder { ref name }) if name == "plot_twist"
        ));
        assert!(generator.prompts().is_empty());
    }

    #[test]
    fn test_metadata_serialization() {
        let metadata = StoryMetadata {
            word_count: 300,
            genre: Genre::ScienceFiction,
            category: Category::All,
            creativity_level: CreativityLevel::Insane,
            generated_at: "2024-06-07T12:35:10.123Z".to_string(),
            processing_time: 1.23,
            model: "gpt-4o-mini".to_string(),
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["genre"], "science_fiction");
        assert_eq!(json["category"], "all");
        assert_eq!(json["creativity_level"], "insane");
        assert_eq!(json["processing_time"], 1.23);
    }

    #[test]
    fn test_timestamp_and_rounding() {
        let at = Utc.with_ymd_and_hms(2024, 6, 7, 12, 34, 56).unwrap();
        assert_eq!(iso_timestamp(at), "2024-06-07T12:34:56.000Z");
        assert_eq!(round_secs(1.23456), 1.23);
        assert_eq!(round_secs(0.005), 0.01);
    }
}
