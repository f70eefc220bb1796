//! Testing utilities.
//!
//! `MockGenerator` returns scripted results without calling any API, and
//! records every prompt it was asked to complete.

use crate::generator::{GenerationError, StoryGenerator};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// A story generator that returns scripted results in order.
#[derive(Debug, Default)]
pub struct MockGenerator {
    /// Results still to hand out.
    responses: Mutex<VecDeque<Result<String, GenerationError>>>,
    /// Prompts received so far.
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    /// Model id reported by the mock.
    pub const MODEL: &'static str = "mock-model";

    /// Story returned once the script runs out.
    pub const EXHAUSTED: &'static str = "The storyteller has no more scripted stories.";

    /// Create a mock with scripted results.
    pub fn new(responses: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A mock whose first call returns `story`.
    pub fn with_story(story: impl Into<String>) -> Self {
        Self::new(vec![Ok(story.into())])
    }

    /// A mock whose first call fails with `error`.
    pub fn failing(error: GenerationError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Every prompt passed to [`StoryGenerator::generate`], in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl StoryGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());

        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Ok(Self::EXHAUSTED.to_string()))
    }

    fn model(&self) -> &str {
        Self::MODEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_script_then_default() {
        let mock = MockGenerator::new(vec![
            Ok("first".to_string()),
            Err(GenerationError::EmptyCompletion),
        ]);

        assert_eq!(mock.generate("a").await.unwrap(), "first");
        assert_eq!(mock.generate("b").await, Err(GenerationError::EmptyCompletion));
        assert_eq!(mock.generate("c").await.unwrap(), MockGenerator::EXHAUSTED);
        assert_eq!(mock.prompts(), vec!["a", "b", "c"]);
    }
}
