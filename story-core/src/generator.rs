//! Story generation through a chat-completion model.
//!
//! [`StoryGenerator`] is the seam between the service and the provider; the
//! production implementation is [`OpenAiGenerator`], tests use
//! [`MockGenerator`](crate::testing::MockGenerator).

use async_trait::async_trait;
use openai::{FinishReason, Message, OpenAi, Request, Response};
use thiserror::Error;
use tracing::{error, info, warn};

/// System instruction sent with every story request.
pub const SYSTEM_INSTRUCTION: &str = "You are an expert creative fiction writer. \
Respond only with the requested story, without introductions or additional explanations.";

/// Fixed nucleus-sampling value.
pub const TOP_P: f32 = 0.9;
/// Fixed frequency penalty.
pub const FREQUENCY_PENALTY: f32 = 0.1;
/// Fixed presence penalty.
pub const PRESENCE_PENALTY: f32 = 0.1;

/// Why a generation attempt failed.
///
/// Callers see one generic failure; the variant is for logging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("language model credential is not configured")]
    NotConfigured,

    #[error("authentication with the language model provider failed: {0}")]
    AuthenticationFailure(String),

    #[error("language model provider rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("language model provider error: {0}")]
    UpstreamError(String),

    #[error("language model returned no text")]
    EmptyCompletion,

    #[error("unexpected failure while generating story: {0}")]
    UnknownFailure(String),
}

impl From<openai::Error> for GenerationError {
    fn from(err: openai::Error) -> Self {
        match err {
            openai::Error::NoApiKey => GenerationError::NotConfigured,
            openai::Error::Api {
                status: 401 | 403,
                message,
            } => GenerationError::AuthenticationFailure(message),
            openai::Error::Api {
                status: 429,
                message,
            } => GenerationError::RateLimited(message),
            openai::Error::Api { status, message } => {
                GenerationError::UpstreamError(format!("status {status}: {message}"))
            }
            openai::Error::Network(message) => GenerationError::UpstreamError(message),
            openai::Error::Config(message) => GenerationError::AuthenticationFailure(message),
            openai::Error::Parse(message) => GenerationError::UnknownFailure(message),
        }
    }
}

/// Model and sampling parameters for a generation call.
///
/// Only model, max tokens and temperature are configurable; the remaining
/// parameters are the crate constants.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl SamplingConfig {
    pub fn top_p(&self) -> f32 {
        TOP_P
    }

    pub fn frequency_penalty(&self) -> f32 {
        FREQUENCY_PENALTY
    }

    pub fn presence_penalty(&self) -> f32 {
        PRESENCE_PENALTY
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            model: openai::DEFAULT_MODEL.to_string(),
            max_tokens: 2000,
            temperature: 0.8,
        }
    }
}

/// Build the two-message chat request for a composed prompt.
pub fn build_request(prompt: &str, config: &SamplingConfig) -> Request {
    Request::new(vec![Message::system(SYSTEM_INSTRUCTION), Message::user(prompt)])
        .with_model(config.model.clone())
        .with_max_tokens(config.max_tokens)
        .with_temperature(config.temperature)
        .with_top_p(config.top_p())
        .with_frequency_penalty(config.frequency_penalty())
        .with_presence_penalty(config.presence_penalty())
}

/// Something that turns a composed prompt into story text.
#[async_trait]
pub trait StoryGenerator: Send + Sync {
    /// Generate a story for the prompt. Makes at most one upstream call.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Model identifier reported in story metadata.
    fn model(&self) -> &str;
}

/// [`StoryGenerator`] backed by the OpenAI chat-completions API.
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    /// The client, or the error every call reports when none could be built.
    client: Result<OpenAi, GenerationError>,
    config: SamplingConfig,
}

impl OpenAiGenerator {
    /// Build a generator. Without a key every call fails with
    /// [`GenerationError::NotConfigured`]; if the HTTP client cannot be
    /// built, every call fails with that error instead.
    pub fn new(api_key: Option<&str>, config: SamplingConfig) -> Self {
        let client = match api_key {
            None => Err(openai::Error::NoApiKey),
            Some(key) => OpenAi::new(key),
        };
        Self::from_client(client, config)
    }

    fn from_client(client: Result<OpenAi, openai::Error>, config: SamplingConfig) -> Self {
        let client = client
            .map(|c| c.with_model(config.model.clone()))
            .map_err(|e| {
                if !matches!(e, openai::Error::NoApiKey) {
                    error!(error = %e, "OpenAI client could not be created");
                }
                GenerationError::from(e)
            });
        Self { client, config }
    }

    /// Point the underlying client at another API root.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.client = self.client.map(|c| c.with_base_url(base_url));
        self
    }

    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_ok()
    }
}

/// Whether the model stopped because it ran into `max_tokens`.
fn was_truncated(response: &Response) -> bool {
    response
        .choices
        .first()
        .is_some_and(|c| c.finish_reason == Some(FinishReason::Length))
}

#[async_trait]
impl StoryGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let client = match &self.client {
            Ok(client) => client,
            Err(GenerationError::NotConfigured) => {
                error!("OPENAI_API_KEY is not set; cannot generate story");
                return Err(GenerationError::NotConfigured);
            }
            Err(err) => {
                error!(error = %err, "OpenAI client unavailable; cannot generate story");
                return Err(err.clone());
            }
        };

        let response = client
            .complete(build_request(prompt, &self.config))
            .await
            .map_err(|e| {
                let status = e.status();
                let err = GenerationError::from(e);
                match &err {
                    GenerationError::AuthenticationFailure(_) => {
                        error!(error = %err, ?status, "Authentication with OpenAI failed - check the API key")
                    }
                    GenerationError::RateLimited(_) => {
                        error!(error = %err, ?status, "OpenAI rate limit exceeded")
                    }
                    _ => error!(error = %err, ?status, "OpenAI request failed"),
                }
                err
            })?;

        let story = response
            .first_text()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                error!(response_id = %response.id, "OpenAI returned no content");
                GenerationError::EmptyCompletion
            })?
            .to_string();

        if was_truncated(&response) {
            warn!(
                max_tokens = self.config.max_tokens,
                "Story was cut off at the token limit"
            );
        }
        info!(
            model = %response.model,
            words = story.split_whitespace().count(),
            prompt_tokens = response.usage.as_ref().map(|u| u.prompt_tokens),
            completion_tokens = response.usage.as_ref().map(|u| u.completion_tokens),
            "Story generated"
        );
        Ok(story)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
