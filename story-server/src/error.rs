//! Error types for the story server.
//!
//! [`ConfigError`] covers startup configuration. [`ApiError`] is what a
//! handler returns; it maps each failure to a status code and a `{detail}`
//! body, logging internal detail instead of echoing it.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use story_core::{LoadError, StoryError, TemplateError, ValidationErrors};
use thiserror::Error;
use tracing::{error, warn};

/// Caller-visible message for every generation failure.
pub const GENERATION_FAILED: &str = "Failed to generate story. Please try again later.";

/// Startup configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

/// Errors from re-reading the template file at runtime.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("template reload task did not finish: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}

/// Errors returned from HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request fields failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// The body was not JSON of the expected shape.
    #[error("unprocessable request body: {0}")]
    Unprocessable(String),

    /// Story generation failed for any reason.
    #[error(transparent)]
    Story(#[from] StoryError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Unprocessable(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
struct FieldDetail {
    loc: [&'static str; 2],
    msg: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => {
                warn!(%errors, "Story request failed validation");
                let detail: Vec<FieldDetail> = errors
                    .errors()
                    .iter()
                    .map(|e| FieldDetail {
                        loc: ["body", e.field],
                        msg: e.message.clone(),
                    })
                    .collect();
                (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))).into_response()
            }
            ApiError::Unprocessable(message) => {
                warn!(%message, "Story request body rejected");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "detail": message })),
                )
                    .into_response()
            }
            ApiError::Story(StoryError::Template(err)) => {
                error!(error = %err, "Prompt template error");
                let detail = match &err {
                    TemplateError::MissingPlaceholder { name } => {
                        format!("Prompt template error: missing parameter '{name}'")
                    }
                    TemplateError::Malformed(_) => "Prompt template error: malformed template".to_string(),
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": detail })),
                )
                    .into_response()
            }
            ApiError::Story(StoryError::Generation(err)) => {
                error!(error = %err, cause = ?err, "Story generation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": GENERATION_FAILED })),
                )
                    .into_response()
            }
        }
    }
}
