//! HTTP routes and handlers.

use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use story_core::request::{MAX_WORD_COUNT, MIN_WORD_COUNT};
use story_core::service::iso_timestamp;
use story_core::{Category, CreativityLevel, GeneratedStory, Genre, StoryRequest, StoryRequestBody};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::CorsOrigins;
use crate::error::ApiError;
use crate::state::AppState;

/// API name reported by `/`.
pub const API_NAME: &str = "Story Generator API";
/// API version reported by `/`.
pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.settings().cors_origins);
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/docs", get(docs))
        .route("/generate-story", post(generate_story))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    match origins {
        // `*` cannot be combined with credentials, so the request origin is echoed.
        CorsOrigins::Any => CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true),
        CorsOrigins::List(list) => {
            let parsed: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(%origin, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(parsed))
                .allow_methods(AllowMethods::list([Method::GET, Method::POST, Method::OPTIONS]))
                .allow_headers(AllowHeaders::mirror_request())
                .allow_credentials(true)
                .max_age(Duration::from_secs(600))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Endpoints {
    pub root: &'static str,
    pub docs: &'static str,
    pub generate_story: &'static str,
    pub health: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub version: &'static str,
    pub model: String,
    pub endpoints: Endpoints,
}

async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: API_NAME,
        version: API_VERSION,
        model: state.settings().openai_model.clone(),
        endpoints: Endpoints {
            root: "/",
            docs: "/docs",
            generate_story: "/generate-story",
            health: "/health",
        },
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub openai_status: &'static str,
    pub timestamp: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        openai_status: state.settings().credential_status().as_str(),
        timestamp: iso_timestamp(Utc::now()),
    })
}

#[derive(Debug, Serialize)]
pub struct WordCountRange {
    pub min: u32,
    pub max: u32,
}

#[derive(Debug, Serialize)]
pub struct RequestSchema {
    pub word_count: WordCountRange,
    pub creativity_level: Vec<&'static str>,
    pub genre: Vec<&'static str>,
    pub category: Vec<&'static str>,
    pub suggestions: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DocsResponse {
    pub generate_story: RequestSchema,
    /// Genre ids that have template fragments; others fall back to the default.
    pub template_genres: Vec<String>,
    pub template_creativity_levels: Vec<String>,
}

async fn docs(State(state): State<AppState>) -> Json<DocsResponse> {
    let templates = state.store().snapshot();
    Json(DocsResponse {
        generate_story: RequestSchema {
            word_count: WordCountRange {
                min: MIN_WORD_COUNT,
                max: MAX_WORD_COUNT,
            },
            creativity_level: CreativityLevel::ids(),
            genre: Genre::ids(),
            category: Category::ids(),
            suggestions: "optional free text",
        },
        template_genres: templates.available_genres(),
        template_creativity_levels: templates.available_creativity_levels(),
    })
}

async fn generate_story(
    State(state): State<AppState>,
    body: Result<Json<StoryRequestBody>, JsonRejection>,
) -> Result<Json<GeneratedStory>, ApiError> {
    let Json(body) = body?;
    let request = StoryRequest::try_from(body)?;

    let span = info_span!("generate_story", request_id = %Uuid::new_v4());
    async move {
        info!(
            word_count = request.word_count(),
            genre = %request.genre(),
            creativity_level = %request.creativity_level(),
            category = %request.category(),
            "Story request received"
        );
        let generated = state.service().generate(&request).await?;
        info!(
            processing_time = generated.metadata.processing_time,
            "Story request completed"
        );
        Ok::<_, ApiError>(Json(generated))
    }
    .instrument(span)
    .await
}
