//! HTTP-level tests for the story server.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`; story
//! generation is scripted with `MockGenerator`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use story_core::{GenerationError, MockGenerator, TemplateData, TemplateStore};
use story_server::error::GENERATION_FAILED;
use story_server::{app, AppState, CorsOrigins, Settings};
use tower::ServiceExt;

const PROMPTS: &str = include_str!("../../prompts.yaml");

fn store() -> Arc<TemplateStore> {
    Arc::new(TemplateStore::from_data(
        TemplateData::parse(PROMPTS).expect("bundled prompts parse"),
    ))
}

fn router_with(settings: Settings, store: Arc<TemplateStore>, mock: Arc<MockGenerator>) -> Router {
    app(AppState::new(settings, store, mock))
}

fn router(mock: Arc<MockGenerator>) -> Router {
    router_with(Settings::default(), store(), mock)
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(body: Value) -> Request<Body> {
    post_raw(body.to_string())
}

fn post_raw(body: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/generate-story")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.into()))
        .unwrap()
}

fn valid_body() -> Value {
    json!({
        "word_count": 300,
        "creativity_level": "creative",
        "genre": "fantasy",
        "category": "children",
        "suggestions": "a friendly dragon"
    })
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let (status, body) = send(router(Arc::new(MockGenerator::default())), get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Story Generator API");
    assert_eq!(body["model"], "gpt-4o-mini");
    assert!(body["version"].is_string());
    assert_eq!(body["endpoints"]["root"], "/");
    assert_eq!(body["endpoints"]["docs"], "/docs");
    assert_eq!(body["endpoints"]["generate_story"], "/generate-story");
    assert_eq!(body["endpoints"]["health"], "/health");
}

#[tokio::test]
async fn test_health_without_key_reports_not_configured() {
    let (status, body) = send(router(Arc::new(MockGenerator::default())), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["openai_status"], "not_configured");
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_health_with_key_reports_connected() {
    let settings = Settings {
        openai_api_key: Some("sk-test".to_string()),
        ..Settings::default()
    };
    let router = router_with(settings, store(), Arc::new(MockGenerator::default()));
    let (_, body) = send(router, get("/health")).await;

    assert_eq!(body["openai_status"], "connected");
}

#[tokio::test]
async fn test_docs_describes_request_and_templates() {
    let (status, body) = send(router(Arc::new(MockGenerator::default())), get("/docs")).await;

    assert_eq!(status, StatusCode::OK);
    let schema = &body["generate_story"];
    assert_eq!(schema["word_count"]["min"], 50);
    assert_eq!(schema["word_count"]["max"], 2000);
    assert_eq!(schema["creativity_level"], json!(["conservative", "creative", "insane"]));
    assert_eq!(schema["category"], json!(["all", "teen", "children"]));
    assert_eq!(schema["genre"].as_array().unwrap().len(), 8);
    assert!(body["template_genres"]
        .as_array()
        .unwrap()
        .contains(&json!("fantasy")));
    assert_eq!(
        body["template_creativity_levels"],
        json!(["conservative", "creative", "insane"])
    );
}

#[tokio::test]
async fn test_generate_story_returns_story_and_metadata() {
    let mock = Arc::new(MockGenerator::with_story("Once upon a time, a dragon made friends."));
    let (status, body) = send(router(Arc::clone(&mock)), post_json(valid_body())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["story"], "Once upon a time, a dragon made friends.");
    let metadata = &body["metadata"];
    assert_eq!(metadata["word_count"], 300);
    assert_eq!(metadata["genre"], "fantasy");
    assert_eq!(metadata["category"], "children");
    assert_eq!(metadata["creativity_level"], "creative");
    assert_eq!(metadata["model"], MockGenerator::MODEL);
    assert!(metadata["processing_time"].as_f64().unwrap() >= 0.0);
    assert!(metadata["generated_at"].as_str().unwrap().ends_with('Z'));

    let prompts = mock.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("a friendly dragon"));
    assert!(prompts[0].contains("wondrous and epic"));
}

#[tokio::test]
async fn test_short_word_count_is_rejected_without_generating() {
    let mock = Arc::new(MockGenerator::with_story("unused"));
    let mut body = valid_body();
    body["word_count"] = json!(10);

    let (status, body) = send(router(Arc::clone(&mock)), post_json(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let detail = body["detail"].as_array().expect("detail list");
    assert_eq!(detail[0]["loc"], json!(["body", "word_count"]));
    assert!(mock.prompts().is_empty());
}

#[tokio::test]
async fn test_every_invalid_field_is_reported() {
    let body = json!({
        "word_count": 5000,
        "creativity_level": "wild",
        "genre": "western",
        "category": "adults"
    });

    let (status, body) = send(router(Arc::new(MockGenerator::default())), post_json(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["detail"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["loc"][1].as_str().unwrap())
        .collect();
    for field in ["word_count", "creativity_level", "genre", "category"] {
        assert!(fields.contains(&field), "missing error for {field}: {fields:?}");
    }
}

#[tokio::test]
async fn test_malformed_json_is_unprocessable() {
    let (status, body) = send(
        router(Arc::new(MockGenerator::default())),
        post_raw("{\"word_count\": 300,"),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_missing_field_is_unprocessable() {
    let (status, _) = send(
        router(Arc::new(MockGenerator::default())),
        post_json(json!({ "word_count": 300, "genre": "fantasy" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_generation_failure_hides_cause() {
    let mock = Arc::new(MockGenerator::failing(GenerationError::AuthenticationFailure(
        "Incorrect API key provided: sk-***".into(),
    )));

    let (status, body) = send(router(mock), post_json(valid_body())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], GENERATION_FAILED);
}

#[tokio::test]
async fn test_rate_limit_is_reported_as_generic_failure() {
    let mock = Arc::new(MockGenerator::failing(GenerationError::RateLimited(
        "slow down".into(),
    )));

    let (status, body) = send(router(mock), post_json(valid_body())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], GENERATION_FAILED);
}

#[tokio::test]
async fn test_template_error_names_missing_key() {
    let mut data = TemplateData::parse(PROMPTS).unwrap();
    data.prompt_template = "{base_prompt}\nMood: {mood}".to_string();
    let store = Arc::new(TemplateStore::from_data(data));
    let mock = Arc::new(MockGenerator::with_story("unused"));

    let (status, body) = send(
        router_with(Settings::default(), store, Arc::clone(&mock)),
        post_json(valid_body()),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("mood"));
    assert!(mock.prompts().is_empty());
}

#[tokio::test]
async fn test_reload_is_visible_to_next_request() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prompts.yaml");
    std::fs::write(&path, PROMPTS).unwrap();
    let store = Arc::new(TemplateStore::open(path.clone()).unwrap());
    let mock = Arc::new(MockGenerator::new(vec![Ok("one".into()), Ok("two".into())]));
    let router = router_with(Settings::default(), Arc::clone(&store), Arc::clone(&mock));

    let (status, _) = send(router.clone(), post_json(valid_body())).await;
    assert_eq!(status, StatusCode::OK);

    std::fs::write(&path, PROMPTS.replace("wondrous and epic", "hushed and eerie")).unwrap();
    store.reload().unwrap();

    let (status, _) = send(router, post_json(valid_body())).await;
    assert_eq!(status, StatusCode::OK);

    let prompts = mock.prompts();
    assert!(prompts[0].contains("wondrous and epic"));
    assert!(prompts[1].contains("hushed and eerie"));
}

#[tokio::test]
async fn test_cors_allow_list_echoes_permitted_origin() {
    let settings = Settings {
        cors_origins: CorsOrigins::List(vec!["http://localhost:3000".to_string()]),
        ..Settings::default()
    };
    let router = router_with(settings, store(), Arc::new(MockGenerator::default()));
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:3000"
    );
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .unwrap(),
        "true"
    );
}

#[tokio::test]
async fn test_cors_allow_all_echoes_origin_with_credentials() {
    let router = router(Arc::new(MockGenerator::default()));
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/generate-story")
        .header(header::ORIGIN, "https://stories.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let headers = response.headers();

    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "https://stories.example.com"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
    assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(), "POST");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (status, _) = send(router(Arc::new(MockGenerator::default())), get("/stories")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
