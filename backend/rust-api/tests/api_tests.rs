use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use cybertraining_api::services::kv::MemoryKv;
use cybertraining_api::services::seed;
use cybertraining_api::{create_router, AppState, Config};

fn test_router() -> axum::Router {
    let state = Arc::new(AppState {
        config: Config {
            redis_uri: "redis://127.0.0.1:6379/0".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            debounce_ms: 200,
            cache_path: "data/test-cache.json".to_string(),
        },
        kv: Arc::new(MemoryKv::new()),
        http: reqwest::Client::new(),
    });
    create_router(state)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

fn post_json(uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn health_reports_a_reachable_store() {
    let router = test_router();
    let response = router.oneshot(get("/health")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "cybertraining-api");
    assert_eq!(body["dependencies"]["keyValueStore"]["status"], "healthy");
}

#[tokio::test]
async fn data_endpoint_seeds_and_returns_defaults() {
    let router = test_router();
    let response = router.oneshot(get("/api/data")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["users"].as_array().map(Vec::len), Some(6));
    assert_eq!(body["settings"]["companyName"], "Acme Corp");
    // A never-written store carries no category layout.
    assert!(body["moduleCategories"].is_null());
}

#[tokio::test]
async fn update_requires_the_full_payload() {
    let router = test_router();
    let response = router
        .oneshot(post_json("/api/update", &json!({"users": []})))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"], "users, quizzes and settings are required");
}

#[tokio::test]
async fn update_then_read_round_trips() {
    let router = test_router();

    let quizzes = seed::default_quizzes();
    let payload = json!({
        "users": seed::default_users(),
        "quizzes": quizzes,
        "moduleCategories": seed::derive_module_categories(&quizzes),
        "settings": {
            "companyName": "Round Trip Ltd",
            "certificateText": "Done.",
            "githubOwner": "", "githubRepo": "", "githubPath": "", "githubPat": ""
        },
    });
    let response = router
        .clone()
        .oneshot(post_json("/api/update", &payload))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["success"], true);

    let response = router.oneshot(get("/api/data")).await.expect("response");
    let body = json_body(response).await;
    assert_eq!(body["settings"]["companyName"], "Round Trip Ltd");
    assert!(!body["moduleCategories"].as_array().expect("layout").is_empty());
}

#[tokio::test]
async fn partial_update_rejects_unknown_keys() {
    let router = test_router();
    let response = router
        .oneshot(post_json(
            "/api/update-partial",
            &json!({"key": "emailLog", "value": []}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .starts_with("Invalid key 'emailLog'"));
}

#[tokio::test]
async fn partial_update_writes_one_partition() {
    let router = test_router();
    // First read seeds the defaults.
    router
        .clone()
        .oneshot(get("/api/data"))
        .await
        .expect("seed read");

    let mut settings = seed::default_settings();
    settings.company_name = "Patched Corp".to_string();
    let response = router
        .clone()
        .oneshot(post_json(
            "/api/update-partial",
            &json!({"key": "settings", "value": settings}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["key"], "settings");

    let response = router.oneshot(get("/api/data")).await.expect("response");
    let body = json_body(response).await;
    assert_eq!(body["settings"]["companyName"], "Patched Corp");
    // Sibling partitions keep their seeded values.
    assert_eq!(body["users"].as_array().map(Vec::len), Some(6));
}

#[tokio::test]
async fn sync_github_rejects_incomplete_credentials() {
    let router = test_router();
    let snapshot = seed::default_snapshot();
    let response = router
        .oneshot(post_json(
            "/api/sync-github",
            &serde_json::to_value(&snapshot).expect("serialize"),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "GitHub settings are incomplete");
}
