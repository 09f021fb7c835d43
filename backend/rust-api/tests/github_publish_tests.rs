use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Value};

use cybertraining_api::services::github_service::{GithubClient, GithubTarget};

async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub serve");
    });
    format!("http://{addr}")
}

fn target() -> GithubTarget {
    GithubTarget {
        owner: "acme".to_string(),
        repo: "training-mirror".to_string(),
        path: "data.json".to_string(),
        token: "ghp_test".to_string(),
    }
}

const CONTENTS_ROUTE: &str = "/repos/acme/training-mirror/contents/data.json";

#[tokio::test]
async fn publish_carries_the_prior_sha_and_strips_the_token() {
    let recorded: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
    let put_recorded = recorded.clone();

    let router = Router::new().route(
        CONTENTS_ROUTE,
        get(|| async { Json(json!({"sha": "oldsha123", "size": 42})) }).put(
            move |Json(body): Json<Value>| {
                let recorded = put_recorded.clone();
                async move {
                    *recorded.lock().unwrap() = Some(body.clone());
                    if body.get("sha").and_then(Value::as_str) == Some("oldsha123") {
                        (
                            StatusCode::OK,
                            Json(json!({"commit": {"sha": "deadbeefcafebabe"}})),
                        )
                    } else {
                        (
                            StatusCode::CONFLICT,
                            Json(json!({"message": "data.json does not match"})),
                        )
                    }
                }
            },
        ),
    );
    let base = spawn_stub(router).await;
    let client = GithubClient::with_api_base(reqwest::Client::new(), base);

    let snapshot = json!({
        "users": [],
        "settings": {"githubOwner": "acme", "githubPat": "ghp_supersecret"}
    });
    let outcome = client.publish(&target(), &snapshot).await.expect("publish");
    assert_eq!(outcome.commit, "deadbee");

    let body = recorded.lock().unwrap().clone().expect("upsert recorded");
    let encoded = body["content"].as_str().expect("content field");
    let decoded = String::from_utf8(
        general_purpose::STANDARD
            .decode(encoded)
            .expect("valid base64"),
    )
    .expect("utf8");
    assert!(!decoded.contains("ghp_supersecret"));
    assert!(decoded.contains("githubOwner"));
    assert!(body["message"].as_str().unwrap_or("").starts_with("Sync training data"));
}

#[tokio::test]
async fn missing_file_publishes_without_a_sha() {
    let router = Router::new().route(
        CONTENTS_ROUTE,
        get(|| async { (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"}))) }).put(
            |Json(body): Json<Value>| async move {
                if body.get("sha").is_some() {
                    return (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        Json(json!({"message": "sha provided for a new file"})),
                    );
                }
                (
                    StatusCode::CREATED,
                    Json(json!({"commit": {"sha": "0123456789ab"}})),
                )
            },
        ),
    );
    let base = spawn_stub(router).await;
    let client = GithubClient::with_api_base(reqwest::Client::new(), base);

    let outcome = client
        .publish(&target(), &json!({"users": []}))
        .await
        .expect("create publish");
    assert_eq!(outcome.commit, "0123456");
}

#[tokio::test]
async fn stale_sha_conflict_surfaces_the_remote_message() {
    let router = Router::new().route(
        CONTENTS_ROUTE,
        get(|| async { Json(json!({"sha": "stale", "size": 10})) }).put(|| async {
            (
                StatusCode::CONFLICT,
                Json(json!({"message": "data.json does not match stale"})),
            )
        }),
    );
    let base = spawn_stub(router).await;
    let client = GithubClient::with_api_base(reqwest::Client::new(), base);

    let err = client
        .publish(&target(), &json!({"users": []}))
        .await
        .expect_err("conflict");
    assert_eq!(err.status, Some(409));
    assert_eq!(err.message, "data.json does not match stale");
}

#[tokio::test]
async fn bad_credentials_propagate_the_upstream_status() {
    let router = Router::new().route(
        CONTENTS_ROUTE,
        get(|| async { (StatusCode::UNAUTHORIZED, Json(json!({"message": "Bad credentials"}))) }),
    );
    let base = spawn_stub(router).await;
    let client = GithubClient::with_api_base(reqwest::Client::new(), base);

    let err = client.publish(&target(), &json!({})).await.expect_err("auth");
    assert_eq!(err.status, Some(401));
    assert_eq!(err.message, "Bad credentials");

    let err = client.fetch(&target()).await.expect_err("auth");
    assert_eq!(err.status, Some(401));
}

#[tokio::test]
async fn fetch_decodes_inline_content() {
    let stored = json!({"users": [], "quizzes": []});
    let encoded = general_purpose::STANDARD.encode(stored.to_string());
    // The contents API wraps base64 at 60 columns.
    let wrapped = format!("{}\n{}", &encoded[..12], &encoded[12..]);

    let router = Router::new().route(
        CONTENTS_ROUTE,
        get(move || async move {
            Json(json!({"sha": "abc123", "size": 40, "content": wrapped}))
        }),
    );
    let base = spawn_stub(router).await;
    let client = GithubClient::with_api_base(reqwest::Client::new(), base);

    let value = client.fetch(&target()).await.expect("fetch");
    assert_eq!(value, stored);
}

#[tokio::test]
async fn fetch_falls_back_to_the_blob_endpoint_for_large_files() {
    let stored = json!({"users": [], "settings": {"companyName": "Acme Corp"}});
    let encoded = general_purpose::STANDARD.encode(stored.to_string());

    let router = Router::new()
        .route(
            CONTENTS_ROUTE,
            get(|| async {
                // Oversized files report their size but omit inline content.
                Json(json!({"sha": "bigsha", "size": 2_000_000}))
            }),
        )
        .route(
            "/repos/acme/training-mirror/git/blobs/bigsha",
            get(move || async move { Json(json!({"content": encoded, "encoding": "base64"})) }),
        );
    let base = spawn_stub(router).await;
    let client = GithubClient::with_api_base(reqwest::Client::new(), base);

    let value = client.fetch(&target()).await.expect("fetch large file");
    assert_eq!(value, stored);
}

#[tokio::test]
async fn fetch_reports_a_missing_file() {
    let router = Router::new().route(
        CONTENTS_ROUTE,
        get(|| async { (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"}))) }),
    );
    let base = spawn_stub(router).await;
    let client = GithubClient::with_api_base(reqwest::Client::new(), base);

    let err = client.fetch(&target()).await.expect_err("missing file");
    assert_eq!(err.status, Some(404));
    assert!(err.message.contains("data.json"));
}
