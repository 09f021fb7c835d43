use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::services::partitioned_store::KEY_SETTINGS;
use crate::services::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut dependencies = serde_json::Map::new();

    // Probe the key-value store with a cheap read.
    let store_health = match tokio::time::timeout(
        std::time::Duration::from_millis(500),
        state.kv.get(KEY_SETTINGS),
    )
    .await
    {
        Ok(Ok(_)) => json!({"status": "healthy", "message": "Key-value store reachable"}),
        Ok(Err(e)) => json!({"status": "unhealthy", "error": format!("Store error: {}", e)}),
        Err(_) => json!({"status": "unhealthy", "error": "Store timeout after 500ms"}),
    };
    let healthy = store_health.get("status").and_then(|v| v.as_str()) == Some("healthy");
    dependencies.insert("keyValueStore".to_string(), store_health);

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(json!({
            "status": if healthy { "healthy" } else { "degraded" },
            "service": "cybertraining-api",
            "version": env!("CARGO_PKG_VERSION"),
            "dependencies": dependencies
        })),
    )
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    /// Upstream (GitHub) failure whose status and message are propagated
    /// unmodified.
    Upstream(Option<u16>, String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<crate::services::github_service::GithubError> for ApiError {
    fn from(err: crate::services::github_service::GithubError) -> Self {
        ApiError::Upstream(err.status, err.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Upstream(status, message) => (
                status
                    .and_then(|code| StatusCode::from_u16(code).ok())
                    .unwrap_or(StatusCode::BAD_GATEWAY),
                message,
            ),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub mod data;
pub mod github;
