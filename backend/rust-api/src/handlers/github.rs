use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::models::snapshot::Snapshot;
use crate::services::github_service::{self, GithubClient, GithubTarget};
use crate::services::AppState;

use super::ApiError;

#[derive(Debug, Deserialize)]
pub struct ProxyRequest {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub pat: String,
}

/// Read-only proxy to the repository file: connection testing and manual
/// "pull from mirror" imports. Upstream status and message pass through.
pub async fn github_proxy(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ProxyRequest>,
) -> Result<Json<Value>, ApiError> {
    let client = GithubClient::new(state.http.clone());
    let target = GithubTarget {
        owner: payload.owner,
        repo: payload.repo,
        path: payload.path,
        token: payload.pat,
    };
    let contents = client.fetch(&target).await?;
    Ok(Json(contents))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishSettings {
    #[serde(default)]
    pub github_owner: String,
    #[serde(default)]
    pub github_repo: String,
    #[serde(default)]
    pub github_path: String,
    #[serde(default)]
    pub github_pat: String,
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub settings: PublishSettings,
    pub data: Value,
}

/// Explicit admin-triggered publish of an arbitrary snapshot payload.
pub async fn publish_github(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PublishRequest>,
) -> Result<Json<Value>, ApiError> {
    let target = credentials_to_target(
        &payload.settings.github_owner,
        &payload.settings.github_repo,
        &payload.settings.github_path,
        &payload.settings.github_pat,
    )?;
    let client = GithubClient::new(state.http.clone());
    let outcome = client.publish(&target, &payload.data).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Synced to GitHub ({})", outcome.commit),
    })))
}

/// Full-snapshot publish with the credentials embedded in the snapshot's own
/// settings; the token is stripped before anything goes upstream.
pub async fn sync_github(
    State(state): State<Arc<AppState>>,
    Json(snapshot): Json<Snapshot>,
) -> Result<Json<Value>, ApiError> {
    let Some(target) = github_service::target_from_settings(&snapshot.settings) else {
        return Err(ApiError::bad_request("GitHub settings are incomplete"));
    };
    let value = serde_json::to_value(snapshot.sanitized())
        .map_err(|err| ApiError::internal(err.to_string()))?;
    let client = GithubClient::new(state.http.clone());
    let outcome = client.publish(&target, &value).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Synced to GitHub ({})", outcome.commit),
    })))
}

fn credentials_to_target(
    owner: &str,
    repo: &str,
    path: &str,
    pat: &str,
) -> Result<GithubTarget, ApiError> {
    if owner.trim().is_empty()
        || repo.trim().is_empty()
        || path.trim().is_empty()
        || pat.trim().is_empty()
    {
        return Err(ApiError::bad_request("GitHub settings are incomplete"));
    }
    Ok(GithubTarget {
        owner: owner.trim().to_string(),
        repo: repo.trim().to_string(),
        path: path.trim().to_string(),
        token: pat.trim().to_string(),
    })
}
