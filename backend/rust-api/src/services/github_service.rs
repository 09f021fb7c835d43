use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::models::settings::AppSettings;

const DEFAULT_API_BASE: &str = "https://api.github.com";
/// Above roughly this size the contents API omits inline content and the
/// blob endpoint must be used instead.
const INLINE_CONTENT_CEILING: u64 = 1_000_000;

#[derive(Debug, Clone)]
pub struct GithubTarget {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub token: String,
}

/// Mirror credentials come out of the application settings; `None` while any
/// of the four fields is missing (the mirror stays disabled, never retried).
pub fn target_from_settings(settings: &AppSettings) -> Option<GithubTarget> {
    if !settings.github_configured() {
        return None;
    }
    Some(GithubTarget {
        owner: settings.github_owner.trim().to_string(),
        repo: settings.github_repo.trim().to_string(),
        path: settings.github_path.trim().to_string(),
        token: settings.github_pat.trim().to_string(),
    })
}

#[derive(Debug)]
pub struct PublishOutcome {
    /// Short commit reference of the mirror commit.
    pub commit: String,
}

/// Upstream failure with the remote status and message kept unmodified so
/// the admin can diagnose credential/path/conflict problems.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct GithubError {
    pub status: Option<u16>,
    pub message: String,
}

impl GithubError {
    fn transport(err: reqwest::Error) -> Self {
        Self {
            status: None,
            message: format!("GitHub request failed: {err}"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ContentsMeta {
    sha: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    content: Option<String>,
}

pub struct GithubClient {
    http: Client,
    api_base: String,
}

impl GithubClient {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Tests point this at a local stub server.
    pub fn with_api_base(http: Client, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into(),
        }
    }

    fn contents_url(&self, target: &GithubTarget) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base, target.owner, target.repo, target.path
        )
    }

    fn request(&self, method: Method, url: String, token: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("Authorization", format!("Bearer {token}"))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "cybertraining-api")
    }

    /// Step one of the read-modify-write cycle: the current content hash. A
    /// missing file means "create"; any other failure aborts the publish with
    /// the upstream message.
    async fn current_meta(
        &self,
        target: &GithubTarget,
    ) -> Result<Option<ContentsMeta>, GithubError> {
        let response = self
            .request(Method::GET, self.contents_url(target), &target.token)
            .send()
            .await
            .map_err(GithubError::transport)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let meta = response.json().await.map_err(GithubError::transport)?;
                Ok(Some(meta))
            }
            status => Err(GithubError {
                status: Some(status.as_u16()),
                message: remote_message(response).await,
            }),
        }
    }

    /// SHA-aware read-modify-write upsert of the snapshot file. The prior
    /// content hash rides along as an optimistic-concurrency check: if
    /// another writer updated the file after we read the hash, the upsert is
    /// rejected and the whole publish fails instead of overwriting.
    pub async fn publish(
        &self,
        target: &GithubTarget,
        snapshot: &Value,
    ) -> Result<PublishOutcome, GithubError> {
        let prior = self.current_meta(target).await?;

        let mut snapshot = snapshot.clone();
        strip_token(&mut snapshot);
        let pretty = serde_json::to_string_pretty(&snapshot).map_err(|err| GithubError {
            status: None,
            message: format!("Failed to serialize snapshot: {err}"),
        })?;

        let mut body = json!({
            "message": format!("Sync training data {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC")),
            "content": general_purpose::STANDARD.encode(pretty),
        });
        if let Some(meta) = &prior {
            body["sha"] = json!(meta.sha);
        }

        let response = self
            .request(Method::PUT, self.contents_url(target), &target.token)
            .json(&body)
            .send()
            .await
            .map_err(GithubError::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GithubError {
                status: Some(status.as_u16()),
                message: remote_message(response).await,
            });
        }

        let result: Value = response.json().await.map_err(GithubError::transport)?;
        let commit = result
            .pointer("/commit/sha")
            .and_then(Value::as_str)
            .map(|sha| sha.chars().take(7).collect())
            .unwrap_or_default();
        Ok(PublishOutcome { commit })
    }

    /// Read-only variant used for connection tests and manual pulls. Falls
    /// back to the blob endpoint when the contents API omits inline content
    /// for large files. Never writes.
    pub async fn fetch(&self, target: &GithubTarget) -> Result<Value, GithubError> {
        let meta = self
            .current_meta(target)
            .await?
            .ok_or_else(|| GithubError {
                status: Some(404),
                message: format!("File '{}' not found in repository", target.path),
            })?;

        let encoded = match &meta.content {
            Some(content) if !content.trim().is_empty() => content.clone(),
            _ if meta.size > INLINE_CONTENT_CEILING || meta.content.is_none() => {
                self.fetch_blob(target, &meta.sha).await?
            }
            _ => String::new(),
        };
        decode_content(&encoded)
    }

    async fn fetch_blob(&self, target: &GithubTarget, sha: &str) -> Result<String, GithubError> {
        let url = format!(
            "{}/repos/{}/{}/git/blobs/{}",
            self.api_base, target.owner, target.repo, sha
        );
        let response = self
            .request(Method::GET, url, &target.token)
            .send()
            .await
            .map_err(GithubError::transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(GithubError {
                status: Some(status.as_u16()),
                message: remote_message(response).await,
            });
        }
        let blob: Value = response.json().await.map_err(GithubError::transport)?;
        Ok(blob
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }
}

/// The mirror must never carry the token itself.
pub fn strip_token(snapshot: &mut Value) {
    if let Some(settings) = snapshot.get_mut("settings").and_then(Value::as_object_mut) {
        settings.remove("githubPat");
    }
}

/// Contents-API base64 arrives with embedded newlines.
pub fn decode_content(encoded: &str) -> Result<Value, GithubError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = general_purpose::STANDARD
        .decode(compact)
        .map_err(|err| GithubError {
            status: None,
            message: format!("File content is not valid base64: {err}"),
        })?;
    serde_json::from_slice(&bytes).map_err(|err| GithubError {
        status: None,
        message: format!("File content is not valid JSON: {err}"),
    })
}

async fn remote_message(response: reqwest::Response) -> String {
    let status = response.status();
    match response.json::<Value>().await {
        Ok(body) => body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string()),
        Err(_) => format!("GitHub returned status {status}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_token_removes_only_the_credential() {
        let mut snapshot = json!({
            "settings": {
                "githubOwner": "acme",
                "githubPat": "ghp_secret",
                "certificateText": "..."
            },
            "users": []
        });
        strip_token(&mut snapshot);
        assert!(snapshot["settings"].get("githubPat").is_none());
        assert_eq!(snapshot["settings"]["githubOwner"], "acme");
    }

    #[test]
    fn decode_content_accepts_wrapped_base64() {
        let encoded = general_purpose::STANDARD.encode("{\"users\":[]}");
        let wrapped = format!("{}\n{}", &encoded[..8], &encoded[8..]);
        let value = decode_content(&wrapped).expect("decodes");
        assert_eq!(value, json!({"users": []}));
    }

    #[test]
    fn target_requires_all_credential_fields() {
        let mut settings = AppSettings {
            github_owner: "acme".into(),
            github_repo: "training-mirror".into(),
            github_path: "data/backup.json".into(),
            github_pat: String::new(),
            ..AppSettings::default()
        };
        assert!(target_from_settings(&settings).is_none());
        settings.github_pat = "ghp_token".into();
        let target = target_from_settings(&settings).expect("complete credentials");
        assert_eq!(target.owner, "acme");
    }
}
