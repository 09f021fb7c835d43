use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transient mirror-sync state surfaced to the admin UI. Owned by the sync
/// orchestrator; reset to `Syncing` at the start of each publish attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GithubSyncStatus {
    pub status: SyncState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Idle,
    Syncing,
    Success,
    Error,
}

impl Default for GithubSyncStatus {
    fn default() -> Self {
        Self {
            status: SyncState::Idle,
            timestamp: None,
            message: None,
        }
    }
}

impl GithubSyncStatus {
    pub fn syncing() -> Self {
        Self {
            status: SyncState::Syncing,
            timestamp: None,
            message: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: SyncState::Success,
            timestamp: Some(Utc::now()),
            message: Some(message.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: SyncState::Error,
            timestamp: Some(Utc::now()),
            message: Some(message.into()),
        }
    }
}
