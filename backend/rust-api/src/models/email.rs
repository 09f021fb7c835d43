use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Append-only record of a notification sent (or queued) by the application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    pub id: i64,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}
