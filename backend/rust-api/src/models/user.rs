use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::category::ModuleStatus;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub full_name: String,
    pub username: String,
    pub password: String,
    pub role: UserRole,
    #[serde(default)]
    pub training_status: TrainingStatus,
    /// Ids of the categories assigned to this user.
    #[serde(default)]
    pub assigned_exams: Vec<String>,
    #[serde(default)]
    pub answers: Vec<UserAnswer>,
    /// Per-module completion state, keyed by module id.
    #[serde(default)]
    pub module_progress: HashMap<String, ModuleStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

/// Overall training outcome. Only transitions to passed/failed once every
/// module of every assigned category is completed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TrainingStatus {
    #[default]
    NotStarted,
    InProgress,
    Passed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserAnswer {
    pub question_id: i64,
    pub selected: String,
    pub correct: bool,
}
