use serde::{Deserialize, Serialize};

/// Presentation-layer grouping of training modules. Every module id matches
/// the id of exactly one quiz.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleCategory {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub modules: Vec<Module>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: String,
    pub title: String,
    /// Cached count of the matching quiz's question array. Recomputed after
    /// every question mutation; never mutated independently.
    #[serde(default)]
    pub questions: usize,
    pub icon_key: String,
    #[serde(default)]
    pub status: ModuleStatus,
    pub theme: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}
