use serde::{Deserialize, Serialize};

/// Process-wide application settings, including the mirror credentials. The
/// `github_pat` field must never appear in an exported or mirrored snapshot;
/// see `Snapshot::sanitized`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub certificate_text: String,
    #[serde(default)]
    pub github_owner: String,
    #[serde(default)]
    pub github_repo: String,
    #[serde(default)]
    pub github_path: String,
    /// Skipped when empty so sanitized exports drop the key entirely instead
    /// of shipping an empty credential field.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub github_pat: String,
}

impl AppSettings {
    /// The mirror is disabled until all four credential fields are present.
    pub fn github_configured(&self) -> bool {
        !self.github_owner.trim().is_empty()
            && !self.github_repo.trim().is_empty()
            && !self.github_path.trim().is_empty()
            && !self.github_pat.trim().is_empty()
    }
}
