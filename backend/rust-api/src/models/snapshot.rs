use serde::{Deserialize, Serialize};

use crate::models::category::ModuleCategory;
use crate::models::email::Email;
use crate::models::quiz::Quiz;
use crate::models::settings::AppSettings;
use crate::models::user::User;

/// The complete exportable application state. Created at first bootstrap,
/// loaded into the record store on every start, and persisted asynchronously
/// after every mutation batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub quizzes: Vec<Quiz>,
    #[serde(default)]
    pub module_categories: Vec<ModuleCategory>,
    #[serde(default)]
    pub settings: AppSettings,
    #[serde(default)]
    pub email_log: Vec<Email>,
}

impl Snapshot {
    /// Copy with the GitHub token blanked. Every export, download and mirror
    /// write goes through this; the token only ever lives in the remote
    /// settings partition and the local cache.
    pub fn sanitized(&self) -> Snapshot {
        let mut snapshot = self.clone();
        snapshot.settings.github_pat = String::new();
        snapshot
    }
}
