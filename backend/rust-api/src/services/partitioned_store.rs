use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::models::category::ModuleCategory;
use crate::models::quiz::Quiz;
use crate::models::settings::AppSettings;
use crate::models::user::User;
use crate::services::kv::KeyValue;
use crate::services::seed;

pub const KEY_USERS: &str = "data:users";
pub const KEY_QUIZZES: &str = "data:quizzes";
pub const KEY_MODULE_CATEGORIES: &str = "data:moduleCategories";
pub const KEY_SETTINGS: &str = "data:settings";
/// Single-key layout used before the snapshot was partitioned.
pub const LEGACY_KEY: &str = "cyber-security-training-data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKey {
    Users,
    Quizzes,
    ModuleCategories,
    Settings,
}

impl PartitionKey {
    pub const ALL: [PartitionKey; 4] = [
        PartitionKey::Users,
        PartitionKey::Quizzes,
        PartitionKey::ModuleCategories,
        PartitionKey::Settings,
    ];

    pub fn storage_key(self) -> &'static str {
        match self {
            PartitionKey::Users => KEY_USERS,
            PartitionKey::Quizzes => KEY_QUIZZES,
            PartitionKey::ModuleCategories => KEY_MODULE_CATEGORIES,
            PartitionKey::Settings => KEY_SETTINGS,
        }
    }

    /// Field name inside the snapshot (and in partial-update requests).
    pub fn field_name(self) -> &'static str {
        match self {
            PartitionKey::Users => "users",
            PartitionKey::Quizzes => "quizzes",
            PartitionKey::ModuleCategories => "moduleCategories",
            PartitionKey::Settings => "settings",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        PartitionKey::ALL
            .into_iter()
            .find(|key| key.field_name() == name)
    }
}

/// What `read` hands back. `module_categories` stays `None` when the store
/// never held that partition; the client derives a layout in that case.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreData {
    pub users: Vec<User>,
    pub quizzes: Vec<Quiz>,
    pub module_categories: Option<Vec<ModuleCategory>>,
    pub settings: AppSettings,
}

/// Four-key decomposition of the snapshot, one JSON value per key, to stay
/// under per-value size ceilings in the remote store.
pub struct PartitionedStore {
    kv: Arc<dyn KeyValue>,
}

impl PartitionedStore {
    pub fn new(kv: Arc<dyn KeyValue>) -> Self {
        Self { kv }
    }

    /// Batched read of all four partitions. Runs the legacy migration first
    /// (a legacy-only store must not look uninitialized), then seeds the
    /// defaults when the store has never been written.
    pub async fn read(&self) -> Result<StoreData> {
        self.migrate_legacy().await?;

        let keys = [KEY_USERS, KEY_QUIZZES, KEY_MODULE_CATEGORIES, KEY_SETTINGS];
        let mut values = self.kv.mget(&keys).await?.into_iter();
        let users_raw = values.next().flatten();
        let quizzes_raw = values.next().flatten();
        let categories_raw = values.next().flatten();
        let settings_raw = values.next().flatten();

        let users = parse_partition(users_raw.as_deref(), KEY_USERS)?;
        let quizzes = parse_partition(quizzes_raw.as_deref(), KEY_QUIZZES)?;
        let module_categories = parse_partition(categories_raw.as_deref(), KEY_MODULE_CATEGORIES)?;
        let settings = parse_partition(settings_raw.as_deref(), KEY_SETTINGS)?;

        if users.is_none() || quizzes.is_none() {
            return self
                .initialize_defaults(users, quizzes, settings, module_categories)
                .await;
        }

        Ok(StoreData {
            users: users.unwrap_or_default(),
            quizzes: quizzes.unwrap_or_default(),
            module_categories,
            settings: settings.unwrap_or_default(),
        })
    }

    /// Full-snapshot import path. All keys go through one atomic transaction:
    /// either every partition updates or none do.
    pub async fn write_all(&self, data: &StoreData) -> Result<()> {
        let mut sets = vec![
            (KEY_USERS.to_string(), to_json(&data.users)?),
            (KEY_QUIZZES.to_string(), to_json(&data.quizzes)?),
            (KEY_SETTINGS.to_string(), to_json(&data.settings)?),
        ];
        if let Some(categories) = &data.module_categories {
            sets.push((KEY_MODULE_CATEGORIES.to_string(), to_json(categories)?));
        }
        self.kv.apply(&sets, &[]).await
    }

    /// Incremental save path: writes exactly one partition, independent of
    /// its siblings. No cross-key atomicity; callers issue the four calls in
    /// parallel and tolerate per-key failure.
    pub async fn write_key<T: Serialize + ?Sized>(&self, key: PartitionKey, value: &T) -> Result<()> {
        self.kv.set(key.storage_key(), &to_json(value)?).await
    }

    pub async fn write_key_raw(&self, key: PartitionKey, value: &Value) -> Result<()> {
        self.kv.set(key.storage_key(), &to_json(value)?).await
    }

    /// One-time fan-out of the old single-key blob into the partitioned
    /// layout. Set×N plus the delete run as one transaction, so a crash can
    /// never leave both layouts half-written. Idempotent: once the legacy key
    /// is gone this is a single GET miss.
    pub async fn migrate_legacy(&self) -> Result<()> {
        let Some(raw) = self.kv.get(LEGACY_KEY).await? else {
            return Ok(());
        };
        let blob: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, "Legacy data key holds malformed JSON, leaving it in place");
                return Ok(());
            }
        };
        if blob.get("users").is_none() {
            tracing::warn!("Legacy data key has no users field, leaving it in place");
            return Ok(());
        }

        let mut sets = Vec::new();
        for key in PartitionKey::ALL {
            if let Some(value) = blob.get(key.field_name()) {
                sets.push((key.storage_key().to_string(), to_json(value)?));
            }
        }
        self.kv.apply(&sets, &[LEGACY_KEY.to_string()]).await?;
        tracing::info!(
            partitions = sets.len(),
            "Migrated legacy single-key data to partitioned layout"
        );
        Ok(())
    }

    /// Seeds defaults for the partitions that are absent, keeping whatever is
    /// already there (for instance users just fanned out of a partial legacy
    /// blob). All seed writes go through one atomic transaction.
    async fn initialize_defaults(
        &self,
        users: Option<Vec<User>>,
        quizzes: Option<Vec<Quiz>>,
        settings: Option<AppSettings>,
        module_categories: Option<Vec<ModuleCategory>>,
    ) -> Result<StoreData> {
        let mut sets = Vec::new();
        let users = match users {
            Some(users) => users,
            None => {
                let users = seed::default_users();
                sets.push((KEY_USERS.to_string(), to_json(&users)?));
                users
            }
        };
        let quizzes = match quizzes {
            Some(quizzes) => quizzes,
            None => {
                let quizzes = seed::default_quizzes();
                sets.push((KEY_QUIZZES.to_string(), to_json(&quizzes)?));
                quizzes
            }
        };
        let settings = match settings {
            Some(settings) => settings,
            None => {
                let settings = seed::default_settings();
                sets.push((KEY_SETTINGS.to_string(), to_json(&settings)?));
                settings
            }
        };
        tracing::info!(
            partitions = sets.len(),
            "Key-value store uninitialized, seeding default data"
        );
        self.kv.apply(&sets, &[]).await?;

        Ok(StoreData {
            users,
            quizzes,
            module_categories,
            settings,
        })
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("Failed to serialize partition value")
}

fn parse_partition<T: DeserializeOwned>(raw: Option<&str>, key: &str) -> Result<Option<T>> {
    match raw {
        None => Ok(None),
        Some(raw) => serde_json::from_str(raw)
            .map(Some)
            .with_context(|| format!("Partition '{key}' holds malformed JSON")),
    }
}
