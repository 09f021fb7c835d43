use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::models::snapshot::Snapshot;
use crate::models::sync::GithubSyncStatus;
use crate::services::github_service::{self, GithubClient};
use crate::services::local_cache::LocalCache;
use crate::services::partitioned_store::{PartitionKey, PartitionedStore};
use crate::services::record_store::RecordStore;
use crate::services::seed;

/// Debounced scheduler tying the record store to the three persistence
/// backends. Each mutation opens (or pushes out) a quiet-period window; when
/// it elapses, one save cycle runs. Two in-flight cycles may race across the
/// network; every write is a full-value overwrite, so the last one wins.
pub struct SyncOrchestrator {
    store: Arc<RecordStore>,
    partitions: PartitionedStore,
    cache: LocalCache,
    github: GithubClient,
    debounce: Duration,
    status: RwLock<GithubSyncStatus>,
    /// Subscribed at construction so no mutation between construction and
    /// task start is missed. Taken once by `run`.
    revisions: std::sync::Mutex<Option<tokio::sync::watch::Receiver<u64>>>,
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<RecordStore>,
        partitions: PartitionedStore,
        cache: LocalCache,
        github: GithubClient,
        debounce: Duration,
    ) -> Self {
        let revisions = std::sync::Mutex::new(Some(store.subscribe()));
        Self {
            store,
            partitions,
            cache,
            github,
            debounce,
            status: RwLock::new(GithubSyncStatus::default()),
            revisions,
        }
    }

    pub async fn status(&self) -> GithubSyncStatus {
        self.status.read().await.clone()
    }

    async fn set_status(&self, status: GithubSyncStatus) {
        *self.status.write().await = status;
    }

    /// Runs until the task is aborted (application shutdown). Aborting while
    /// a window is pending cancels that save; an in-flight cycle is never
    /// interrupted mid-await by a new window, only superseded by later ones.
    pub async fn run(self: Arc<Self>) {
        let mut revisions = self
            .revisions
            .lock()
            .expect("revision receiver poisoned")
            .take()
            .expect("sync orchestrator already running");
        loop {
            if revisions.changed().await.is_err() {
                return;
            }
            // Quiet-period window: any further mutation resets the deadline.
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(self.debounce) => break,
                    changed = revisions.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                }
            }
            self.save_cycle().await;
        }
    }

    /// One persistence cycle: local cache, then the four independent partial
    /// writes, then the best-effort mirror publish.
    pub async fn save_cycle(&self) {
        let snapshot = self.store.snapshot().await;

        // The local slot can never fail the user-visible flow.
        if let Err(err) = self.cache.save(&snapshot) {
            tracing::warn!(error = %err, "Failed to write local snapshot cache");
        }

        let (users, quizzes, categories, settings) = tokio::join!(
            self.partitions
                .write_key(PartitionKey::Users, &snapshot.users),
            self.partitions
                .write_key(PartitionKey::Quizzes, &snapshot.quizzes),
            self.partitions
                .write_key(PartitionKey::ModuleCategories, &snapshot.module_categories),
            self.partitions
                .write_key(PartitionKey::Settings, &snapshot.settings),
        );
        for (key, result) in [
            ("users", users),
            ("quizzes", quizzes),
            ("moduleCategories", categories),
            ("settings", settings),
        ] {
            if let Err(err) = result {
                // Not retried here; the next debounced cycle rewrites the key.
                tracing::warn!(key, error = %err, "Partial save failed");
            }
        }

        self.publish_mirror(&snapshot).await;
    }

    async fn publish_mirror(&self, snapshot: &Snapshot) {
        let Some(target) = github_service::target_from_settings(&snapshot.settings) else {
            // Mirror unconfigured: disabled, not an error.
            return;
        };
        self.set_status(GithubSyncStatus::syncing()).await;

        let value = match serde_json::to_value(snapshot.sanitized()) {
            Ok(value) => value,
            Err(err) => {
                self.set_status(GithubSyncStatus::error(format!(
                    "Failed to serialize snapshot: {err}"
                )))
                .await;
                return;
            }
        };

        match self.github.publish(&target, &value).await {
            Ok(outcome) => {
                self.set_status(GithubSyncStatus::success(format!(
                    "Synced to GitHub ({})",
                    outcome.commit
                )))
                .await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Mirror publish failed");
                self.set_status(GithubSyncStatus::error(err.to_string())).await;
            }
        }
    }
}

/// Load order at startup: remote partitioned store, then the local cache,
/// then built-in defaults. Category derivation runs only when the remote
/// store had no category partition.
pub async fn bootstrap(partitions: &PartitionedStore, cache: &LocalCache) -> Snapshot {
    match partitions.read().await {
        Ok(data) => {
            let module_categories = match data.module_categories {
                Some(categories) if !categories.is_empty() => categories,
                _ => seed::derive_module_categories(&data.quizzes),
            };
            Snapshot {
                users: data.users,
                quizzes: data.quizzes,
                module_categories,
                settings: data.settings,
                email_log: Vec::new(),
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "Remote store read failed, falling back to local cache");
            match cache.load() {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => seed::default_snapshot(),
                Err(cache_err) => {
                    tracing::warn!(error = %cache_err, "Local cache unreadable, using defaults");
                    seed::default_snapshot()
                }
            }
        }
    }
}
