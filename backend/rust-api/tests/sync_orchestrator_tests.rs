mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use cybertraining_api::models::sync::SyncState;
use cybertraining_api::services::github_service::GithubClient;
use cybertraining_api::services::kv::{KeyValue, MemoryKv};
use cybertraining_api::services::local_cache::LocalCache;
use cybertraining_api::services::partitioned_store::{
    PartitionedStore, KEY_MODULE_CATEGORIES, KEY_QUIZZES, KEY_SETTINGS, KEY_USERS,
};
use cybertraining_api::services::record_store::RecordStore;
use cybertraining_api::services::seed;
use cybertraining_api::services::sync_orchestrator::{bootstrap, SyncOrchestrator};

const DEBOUNCE: Duration = Duration::from_millis(500);

fn orchestrator(
    kv: Arc<MemoryKv>,
    store: Arc<RecordStore>,
    cache_dir: &std::path::Path,
) -> Arc<SyncOrchestrator> {
    Arc::new(SyncOrchestrator::new(
        store,
        PartitionedStore::new(kv),
        LocalCache::new(cache_dir.join("snapshot-cache.json")),
        GithubClient::new(reqwest::Client::new()),
        DEBOUNCE,
    ))
}

#[tokio::test(start_paused = true)]
async fn rapid_edits_collapse_into_one_write_per_key() {
    let dir = tempfile::tempdir().expect("tempdir");
    let kv = Arc::new(MemoryKv::new());
    let store = Arc::new(RecordStore::new(seed::default_snapshot()));
    let orchestrator = orchestrator(kv.clone(), store.clone(), dir.path());

    let task = tokio::spawn(orchestrator.clone().run());
    tokio::task::yield_now().await;

    for index in 0..5 {
        store
            .add_question(
                "phishing_awareness",
                "Links",
                &format!("Edited question {index}?"),
                vec!["yes".to_string(), "no".to_string()],
                "yes",
            )
            .await
            .expect("edit");
    }

    // Let the quiet period elapse and the cycle complete.
    tokio::time::sleep(DEBOUNCE * 3).await;

    for key in [KEY_USERS, KEY_QUIZZES, KEY_MODULE_CATEGORIES, KEY_SETTINGS] {
        assert_eq!(kv.write_count(key), 1, "partition {key}");
    }

    // The local durable cache was written in the same cycle.
    let cache = LocalCache::new(dir.path().join("snapshot-cache.json"));
    let cached = cache.load().expect("cache readable").expect("cache present");
    assert_eq!(cached.quizzes, store.snapshot().await.quizzes);

    task.abort();
}

#[tokio::test(start_paused = true)]
async fn mutations_inside_the_window_push_the_deadline_out() {
    let dir = tempfile::tempdir().expect("tempdir");
    let kv = Arc::new(MemoryKv::new());
    let store = Arc::new(RecordStore::new(seed::default_snapshot()));
    let orchestrator = orchestrator(kv.clone(), store.clone(), dir.path());

    let task = tokio::spawn(orchestrator.clone().run());
    tokio::task::yield_now().await;

    // Three edits, each just inside the previous window: still one cycle.
    for index in 0..3 {
        store
            .log_email("alice@example.com", &format!("Reminder {index}"), "body")
            .await
            .expect("edit");
        tokio::time::sleep(DEBOUNCE / 2).await;
    }
    tokio::time::sleep(DEBOUNCE * 3).await;

    assert_eq!(kv.write_count(KEY_USERS), 1);

    // A later edit opens a fresh window and a second cycle.
    store
        .log_email("ben@example.com", "Reminder", "body")
        .await
        .expect("edit");
    tokio::time::sleep(DEBOUNCE * 3).await;
    assert_eq!(kv.write_count(KEY_USERS), 2);

    task.abort();
}

#[tokio::test(start_paused = true)]
async fn mirror_stays_idle_without_credentials() {
    let dir = tempfile::tempdir().expect("tempdir");
    let kv = Arc::new(MemoryKv::new());
    // Default settings carry no GitHub credentials.
    let store = Arc::new(RecordStore::new(seed::default_snapshot()));
    let orchestrator = orchestrator(kv.clone(), store.clone(), dir.path());

    let task = tokio::spawn(orchestrator.clone().run());
    tokio::task::yield_now().await;

    store
        .update_settings(seed::default_settings())
        .await
        .expect("edit");
    tokio::time::sleep(DEBOUNCE * 3).await;

    assert_eq!(kv.write_count(KEY_SETTINGS), 1);
    assert_eq!(orchestrator.status().await.status, SyncState::Idle);

    task.abort();
}

/// Store that refuses every operation, standing in for an unreachable or
/// unconfigured remote store.
struct FailingKv;

#[async_trait]
impl KeyValue for FailingKv {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(anyhow!("key-value store unconfigured"))
    }
    async fn mget(&self, _keys: &[&str]) -> Result<Vec<Option<String>>> {
        Err(anyhow!("key-value store unconfigured"))
    }
    async fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(anyhow!("key-value store unconfigured"))
    }
    async fn apply(&self, _sets: &[(String, String)], _deletes: &[String]) -> Result<()> {
        Err(anyhow!("key-value store unconfigured"))
    }
}

#[tokio::test]
async fn bootstrap_falls_back_to_the_local_cache() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = LocalCache::new(dir.path().join("snapshot-cache.json"));

    let mut cached = common::sample_snapshot();
    cached.settings.company_name = "Cached Inc".to_string();
    cache.save(&cached).expect("save cache");

    let partitions = PartitionedStore::new(Arc::new(FailingKv));
    let loaded = bootstrap(&partitions, &cache).await;
    assert_eq!(loaded, cached);
}

#[tokio::test]
async fn bootstrap_uses_defaults_when_every_backend_is_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = LocalCache::new(dir.path().join("missing.json"));

    let partitions = PartitionedStore::new(Arc::new(FailingKv));
    let loaded = bootstrap(&partitions, &cache).await;
    assert_eq!(loaded, seed::default_snapshot());
}

#[tokio::test]
async fn bootstrap_derives_categories_when_partition_is_absent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = LocalCache::new(dir.path().join("snapshot-cache.json"));

    // A fresh MemoryKv gets seeded on read but never holds categories.
    let partitions = PartitionedStore::new(Arc::new(MemoryKv::new()));
    let loaded = bootstrap(&partitions, &cache).await;

    assert!(!loaded.module_categories.is_empty());
    assert_eq!(
        loaded.module_categories,
        seed::derive_module_categories(&loaded.quizzes)
    );
}
