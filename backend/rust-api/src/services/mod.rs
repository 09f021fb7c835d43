use crate::config::Config;
use redis::aio::ConnectionManager;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub kv: Arc<dyn kv::KeyValue>,
    pub http: reqwest::Client,
}

impl AppState {
    pub async fn new(config: Config, redis_client: redis::Client) -> anyhow::Result<Self> {
        tracing::info!("Attempting to connect to Redis...");

        let conn = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            ConnectionManager::new(redis_client),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis connection timeout after 30s"))??;

        // Probe the connection before accepting traffic.
        let mut probe = conn.clone();
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            redis::cmd("PING").query_async::<String>(&mut probe),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis PING timeout after 5s"))??;

        tracing::info!("Redis connection established successfully");

        Ok(Self {
            config,
            kv: Arc::new(kv::RedisKv::new(conn)),
            http: reqwest::Client::new(),
        })
    }
}

pub mod github_service;
pub mod kv;
pub mod local_cache;
pub mod partitioned_store;
pub mod record_store;
pub mod seed;
pub mod sync_orchestrator;
