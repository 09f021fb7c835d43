use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub redis_uri: String,
    pub bind_addr: String,
    /// Quiet period (milliseconds) after the last mutation before a
    /// persistence cycle fires.
    pub debounce_ms: u64,
    pub cache_path: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load environment variables from root .env file (two levels up)
        // Try root .env first, then fallback to local .env
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            // Fallback to current directory .env for backward compatibility
            dotenvy::dotenv().ok();
        }

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let config_builder = config::Config::builder()
            .add_source(
                config::File::with_name(&format!("config/{}", env)).required(false), // Allow missing config file, fallback to ENV
            )
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let settings = config_builder.build()?;

        let redis_uri = settings
            .get_string("redis.uri")
            .or_else(|_| env::var("REDIS_URI"))
            .unwrap_or_else(|_| {
                let host = env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
                let port = env::var("REDIS_PORT").unwrap_or_else(|_| "6379".to_string());
                eprintln!("WARNING: REDIS_URI not set, using local Redis at {host}:{port}");
                format!("redis://{}:{}/0", host, port)
            });

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or_else(|_| "0.0.0.0:8081".to_string());

        let debounce_ms = settings
            .get_int("sync.debounce_ms")
            .ok()
            .map(|ms| ms as u64)
            .or_else(|| env::var("SYNC_DEBOUNCE_MS").ok().and_then(|raw| raw.parse().ok()))
            .unwrap_or(2000);

        let cache_path = settings
            .get_string("sync.cache_path")
            .or_else(|_| env::var("SNAPSHOT_CACHE_PATH"))
            .unwrap_or_else(|_| "data/snapshot-cache.json".to_string());

        Ok(Config {
            redis_uri,
            bind_addr,
            debounce_ms,
            cache_path,
        })
    }
}
