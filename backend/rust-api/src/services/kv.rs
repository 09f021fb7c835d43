use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::sync::Mutex;

/// Minimal seam over the remote key-value store. `apply` is the only
/// multi-key operation and must be atomic: either every set and delete
/// lands, or none do.
#[async_trait]
pub trait KeyValue: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn mget(&self, keys: &[&str]) -> Result<Vec<Option<String>>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn apply(&self, sets: &[(String, String)], deletes: &[String]) -> Result<()>;
}

#[derive(Clone)]
pub struct RedisKv {
    conn: ConnectionManager,
}

impl RedisKv {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl KeyValue for RedisKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async::<Option<String>>(&mut conn)
            .await
            .with_context(|| format!("Key-value store GET failed for '{key}'"))
    }

    async fn mget(&self, keys: &[&str]) -> Result<Vec<Option<String>>> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("MGET");
        for key in keys {
            cmd.arg(*key);
        }
        cmd.query_async::<Vec<Option<String>>>(&mut conn)
            .await
            .context("Key-value store MGET failed")
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async::<()>(&mut conn)
            .await
            .with_context(|| format!("Key-value store SET failed for '{key}'"))
    }

    async fn apply(&self, sets: &[(String, String)], deletes: &[String]) -> Result<()> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value) in sets {
            pipe.set(key, value).ignore();
        }
        for key in deletes {
            pipe.del(key).ignore();
        }
        let mut conn = self.conn.clone();
        pipe.query_async::<()>(&mut conn)
            .await
            .context("Key-value store transaction failed")
    }
}

/// In-process store with the same atomicity contract. Used by the test suite
/// in place of a live Redis instance; counts writes per key so tests can
/// assert on debounce behavior.
#[derive(Default)]
pub struct MemoryKv {
    data: Mutex<HashMap<String, String>>,
    writes: Mutex<HashMap<String, usize>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_count(&self, key: &str) -> usize {
        self.writes
            .lock()
            .expect("write counter poisoned")
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data
            .lock()
            .expect("memory store poisoned")
            .contains_key(key)
    }

    fn record_write(&self, key: &str) {
        *self
            .writes
            .lock()
            .expect("write counter poisoned")
            .entry(key.to_string())
            .or_insert(0) += 1;
    }
}

#[async_trait]
impl KeyValue for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .data
            .lock()
            .expect("memory store poisoned")
            .get(key)
            .cloned())
    }

    async fn mget(&self, keys: &[&str]) -> Result<Vec<Option<String>>> {
        let data = self.data.lock().expect("memory store poisoned");
        Ok(keys.iter().map(|key| data.get(*key).cloned()).collect())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.data
            .lock()
            .expect("memory store poisoned")
            .insert(key.to_string(), value.to_string());
        self.record_write(key);
        Ok(())
    }

    async fn apply(&self, sets: &[(String, String)], deletes: &[String]) -> Result<()> {
        let mut data = self.data.lock().expect("memory store poisoned");
        for (key, value) in sets {
            data.insert(key.clone(), value.clone());
        }
        for key in deletes {
            data.remove(key);
        }
        drop(data);
        for (key, _) in sets {
            self.record_write(key);
        }
        Ok(())
    }
}
