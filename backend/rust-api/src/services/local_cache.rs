use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::models::snapshot::Snapshot;

/// Last-known-good snapshot slot on local disk, written synchronously on
/// every save cycle and read at bootstrap when the remote store is
/// unreachable.
pub struct LocalCache {
    path: PathBuf,
}

impl LocalCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context("Failed to create cache directory")?;
            }
        }
        let body = serde_json::to_string(snapshot).context("Failed to serialize snapshot")?;
        fs::write(&self.path, body)
            .with_context(|| format!("Failed to write snapshot cache {}", self.path.display()))
    }

    pub fn load(&self) -> Result<Option<Snapshot>> {
        match fs::read_to_string(&self.path) {
            Ok(body) => serde_json::from_str(&body)
                .map(Some)
                .context("Local snapshot cache is corrupt"),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| {
                format!("Failed to read snapshot cache {}", self.path.display())
            }),
        }
    }
}
