//! JSON-file key/value store
//!
//! Keeps the whole map in memory and rewrites one JSON file after each
//! mutation (temp file + rename). A missing file opens as an empty store.

use crate::error::{Error, Result};
use crate::store::KeyValueStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Arc<RwLock<BTreeMap<String, Value>>>,
    /// Serializes mutate-then-persist so snapshots hit disk in order.
    persist: Arc<Mutex<()>>,
}

impl JsonFileStore {
    /// Open (or lazily create) the store backed by `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(Error::Storage(format!(
                    "failed to open {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        info!(path = %path.display(), entries = entries.len(), "Opened JSON file store");
        Ok(Self {
            path,
            entries: Arc::new(RwLock::new(entries)),
            persist: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `mutate` to a copy, write it to disk, then publish it.
    ///
    /// Readers keep seeing the previous map until the snapshot is on disk,
    /// and a failed write leaves the store unchanged.
    async fn mutate<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, Value>) + Send,
    {
        let _guard = self.persist.lock().await;
        let mut next = self.entries.read().clone();
        mutate(&mut next);
        let snapshot = serde_json::to_vec_pretty(&next)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let temp = self.path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&temp, &snapshot).await?;
        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(Error::Storage(format!(
                "failed to persist {}: {}",
                self.path.display(),
                e
            )));
        }

        *self.entries.write() = next;
        debug!(path = %self.path.display(), bytes = snapshot.len(), "Persisted store snapshot");
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<()> {
        let key = key.to_string();
        self.mutate(move |entries| {
            entries.insert(key, value);
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        if !self.entries.read().contains_key(key) {
            return Ok(());
        }
        let key = key.to_string();
        self.mutate(move |entries| {
            entries.remove(&key);
        })
        .await
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<(String, Value)>> {
        let entries = self.entries.read();
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    async fn clear(&self) -> Result<()> {
        self.mutate(|entries| entries.clear()).await
    }
}
