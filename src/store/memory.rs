//! In-memory key/value store

use crate::error::Result;
use crate::store::KeyValueStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<BTreeMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
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
        self.entries.write().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_scan_is_sorted_and_bounded() -> Result<()> {
        let store = MemoryStore::new();
        store.put("idx:posts/b", json!(1)).await?;
        store.put("idx:posts/a", json!(2)).await?;
        store.put("idx:pages/home", json!(3)).await?;
        store.put("doc:posts/a", json!("a")).await?;

        let keys: Vec<String> = store
            .scan("idx:posts/")
            .await?
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["idx:posts/a", "idx:posts/b"]);

        store.clear().await?;
        assert!(store.is_empty());
        Ok(())
    }
}
