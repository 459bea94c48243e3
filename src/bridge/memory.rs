//! In-memory bridge
//!
//! Keeps documents in a sorted map. Used by tests and as the default
//! backend of the development content server.

use crate::bridge::{require_path, Bridge, BridgeKind};
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// In-memory document bridge
#[derive(Clone, Debug, Default)]
pub struct MemoryBridge {
    documents: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the bridge with existing documents.
    pub fn with_documents<I, K, V>(documents: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = documents
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            documents: Arc::new(RwLock::new(map)),
        }
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    pub fn clear(&self) {
        self.documents.write().clear();
    }
}

#[async_trait]
impl Bridge for MemoryBridge {
    fn kind(&self) -> BridgeKind {
        BridgeKind::Memory
    }

    async fn get(&self, path: &str) -> Result<String> {
        require_path(path)?;
        Ok(self.documents.read().get(path).cloned().unwrap_or_default())
    }

    async fn glob(&self, prefix: &str) -> Result<Vec<String>> {
        let documents = self.documents.read();
        Ok(documents
            .range(prefix.to_string()..)
            .take_while(|(path, _)| path.starts_with(prefix))
            .map(|(path, _)| path.clone())
            .collect())
    }

    async fn put(&self, path: &str, payload: &str) -> Result<()> {
        require_path(path)?;
        self.documents
            .write()
            .insert(path.to_string(), payload.to_string());
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        require_path(path)?;
        self.documents.write().remove(path);
        Ok(())
    }
}
