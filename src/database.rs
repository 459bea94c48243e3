//! Index builder
//!
//! Pairs a [`DocumentBridge`] with a [`Store`] and decides, from their
//! capability flags, how much of the content is mirrored locally:
//!
//! | Strategy | store contents |
//! |----------|----------------|
//! | [`IndexStrategy::LocalIndex`] | `doc:<path>` payloads and `idx:<collection>/<path>` entries |
//! | [`IndexStrategy::SeedOnly`] | `doc:<path>` payloads |
//! | [`IndexStrategy::Delegated`] | nothing; the backend answers every read |
//!
//! The collection of a document is its first path segment. Documents at the
//! content root belong to no collection and are never indexed. Index keys
//! separate collection and path with `/`, which no segment can contain.

use crate::bridge::DocumentBridge;
use crate::error::{Error, Result};
use crate::events::CmsEvent;
use crate::store::Store;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info, instrument};

const DOC_PREFIX: &str = "doc:";
const INDEX_PREFIX: &str = "idx:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexStrategy {
    LocalIndex,
    SeedOnly,
    Delegated,
}

impl IndexStrategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            IndexStrategy::LocalIndex => "local-index",
            IndexStrategy::SeedOnly => "seed-only",
            IndexStrategy::Delegated => "delegated",
        }
    }

    fn seeds(self) -> bool {
        !matches!(self, IndexStrategy::Delegated)
    }

    fn indexes(self) -> bool {
        matches!(self, IndexStrategy::LocalIndex)
    }
}

impl fmt::Display for IndexStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`Database::build`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub strategy: IndexStrategy,
    /// Documents copied into the store
    pub documents: usize,
    /// Index entries written
    pub indexed: usize,
    /// Stale store entries removed under the build prefix
    pub pruned: usize,
}

impl BuildReport {
    fn empty(strategy: IndexStrategy) -> Self {
        Self {
            strategy,
            documents: 0,
            indexed: 0,
            pruned: 0,
        }
    }
}

fn doc_key(path: &str) -> String {
    format!("{}{}", DOC_PREFIX, path)
}

/// First path segment, when the document sits below one.
fn collection_of(path: &str) -> Option<&str> {
    match path.split_once('/') {
        Some((collection, rest)) if !collection.is_empty() && !rest.is_empty() => Some(collection),
        _ => None,
    }
}

fn index_key(path: &str) -> Option<String> {
    collection_of(path).map(|collection| format!("{}{}/{}", INDEX_PREFIX, collection, path))
}

#[derive(Debug)]
pub struct Database {
    bridge: DocumentBridge,
    store: Store,
}

impl Database {
    pub fn new(bridge: DocumentBridge, store: Store) -> Self {
        Self { bridge, store }
    }

    pub fn bridge(&self) -> &DocumentBridge {
        &self.bridge
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn strategy(&self) -> IndexStrategy {
        if !self.bridge.supports_building() || !self.store.supports_seeding() {
            IndexStrategy::Delegated
        } else if self.store.supports_indexing() {
            IndexStrategy::LocalIndex
        } else {
            IndexStrategy::SeedOnly
        }
    }

    /// Mirror every document under `prefix` into the store.
    #[instrument(skip(self), fields(backend = %self.bridge.kind()))]
    pub async fn build(&self, prefix: &str) -> Result<BuildReport> {
        let strategy = self.strategy();
        let mut report = BuildReport::empty(strategy);
        if !strategy.seeds() {
            info!(%strategy, "Build delegated to backend");
            return Ok(report);
        }

        let paths = self.bridge.glob(prefix).await?;
        let live: BTreeSet<&str> = paths.iter().map(String::as_str).collect();

        for path in &paths {
            let payload = self.bridge.get(path).await?;
            self.store.put(&doc_key(path), Value::String(payload)).await?;
            report.documents += 1;

            if strategy.indexes() {
                if let Some(key) = index_key(path) {
                    self.store.put(&key, Value::String(path.clone())).await?;
                    report.indexed += 1;
                }
            }
        }

        for (key, _) in self.store.scan(&doc_key(prefix)).await? {
            let path = &key[DOC_PREFIX.len()..];
            if !live.contains(path) {
                debug!(path, "Pruning stale document");
                self.store.delete(&key).await?;
                if let Some(index) = index_key(path) {
                    self.store.delete(&index).await?;
                }
                report.pruned += 1;
            }
        }

        info!(
            %strategy,
            documents = report.documents,
            indexed = report.indexed,
            pruned = report.pruned,
            "Build complete"
        );
        if let Some(events) = self.bridge.events() {
            events.publish(CmsEvent::index_built(report.documents));
        }
        Ok(report)
    }

    /// Reads always go to the backend.
    pub async fn get_document(&self, path: &str) -> Result<String> {
        self.bridge.get(path).await
    }

    pub async fn put_document(&self, path: &str, payload: &str) -> Result<()> {
        self.bridge.put(path, payload).await?;
        self.mirror(path, payload, true).await
    }

    pub async fn put_config(&self, path: &str, payload: &str) -> Result<()> {
        self.bridge.put_config(path, payload).await?;
        self.mirror(path, payload, false).await
    }

    pub async fn delete_document(&self, path: &str) -> Result<()> {
        self.bridge.delete(path).await?;

        let strategy = self.strategy();
        if strategy.seeds() {
            self.store.delete(&doc_key(path)).await?;
        }
        if strategy.indexes() {
            if let Some(key) = index_key(path) {
                self.store.delete(&key).await?;
            }
        }
        Ok(())
    }

    /// Paths in `collection`, from the index when one is kept.
    pub async fn list_documents(&self, collection: &str) -> Result<Vec<String>> {
        if collection.contains('/') {
            return Err(Error::InvalidArgument(format!(
                "collection name must be a single path segment: {}",
                collection
            )));
        }
        if self.strategy().indexes() {
            let prefix = format!("{}{}/", INDEX_PREFIX, collection);
            let entries = self.store.scan(&prefix).await?;
            return Ok(entries
                .into_iter()
                .map(|(key, _)| key[prefix.len()..].to_string())
                .collect());
        }

        let mut paths = self.bridge.glob(&format!("{}/", collection)).await?;
        paths.sort();
        Ok(paths)
    }

    async fn mirror(&self, path: &str, payload: &str, index: bool) -> Result<()> {
        let strategy = self.strategy();
        if strategy.seeds() {
            self.store
                .put(&doc_key(path), Value::String(payload.to_string()))
                .await?;
        }
        if index && strategy.indexes() {
            if let Some(key) = index_key(path) {
                self.store.put(&key, Value::String(path.to_string())).await?;
            }
        }
        Ok(())
    }
}
