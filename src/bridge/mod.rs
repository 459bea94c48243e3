//! Document bridges
//!
//! # Architecture
//!
//! A bridge maps the four document verbs onto one concrete backend:
//!
//! ```text
//! DocumentBridge (tracing, metrics, events)
//!   └─→ Box<dyn Bridge>
//!        ├─→ FilesystemBridge   (local checkout)
//!        ├─→ MemoryBridge       (tests, dev server)
//!        ├─→ RestBridge         (remote document store, REST generation)
//!        └─→ FaunaQueryBridge   (remote document store, FQL generation)
//! ```
//!
//! ## Contract
//!
//! - `get` returns the empty string for a missing document. It never fails
//!   with `NotFound`; errors are reserved for auth, transport and storage
//!   failures.
//! - `glob(prefix)` returns exactly the stored paths starting with `prefix`,
//!   in no guaranteed order.
//! - `put` upserts and is atomic from the caller's point of view.
//! - `delete` is idempotent.
//! - Every call is one round trip to disk or network. No caching, no retries.
//!
//! Capability flags hang off [`BridgeKind`], so they are fixed per backend
//! type and cannot drift during a bridge's lifetime.

pub mod fauna_query;
pub mod filesystem;
pub mod fql;
pub mod memory;
pub mod rest;

pub use fauna_query::{FaunaQueryBridge, FaunaQueryConfig};
pub use filesystem::FilesystemBridge;
pub use memory::MemoryBridge;
pub use rest::RestBridge;

use crate::error::{Error, Result};
use crate::events::{CmsEvent, EventBus};
use crate::metrics::OperationTimer;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Backend variant behind a bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BridgeKind {
    Filesystem,
    Memory,
    FaunaRest,
    FaunaQuery,
}

impl BridgeKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            BridgeKind::Filesystem => "filesystem",
            BridgeKind::Memory => "memory",
            BridgeKind::FaunaRest => "fauna-rest",
            BridgeKind::FaunaQuery => "fauna-query",
        }
    }

    /// Whether the backend can feed an on-demand build/index step.
    pub const fn supports_building(self) -> bool {
        match self {
            BridgeKind::Filesystem
            | BridgeKind::Memory
            | BridgeKind::FaunaRest
            | BridgeKind::FaunaQuery => true,
        }
    }

    /// Remote document backends (either Fauna generation).
    pub const fn is_remote_document(self) -> bool {
        matches!(self, BridgeKind::FaunaRest | BridgeKind::FaunaQuery)
    }
}

impl fmt::Display for BridgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document I/O over a single backend
#[async_trait]
pub trait Bridge: Send + Sync {
    /// Backend variant; capability flags derive from it.
    fn kind(&self) -> BridgeKind;

    /// Read a document. Missing documents yield an empty payload.
    async fn get(&self, path: &str) -> Result<String>;

    /// List every stored path starting with `prefix`.
    async fn glob(&self, prefix: &str) -> Result<Vec<String>>;

    /// Create or overwrite a document.
    async fn put(&self, path: &str, payload: &str) -> Result<()>;

    /// Write a configuration document.
    ///
    /// Same semantics as [`Bridge::put`]; backends may route config
    /// documents elsewhere.
    async fn put_config(&self, path: &str, payload: &str) -> Result<()> {
        self.put(path, payload).await
    }

    /// Remove a document. Deleting a missing path succeeds.
    async fn delete(&self, path: &str) -> Result<()>;

    fn supports_building(&self) -> bool {
        self.kind().supports_building()
    }
}

/// Reject empty document paths before they reach a backend.
pub(crate) fn require_path(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(Error::InvalidArgument("document path is empty".to_string()));
    }
    Ok(())
}

/// Main bridge interface used by the rest of the crate
pub struct DocumentBridge {
    bridge: Box<dyn Bridge>,
    events: Option<Arc<EventBus>>,
}

impl fmt::Debug for DocumentBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentBridge")
            .field("kind", &self.bridge.kind())
            .field("events", &self.events.is_some())
            .finish()
    }
}

impl DocumentBridge {
    pub fn new(bridge: Box<dyn Bridge>) -> Self {
        Self {
            bridge,
            events: None,
        }
    }

    /// Publish write and delete notifications on `events`.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn kind(&self) -> BridgeKind {
        self.bridge.kind()
    }

    pub fn supports_building(&self) -> bool {
        self.bridge.supports_building()
    }

    pub fn events(&self) -> Option<&Arc<EventBus>> {
        self.events.as_ref()
    }

    #[instrument(skip(self), fields(backend = %self.kind()))]
    pub async fn get(&self, path: &str) -> Result<String> {
        let timer = OperationTimer::start(self.kind(), "get");
        let result = self.bridge.get(path).await;
        timer.observe(&result);
        result
    }

    #[instrument(skip(self), fields(backend = %self.kind()))]
    pub async fn glob(&self, prefix: &str) -> Result<Vec<String>> {
        let timer = OperationTimer::start(self.kind(), "glob");
        let result = self.bridge.glob(prefix).await;
        timer.observe(&result);
        if let Ok(paths) = &result {
            debug!(matches = paths.len(), "Glob completed");
        }
        result
    }

    #[instrument(skip(self, payload), fields(backend = %self.kind(), bytes = payload.len()))]
    pub async fn put(&self, path: &str, payload: &str) -> Result<()> {
        let timer = OperationTimer::start(self.kind(), "put");
        let result = self.bridge.put(path, payload).await;
        timer.observe(&result);
        result?;
        self.publish(CmsEvent::document_saved(path));
        Ok(())
    }

    #[instrument(skip(self, payload), fields(backend = %self.kind(), bytes = payload.len()))]
    pub async fn put_config(&self, path: &str, payload: &str) -> Result<()> {
        let timer = OperationTimer::start(self.kind(), "put_config");
        let result = self.bridge.put_config(path, payload).await;
        timer.observe(&result);
        result?;
        self.publish(CmsEvent::config_saved(path));
        Ok(())
    }

    #[instrument(skip(self), fields(backend = %self.kind()))]
    pub async fn delete(&self, path: &str) -> Result<()> {
        let timer = OperationTimer::start(self.kind(), "delete");
        let result = self.bridge.delete(path).await;
        timer.observe(&result);
        result?;
        self.publish(CmsEvent::document_deleted(path));
        Ok(())
    }

    fn publish(&self, event: CmsEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}
