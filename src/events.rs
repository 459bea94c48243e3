//! CMS event channel
//!
//! A broadcast channel handed explicitly to whoever needs it. Nothing in the
//! crate holds a process-wide bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 256;

/// Events emitted by the document layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CmsEvent {
    DocumentSaved { path: String, at: DateTime<Utc> },
    ConfigSaved { path: String, at: DateTime<Utc> },
    DocumentDeleted { path: String, at: DateTime<Utc> },
    IndexBuilt { documents: usize, at: DateTime<Utc> },
}

impl CmsEvent {
    pub fn document_saved(path: &str) -> Self {
        CmsEvent::DocumentSaved {
            path: path.to_string(),
            at: Utc::now(),
        }
    }

    pub fn config_saved(path: &str) -> Self {
        CmsEvent::ConfigSaved {
            path: path.to_string(),
            at: Utc::now(),
        }
    }

    pub fn document_deleted(path: &str) -> Self {
        CmsEvent::DocumentDeleted {
            path: path.to_string(),
            at: Utc::now(),
        }
    }

    pub fn index_built(documents: usize) -> Self {
        CmsEvent::IndexBuilt {
            documents,
            at: Utc::now(),
        }
    }

    /// Stable event name, e.g. `document:saved`
    pub fn name(&self) -> &'static str {
        match self {
            CmsEvent::DocumentSaved { .. } => "document:saved",
            CmsEvent::ConfigSaved { .. } => "config:saved",
            CmsEvent::DocumentDeleted { .. } => "document:deleted",
            CmsEvent::IndexBuilt { .. } => "index:built",
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            CmsEvent::DocumentSaved { path, .. }
            | CmsEvent::ConfigSaved { path, .. }
            | CmsEvent::DocumentDeleted { path, .. } => Some(path),
            CmsEvent::IndexBuilt { .. } => None,
        }
    }
}

/// Broadcast bus for [`CmsEvent`]s
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<CmsEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CmsEvent> {
        self.sender.subscribe()
    }

    /// Deliver `event` to current subscribers. Having none is fine.
    pub fn publish(&self, event: CmsEvent) {
        let name = event.name();
        match self.sender.send(event) {
            Ok(receivers) => trace!(event = name, receivers, "Published event"),
            Err(_) => trace!(event = name, "No subscribers for event"),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
