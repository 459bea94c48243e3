//! Key/value stores consumed by the index builder
//!
//! # Architecture
//!
//! ```text
//! Store (capability predicates from StoreProfile)
//!   └─→ Box<dyn KeyValueStore>
//!        ├─→ MemoryStore
//!        └─→ JsonFileStore
//! ```
//!
//! The wrapper owns no state of its own: every key/value call is delegated
//! unchanged. What it adds is the pair of predicates the index builder
//! consults before choosing how to build:
//!
//! | Profile | seeding | indexing |
//! |---------|---------|----------|
//! | `Local` | yes | yes |
//! | `FaunaSeeded` | yes | no |
//! | `Fauna` | no | no |

pub mod file;
pub mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Generic key/value store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn put(&self, key: &str, value: Value) -> Result<()>;

    /// Remove a key. Missing keys are not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// All entries whose key starts with `prefix`, sorted by key.
    async fn scan(&self, prefix: &str) -> Result<Vec<(String, Value)>>;

    async fn clear(&self) -> Result<()>;
}

/// Capability profile of a store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreProfile {
    /// Local store: pre-populated and indexed in process.
    #[default]
    Local,
    /// Remote document store that still accepts seeding (query-DSL generation).
    FaunaSeeded,
    /// Remote document store, REST generation: neither seeded nor indexed.
    Fauna,
}

impl StoreProfile {
    pub const fn supports_seeding(self) -> bool {
        match self {
            StoreProfile::Local | StoreProfile::FaunaSeeded => true,
            StoreProfile::Fauna => false,
        }
    }

    pub const fn supports_indexing(self) -> bool {
        match self {
            StoreProfile::Local => true,
            StoreProfile::FaunaSeeded | StoreProfile::Fauna => false,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            StoreProfile::Local => "local",
            StoreProfile::FaunaSeeded => "fauna-seeded",
            StoreProfile::Fauna => "fauna",
        }
    }
}

impl fmt::Display for StoreProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key/value store annotated with backend capabilities
pub struct Store {
    inner: Box<dyn KeyValueStore>,
    profile: StoreProfile,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("profile", &self.profile)
            .finish()
    }
}

impl Store {
    pub fn new(inner: Box<dyn KeyValueStore>, profile: StoreProfile) -> Self {
        Self { inner, profile }
    }

    /// In-memory store with the given profile.
    pub fn in_memory(profile: StoreProfile) -> Self {
        Self::new(Box::new(MemoryStore::new()), profile)
    }

    pub fn profile(&self) -> StoreProfile {
        self.profile
    }

    /// Whether the store may be pre-populated before serving queries.
    pub fn supports_seeding(&self) -> bool {
        self.profile.supports_seeding()
    }

    /// Whether the store maintains secondary indexes itself.
    pub fn supports_indexing(&self) -> bool {
        self.profile.supports_indexing()
    }

    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.inner.get(key).await
    }

    pub async fn put(&self, key: &str, value: Value) -> Result<()> {
        self.inner.put(key, value).await
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }

    pub async fn scan(&self, prefix: &str) -> Result<Vec<(String, Value)>> {
        self.inner.scan(prefix).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }
}
