//! Backend selection
//!
//! Turns a resolved [`ConnectionDescriptor`] plus configuration into the
//! bridge and store profile that serve it. The hosted content API runs no
//! bridge in this process; it is reported back as [`Backend::Hosted`].

use crate::bridge::{DocumentBridge, FaunaQueryBridge, FilesystemBridge, RestBridge};
use crate::config::{BridgeConfig, FaunaMode, StoreSettings};
use crate::connection::ConnectionDescriptor;
use crate::database::Database;
use crate::error::{Error, Result};
use crate::events::EventBus;
use crate::store::{JsonFileStore, MemoryStore, Store, StoreProfile};
use std::sync::Arc;
use tracing::info;

/// The backend serving one connection string
#[derive(Debug)]
pub enum Backend {
    /// Documents are served by an in-process bridge.
    Bridge {
        bridge: DocumentBridge,
        profile: StoreProfile,
    },
    /// The hosted content API is the backend.
    Hosted { content_url: String },
}

impl Backend {
    pub fn open(descriptor: &ConnectionDescriptor, config: &BridgeConfig) -> Result<Self> {
        let (bridge, implied): (DocumentBridge, StoreProfile) = match descriptor {
            ConnectionDescriptor::Local { .. } => (
                DocumentBridge::new(Box::new(FilesystemBridge::new(&config.root_path))),
                StoreProfile::Local,
            ),
            ConnectionDescriptor::RemoteDocument { content_url } => match config.fauna.mode {
                FaunaMode::Rest => {
                    let mut rest = RestBridge::with_timeout(content_url, config.fauna.timeout())?;
                    if let Some(token) = &config.fauna.token {
                        rest = rest.with_token(token.clone());
                    }
                    (DocumentBridge::new(Box::new(rest)), StoreProfile::Fauna)
                }
                FaunaMode::Query => {
                    let query = FaunaQueryBridge::new(config.fauna_query_config(content_url)?)?;
                    (DocumentBridge::new(Box::new(query)), StoreProfile::FaunaSeeded)
                }
            },
            ConnectionDescriptor::Hosted { .. } => {
                let content_url = descriptor
                    .hosted_content_url(&config.hosted_host)
                    .ok_or_else(|| Error::Format("hosted descriptor without content url".to_string()))?;
                info!(%content_url, "Using hosted content API");
                return Ok(Backend::Hosted { content_url });
            }
        };

        let profile = config.store.profile.unwrap_or(implied);
        info!(backend = %bridge.kind(), %profile, "Opened bridge");
        Ok(Backend::Bridge { bridge, profile })
    }

    pub fn is_hosted(&self) -> bool {
        matches!(self, Backend::Hosted { .. })
    }

    /// Store profile for bridge backends.
    pub fn profile(&self) -> Option<StoreProfile> {
        match self {
            Backend::Bridge { profile, .. } => Some(*profile),
            Backend::Hosted { .. } => None,
        }
    }

    pub fn with_events(self, events: Arc<EventBus>) -> Self {
        match self {
            Backend::Bridge { bridge, profile } => Backend::Bridge {
                bridge: bridge.with_events(events),
                profile,
            },
            hosted => hosted,
        }
    }

    /// Take the bridge out; the hosted backend has none.
    pub fn into_bridge(self) -> Result<DocumentBridge> {
        match self {
            Backend::Bridge { bridge, .. } => Ok(bridge),
            Backend::Hosted { content_url } => Err(Error::Config(format!(
                "hosted backend {} has no in-process bridge",
                content_url
            ))),
        }
    }

    /// Pair the bridge with a store built from `settings`.
    pub async fn into_database(self, settings: &StoreSettings) -> Result<Database> {
        let profile = self.profile().unwrap_or_default();
        let bridge = self.into_bridge()?;
        let store = open_store(settings, profile).await?;
        Ok(Database::new(bridge, store))
    }
}

/// Open the configured store: a JSON file when a path is set, memory otherwise.
pub async fn open_store(settings: &StoreSettings, profile: StoreProfile) -> Result<Store> {
    let profile = settings.profile.unwrap_or(profile);
    match &settings.path {
        Some(path) => Ok(Store::new(Box::new(JsonFileStore::open(path).await?), profile)),
        None => Ok(Store::new(Box::new(MemoryStore::new()), profile)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::BridgeKind;
    use crate::connection::parse_url;

    #[test]
    fn test_local_descriptor_opens_filesystem() -> Result<()> {
        let config = BridgeConfig::default();
        let backend = Backend::open(&parse_url("http://localhost:4001/graphql")?, &config)?;
        assert_eq!(backend.profile(), Some(StoreProfile::Local));
        assert_eq!(backend.into_bridge()?.kind(), BridgeKind::Filesystem);
        Ok(())
    }

    #[test]
    fn test_remote_document_rest_mode() -> Result<()> {
        let config = BridgeConfig::default();
        let backend = Backend::open(&parse_url("https://my-fauna-domain.example/api")?, &config)?;
        assert_eq!(backend.profile(), Some(StoreProfile::Fauna));
        assert_eq!(backend.into_bridge()?.kind(), BridgeKind::FaunaRest);
        Ok(())
    }

    #[test]
    fn test_remote_document_query_mode() -> Result<()> {
        let mut config = BridgeConfig::default();
        config.fauna.mode = FaunaMode::Query;
        let descriptor = parse_url("https://my-fauna-domain.example/api")?;

        let err = Backend::open(&descriptor, &config).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        config.fauna.secret = Some("fnSECRET".to_string());
        let backend = Backend::open(&descriptor, &config)?;
        assert_eq!(backend.profile(), Some(StoreProfile::FaunaSeeded));
        assert_eq!(backend.into_bridge()?.kind(), BridgeKind::FaunaQuery);
        Ok(())
    }

    #[test]
    fn test_hosted_has_no_bridge() -> Result<()> {
        let config = BridgeConfig::default();
        let descriptor = parse_url("https://content.tinajs.io/content/abc123/github/main")?;
        let backend = Backend::open(&descriptor, &config)?;
        assert!(backend.is_hosted());
        assert_eq!(backend.profile(), None);
        match &backend {
            Backend::Hosted { content_url } => assert_eq!(
                content_url,
                "https://content.tinajs.io/content/abc123/github/main"
            ),
            other => panic!("expected hosted backend, got {other:?}"),
        }
        assert!(matches!(backend.into_bridge(), Err(Error::Config(_))));
        Ok(())
    }

    #[test]
    fn test_profile_override() -> Result<()> {
        let mut config = BridgeConfig::default();
        config.store.profile = Some(StoreProfile::Fauna);
        let backend = Backend::open(&parse_url("http://localhost:4001/graphql")?, &config)?;
        assert_eq!(backend.profile(), Some(StoreProfile::Fauna));
        Ok(())
    }

    #[tokio::test]
    async fn test_into_database_uses_file_store() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut config = BridgeConfig::default();
        config.root_path = dir.path().join("content");
        config.store.path = Some(dir.path().join("index.json"));

        let backend = Backend::open(&parse_url("http://localhost:4001/graphql")?, &config)?;
        let db = backend.into_database(&config.store).await?;
        db.put_document("posts/hello.md", "# Hello").await?;

        assert!(dir.path().join("index.json").exists());
        Ok(())
    }
}
