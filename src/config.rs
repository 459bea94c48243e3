//! # Bridge configuration
//!
//! Settings are layered with the `config` crate, lowest precedence first:
//!
//! 1. built-in defaults ([`BridgeConfig::default`])
//! 2. an optional TOML file (`tinabridge.toml` by convention)
//! 3. `TINA_`-prefixed environment variables, `__` separating nested keys
//!    (`TINA_FAUNA__SECRET`, `TINA_SERVER__HTTP_PORT`)
//!
//! ```toml
//! content_url = "https://my-fauna-domain.example/api"
//! root_path = "."
//!
//! [fauna]
//! mode = "rest"            # or "query"
//! token = "..."            # bearer token for the REST endpoint
//!
//! [store]
//! profile = "fauna"        # override the profile implied by the backend
//! path = ".tina/index.json"
//!
//! [server]
//! http_port = 4001
//! ```

use crate::bridge::FaunaQueryConfig;
use crate::connection::{Resolver, DEFAULT_HOSTED_HOST};
use crate::error::{Error, Result};
use crate::server::ServerConfig;
use crate::store::StoreProfile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const ENV_PREFIX: &str = "TINA";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Connection string handed to the resolver
    pub content_url: String,
    /// Content root for the filesystem bridge
    pub root_path: PathBuf,
    /// Host recognised as the hosted content API
    pub hosted_host: String,
    pub fauna: FaunaSettings,
    pub store: StoreSettings,
    pub server: ServerConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            content_url: "http://localhost:4001/graphql".to_string(),
            root_path: PathBuf::from("."),
            hosted_host: DEFAULT_HOSTED_HOST.to_string(),
            fauna: FaunaSettings::default(),
            store: StoreSettings::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Which Fauna bridge generation serves a remote document URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaunaMode {
    #[default]
    Rest,
    Query,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaunaSettings {
    pub mode: FaunaMode,
    /// Bearer token for the REST content endpoint
    pub token: Option<String>,
    /// Database secret for query mode
    pub secret: Option<String>,
    /// Query endpoint; `content_url` is used when unset
    pub endpoint: Option<String>,
    pub collection: String,
    pub path_index: String,
    pub all_index: String,
    pub page_size: u32,
    pub timeout_secs: u64,
}

impl Default for FaunaSettings {
    fn default() -> Self {
        Self {
            mode: FaunaMode::Rest,
            token: None,
            secret: None,
            endpoint: None,
            collection: "content".to_string(),
            path_index: "content_by_filename".to_string(),
            all_index: "all_content".to_string(),
            page_size: 100_000,
            timeout_secs: 30,
        }
    }
}

impl FaunaSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Overrides the profile implied by the selected backend
    pub profile: Option<StoreProfile>,
    /// Persist the store to this JSON file; in memory when unset
    pub path: Option<PathBuf>,
}

impl BridgeConfig {
    /// Layer defaults, an optional TOML file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = config::Config::try_from(&BridgeConfig::default())
            .map_err(|e| Error::Config(e.to_string()))?;
        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        let config: BridgeConfig = settings
            .try_deserialize()
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from a TOML string; missing keys take their defaults.
    pub fn from_toml(s: &str) -> Result<Self> {
        let config: BridgeConfig = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.content_url.trim().is_empty() {
            return Err(Error::Config("content_url must not be empty".to_string()));
        }
        if self.hosted_host.trim().is_empty() {
            return Err(Error::Config("hosted_host must not be empty".to_string()));
        }
        if self.fauna.page_size == 0 {
            return Err(Error::Config("fauna.page_size must be positive".to_string()));
        }
        Ok(())
    }

    pub fn resolver(&self) -> Resolver {
        Resolver::with_hosted_host(self.hosted_host.clone())
    }

    /// Query-mode bridge settings for the remote endpoint `content_url`.
    pub fn fauna_query_config(&self, content_url: &str) -> Result<FaunaQueryConfig> {
        let secret = self
            .fauna
            .secret
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| Error::Config("fauna.secret is required in query mode".to_string()))?;

        let mut query = FaunaQueryConfig::new(secret)
            .with_endpoint(self.fauna.endpoint.as_deref().unwrap_or(content_url));
        query.collection = self.fauna.collection.clone();
        query.path_index = self.fauna.path_index.clone();
        query.all_index = self.fauna.all_index.clone();
        query.page_size = self.fauna.page_size;
        query.timeout = self.fauna.timeout();
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() -> Result<()> {
        assert_eq!(BridgeConfig::from_toml("")?, BridgeConfig::default());
        Ok(())
    }

    #[test]
    fn test_toml_overrides() -> Result<()> {
        let config = BridgeConfig::from_toml(
            r#"
            content_url = "https://fauna.example/api"

            [fauna]
            mode = "query"
            secret = "fnSECRET"
            collection = "pages"

            [store]
            profile = "fauna-seeded"
            "#,
        )?;
        assert_eq!(config.fauna.mode, FaunaMode::Query);
        assert_eq!(config.store.profile, Some(StoreProfile::FaunaSeeded));
        assert_eq!(config.fauna.path_index, "content_by_filename");

        let query = config.fauna_query_config(&config.content_url)?;
        assert_eq!(query.endpoint, "https://fauna.example/api");
        assert_eq!(query.collection, "pages");
        Ok(())
    }

    #[test]
    fn test_query_mode_requires_secret() {
        let config = BridgeConfig::default();
        let err = config.fauna_query_config("https://db.fauna.com").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_toml_roundtrip() -> Result<()> {
        let mut config = BridgeConfig::default();
        config.fauna.token = Some("t0ken".to_string());
        config.server.http_port = 4555;
        let text = config.to_toml()?;
        assert_eq!(BridgeConfig::from_toml(&text)?, config);
        Ok(())
    }

    #[test]
    fn test_load_reads_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("tinabridge.toml");
        std::fs::write(&path, "root_path = \"site\"\n[server]\nhttp_port = 4100\n")?;

        let config = BridgeConfig::load(Some(&path))?;
        assert_eq!(config.root_path, PathBuf::from("site"));
        assert_eq!(config.server.http_port, 4100);
        assert_eq!(config.hosted_host, DEFAULT_HOSTED_HOST);
        Ok(())
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let err = BridgeConfig::from_toml("[fauna]\npage_size = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
