//! Fauna bridge using the query DSL
//!
//! Documents live in one collection as `{data: {filename, content}}`.
//! Lookups go through a unique index on `data.filename`; listings page
//! through an index covering the whole collection.
//!
//! Each verb is a single FQL expression, so upserts and deletes are atomic
//! on the Fauna side.

use crate::bridge::fql::{self, Expr};
use crate::bridge::{require_path, Bridge, BridgeKind};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub const DEFAULT_ENDPOINT: &str = "https://db.fauna.com";

/// Fauna connection and schema names
#[derive(Debug, Clone)]
pub struct FaunaQueryConfig {
    pub endpoint: String,
    pub secret: String,
    pub collection: String,
    /// Unique index on `data.filename`
    pub path_index: String,
    /// Index over every document in the collection
    pub all_index: String,
    pub page_size: u32,
    pub timeout: Duration,
}

impl FaunaQueryConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            secret: secret.into(),
            collection: "content".to_string(),
            path_index: "content_by_filename".to_string(),
            all_index: "all_content".to_string(),
            page_size: 100_000,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    resource: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<QueryError>>,
}

#[derive(Debug, Deserialize)]
struct QueryError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    data: Vec<String>,
    #[serde(default)]
    after: Option<Value>,
}

/// Query-DSL bridge over Fauna's HTTP API
#[derive(Clone, Debug)]
pub struct FaunaQueryBridge {
    client: Client,
    config: FaunaQueryConfig,
}

impl FaunaQueryBridge {
    pub fn new(config: FaunaQueryConfig) -> Result<Self> {
        if config.secret.trim().is_empty() {
            return Err(Error::Config("Fauna secret is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FaunaQueryConfig {
        &self.config
    }

    fn by_path(&self, path: &str) -> Expr {
        fql::match_index(fql::index(&self.config.path_index), path)
    }

    fn filename_of(var_name: &str) -> Expr {
        fql::select(&["data", "filename"], fql::get(fql::var(var_name)))
    }

    pub(crate) fn get_expr(&self, path: &str) -> Expr {
        fql::if_(
            fql::exists(self.by_path(path)),
            fql::select(&["data", "content"], fql::get(self.by_path(path))),
            Expr::from(""),
        )
    }

    pub(crate) fn put_expr(&self, path: &str, payload: &str) -> Expr {
        let params = || {
            fql::object([(
                "data",
                fql::object([
                    ("filename", Expr::from(path)),
                    ("content", Expr::from(payload)),
                ]),
            )])
        };
        fql::if_(
            fql::exists(self.by_path(path)),
            fql::update(fql::select(&["ref"], fql::get(self.by_path(path))), params()),
            fql::create(fql::collection(&self.config.collection), params()),
        )
    }

    pub(crate) fn delete_expr(&self, path: &str) -> Expr {
        fql::if_(
            fql::exists(self.by_path(path)),
            fql::delete(fql::select(&["ref"], fql::get(self.by_path(path)))),
            fql::null(),
        )
    }

    pub(crate) fn glob_expr(&self, prefix: &str, cursor: Option<Value>) -> Expr {
        let set = fql::match_all(fql::index(&self.config.all_index));
        let page = match cursor {
            Some(cursor) => fql::paginate_after(set, self.config.page_size, cursor),
            None => fql::paginate(set, self.config.page_size),
        };
        fql::map(
            fql::filter(
                page,
                fql::lambda("ref", fql::starts_with(Self::filename_of("ref"), prefix)),
            ),
            fql::lambda("ref", Self::filename_of("ref")),
        )
    }

    /// Post one expression and decode the `resource` it evaluates to.
    async fn query(&self, expr: Expr) -> Result<Value> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .basic_auth(&self.config.secret, None::<&str>)
            .header("X-FaunaDB-API-Version", "4")
            .json(&expr)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(status = %status, "Fauna rejected the secret");
            return Err(Error::Auth(format!("Fauna rejected the secret ({})", status)));
        }

        let body: QueryResponse = response.json().await.map_err(|e| {
            Error::Transport(format!("unreadable Fauna response ({}): {}", status, e))
        })?;

        if let Some(errors) = body.errors.filter(|e| !e.is_empty()) {
            let first = &errors[0];
            if first.code == "unauthorized" || first.code == "permission denied" {
                return Err(Error::Auth(first.description.clone()));
            }
            return Err(Error::Transport(format!(
                "Fauna query failed: {}: {}",
                first.code, first.description
            )));
        }
        if !status.is_success() {
            return Err(Error::Transport(format!("Fauna returned {}", status)));
        }

        Ok(body.resource.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl Bridge for FaunaQueryBridge {
    fn kind(&self) -> BridgeKind {
        BridgeKind::FaunaQuery
    }

    #[instrument(skip(self))]
    async fn get(&self, path: &str) -> Result<String> {
        require_path(path)?;
        match self.query(self.get_expr(path)).await? {
            Value::String(content) => Ok(content),
            Value::Null => Ok(String::new()),
            other => Err(Error::SerializationError(format!(
                "expected string content for {}, got {}",
                path, other
            ))),
        }
    }

    /// Follows page cursors until the listing is complete.
    #[instrument(skip(self))]
    async fn glob(&self, prefix: &str) -> Result<Vec<String>> {
        let mut paths = Vec::new();
        let mut cursor = None;
        loop {
            let resource = self.query(self.glob_expr(prefix, cursor)).await?;
            let page: Page = serde_json::from_value(resource)?;
            paths.extend(page.data);
            match page.after {
                Some(after) => {
                    debug!(collected = paths.len(), "Fetching next Fauna page");
                    cursor = Some(after);
                }
                None => break,
            }
        }
        Ok(paths)
    }

    #[instrument(skip(self, payload))]
    async fn put(&self, path: &str, payload: &str) -> Result<()> {
        require_path(path)?;
        self.query(self.put_expr(path, payload)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, path: &str) -> Result<()> {
        require_path(path)?;
        self.query(self.delete_expr(path)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bridge() -> FaunaQueryBridge {
        FaunaQueryBridge::new(FaunaQueryConfig::new("fnAE-test-secret")).expect("bridge")
    }

    #[test]
    fn test_empty_secret_is_config_error() {
        let err = FaunaQueryBridge::new(FaunaQueryConfig::new("  ")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_get_expr_defaults_to_empty_string() {
        let value = bridge().get_expr("posts/a.md").into_value();
        assert_eq!(
            value["if"],
            json!({"exists": {"match": {"index": "content_by_filename"}, "terms": "posts/a.md"}})
        );
        assert_eq!(value["then"]["select"], json!(["data", "content"]));
        assert_eq!(value["else"], json!(""));
    }

    #[test]
    fn test_put_expr_upserts() {
        let value = bridge().put_expr("posts/a.md", "# A").into_value();
        assert_eq!(value["then"]["update"]["select"], json!("ref"));
        assert_eq!(value["else"]["create"], json!({"collection": "content"}));
        assert_eq!(
            value["else"]["params"],
            json!({"object": {"data": {"object": {"filename": "posts/a.md", "content": "# A"}}}})
        );
        assert_eq!(value["then"]["params"], value["else"]["params"]);
    }

    #[test]
    fn test_delete_expr_is_guarded() {
        let value = bridge().delete_expr("posts/a.md").into_value();
        assert!(value["then"]["delete"].is_object());
        assert_eq!(value["else"], Value::Null);
    }

    #[test]
    fn test_glob_expr_filters_by_prefix() {
        let value = bridge().glob_expr("posts/", None).into_value();
        let filter = &value["collection"];
        assert_eq!(filter["filter"]["expr"]["search"], json!("posts/"));
        assert_eq!(
            filter["collection"],
            json!({"paginate": {"match": {"index": "all_content"}}, "size": 100000})
        );

        let next = bridge().glob_expr("posts/", Some(json!([{"@ref": "x"}]))).into_value();
        assert_eq!(next["collection"]["collection"]["after"], json!([{"@ref": "x"}]));
    }
}
