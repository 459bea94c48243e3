//! REST bridge for the remote document store
//!
//! Talks to a content microservice in front of the document database.
//!
//! | Verb | Request | Response |
//! |------|---------|----------|
//! | glob | `POST {endpoint}/page-dir` `{"filepath": prefix}` | `{"data": [paths]}` |
//! | get | `GET {endpoint}/page?filepath=<path>` | payload text, empty or 404 when absent |
//! | put | `POST {endpoint}/page` `{"filepath", "data"}` | ack |
//! | delete | `DELETE {endpoint}/page` `{"filepath"}` | ack, 404 tolerated |
//!
//! 401/403 map to [`Error::Auth`]; every other failure is [`Error::Transport`].

use crate::bridge::{require_path, Bridge, BridgeKind};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Body of `POST /page-dir` and `DELETE /page`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilepathRequest {
    pub filepath: String,
}

/// Body of `POST /page`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WritePageRequest {
    pub filepath: String,
    pub data: String,
}

/// Response of `POST /page-dir`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageDirResponse {
    #[serde(default)]
    pub data: Vec<String>,
}

/// Remote document bridge over HTTP
#[derive(Clone, Debug)]
pub struct RestBridge {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl RestBridge {
    /// Create a bridge for `endpoint` with the default 30s timeout.
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_timeout(endpoint, Duration::from_secs(30))
    }

    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self> {
        Url::parse(endpoint)
            .map_err(|e| Error::Format(format!("invalid content endpoint {}: {}", endpoint, e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request(&self, method: Method, route: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}/{}", self.endpoint, route));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Map non-success statuses onto the error kinds callers act on.
    async fn check(response: Response, operation: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!(operation, status = %status, "Content endpoint rejected credentials");
                Err(Error::Auth(format!("{} rejected with {}: {}", operation, status, body)))
            }
            _ => Err(Error::Transport(format!(
                "{} failed with {}: {}",
                operation, status, body
            ))),
        }
    }
}

#[async_trait]
impl Bridge for RestBridge {
    fn kind(&self) -> BridgeKind {
        BridgeKind::FaunaRest
    }

    #[instrument(skip(self))]
    async fn get(&self, path: &str) -> Result<String> {
        require_path(path)?;
        let response = self
            .request(Method::GET, "page")
            .query(&[("filepath", path)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(path = %path, "Document not found, returning empty payload");
            return Ok(String::new());
        }
        let response = Self::check(response, "get").await?;
        Ok(response.text().await?)
    }

    #[instrument(skip(self))]
    async fn glob(&self, prefix: &str) -> Result<Vec<String>> {
        let response = self
            .request(Method::POST, "page-dir")
            .json(&FilepathRequest {
                filepath: prefix.to_string(),
            })
            .send()
            .await?;
        let response = Self::check(response, "glob").await?;
        let listing: PageDirResponse = response.json().await?;
        Ok(listing.data)
    }

    #[instrument(skip(self, payload))]
    async fn put(&self, path: &str, payload: &str) -> Result<()> {
        require_path(path)?;
        let response = self
            .request(Method::POST, "page")
            .json(&WritePageRequest {
                filepath: path.to_string(),
                data: payload.to_string(),
            })
            .send()
            .await?;
        Self::check(response, "put").await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, path: &str) -> Result<()> {
        require_path(path)?;
        let response = self
            .request(Method::DELETE, "page")
            .json(&FilepathRequest {
                filepath: path.to_string(),
            })
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response, "delete").await?;
        Ok(())
    }
}
