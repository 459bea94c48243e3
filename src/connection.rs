//! Connection string resolution
//!
//! One connection string selects one of three backends:
//!
//! | Input | Variant |
//! |-------|---------|
//! | anything containing `localhost` | [`ConnectionDescriptor::Local`] |
//! | `https://<hosted-host>/content/<clientId>/github/<branch...>` | [`ConnectionDescriptor::Hosted`] |
//! | any other absolute URL | [`ConnectionDescriptor::RemoteDocument`], URL kept verbatim |
//!
//! Unknown hosts fall through to the remote document store rather than
//! failing, so a mistyped hosted URL resolves as a remote document endpoint.

use crate::error::{Error, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_HOSTED_HOST: &str = "content.tinajs.io";

/// Resolved backend selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ConnectionDescriptor {
    /// Local GraphQL server over the filesystem
    Local { url: String },
    /// Hosted content API
    Hosted { client_id: String, branch: String },
    /// Remote document store endpoint
    RemoteDocument { content_url: String },
}

impl ConnectionDescriptor {
    /// Build the hosted variant from explicit fields.
    pub fn hosted(client_id: impl Into<String>, branch: impl Into<String>) -> Result<Self> {
        let client_id = client_id.into();
        let branch = branch.into();
        if client_id.is_empty() {
            return Err(Error::Format("hosted connection requires a client id".to_string()));
        }
        if branch.is_empty() {
            return Err(Error::Format("hosted connection requires a branch".to_string()));
        }
        Ok(ConnectionDescriptor::Hosted { client_id, branch })
    }

    pub fn is_local_client(&self) -> bool {
        matches!(self, ConnectionDescriptor::Local { .. })
    }

    pub fn is_fauna_client(&self) -> bool {
        matches!(self, ConnectionDescriptor::RemoteDocument { .. })
    }

    pub fn branch(&self) -> Option<&str> {
        match self {
            ConnectionDescriptor::Hosted { branch, .. } => Some(branch),
            _ => None,
        }
    }

    pub fn client_id(&self) -> Option<&str> {
        match self {
            ConnectionDescriptor::Hosted { client_id, .. } => Some(client_id),
            _ => None,
        }
    }

    pub fn fauna_content_url(&self) -> Option<&str> {
        match self {
            ConnectionDescriptor::RemoteDocument { content_url } => Some(content_url),
            _ => None,
        }
    }

    /// Content endpoint of the hosted variant on `host`.
    pub fn hosted_content_url(&self, host: &str) -> Option<String> {
        match self {
            ConnectionDescriptor::Hosted { client_id, branch } => Some(format!(
                "https://{}/content/{}/github/{}",
                host, client_id, branch
            )),
            _ => None,
        }
    }
}

/// Connection string parser
#[derive(Debug, Clone)]
pub struct Resolver {
    hosted_host: String,
}

impl Default for Resolver {
    fn default() -> Self {
        Self {
            hosted_host: DEFAULT_HOSTED_HOST.to_string(),
        }
    }
}

impl Resolver {
    pub fn with_hosted_host(host: impl Into<String>) -> Self {
        Self {
            hosted_host: host.into(),
        }
    }

    pub fn hosted_host(&self) -> &str {
        &self.hosted_host
    }

    pub fn parse(&self, raw: &str) -> Result<ConnectionDescriptor> {
        if raw.contains("localhost") {
            debug!(url = %raw, "Resolved local connection");
            return Ok(ConnectionDescriptor::Local {
                url: raw.to_string(),
            });
        }

        let url = Url::parse(raw)
            .map_err(|e| Error::Format(format!("{} is not a valid URL: {}", raw, e)))?;

        if url.host_str() != Some(self.hosted_host.as_str()) {
            debug!(url = %raw, "Resolved remote document connection");
            return Ok(ConnectionDescriptor::RemoteDocument {
                content_url: raw.to_string(),
            });
        }

        let (client_id, branch) = parse_hosted_path(url.path()).ok_or_else(|| {
            Error::Format(format!(
                "{} does not match /content/<clientId>/github/<branch>",
                raw
            ))
        })?;
        debug!(client_id = %client_id, branch = %branch, "Resolved hosted connection");
        ConnectionDescriptor::hosted(client_id, branch)
    }
}

/// Split `/content/:clientId/github/*` into client id and branch.
fn parse_hosted_path(path: &str) -> Option<(String, String)> {
    let rest = path.strip_prefix("/content/")?;
    let (client_id, rest) = rest.split_once('/')?;
    let branch = rest.strip_prefix("github/")?;
    let branch = branch.trim_end_matches('/');
    if client_id.is_empty() || branch.is_empty() {
        return None;
    }
    Some((client_id.to_string(), branch.to_string()))
}

/// Resolve `raw` against the default hosted host.
pub fn parse_url(raw: &str) -> Result<ConnectionDescriptor> {
    Resolver::default().parse(raw)
}
