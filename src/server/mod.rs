//! Development content server
//!
//! Serves any [`DocumentBridge`] over the same REST shape the
//! [`RestBridge`](crate::bridge::RestBridge) speaks, so a local checkout can
//! stand in for the remote document store.

pub mod handlers;
pub mod middleware;
pub mod routes;

use axum::{extract::DefaultBodyLimit, Extension, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::bridge::DocumentBridge;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP server bind address
    pub http_addr: String,
    /// HTTP port
    pub http_port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
    /// Bearer token required on content routes
    pub token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "127.0.0.1".to_string(),
            http_port: 4001,
            enable_cors: true,
            max_body_size: 10 * 1024 * 1024, // 10MB
            token: None,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<DocumentBridge>,
    pub config: ServerConfig,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("backend", &self.bridge.kind())
            .field("config", &self.config)
            .finish()
    }
}

/// Build the router for `state`
pub fn router(state: AppState) -> Router {
    crate::metrics::init_metrics();

    let enable_cors = state.config.enable_cors;
    let max_body_size = state.config.max_body_size;

    let content = routes::content_routes()
        .route_layer(axum::middleware::from_fn(middleware::require_token));

    let app = Router::new()
        .merge(content)
        .merge(routes::health_routes())
        .layer(Extension(Arc::new(state)))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    if enable_cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Serve on an already bound listener
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    if state.config.token.is_none() {
        warn!("Content routes are unauthenticated");
    }
    info!(backend = %state.bridge.kind(), "Content server listening on http://{}", addr);

    axum::serve(listener, router(state)).await.map_err(|e| {
        error!(error = %e, "Server error");
        anyhow::anyhow!("Server failed: {}", e)
    })
}

/// Start the content server
pub async fn start_server(config: ServerConfig, bridge: Arc<DocumentBridge>) -> anyhow::Result<()> {
    info!(
        addr = %config.http_addr,
        port = config.http_port,
        "Starting content server"
    );

    let addr = format!("{}:{}", config.http_addr, config.http_port);
    let listener = TcpListener::bind(&addr).await?;

    serve(listener, AppState { bridge, config }).await
}
