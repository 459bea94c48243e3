//! HTTP route handlers

use axum::{
    extract::{Extension, Json, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::bridge::rest::{FilepathRequest, PageDirResponse, WritePageRequest};
use crate::error::Error;
use crate::server::AppState;

/// Map a bridge error onto a status code and JSON body
fn error_response(e: Error) -> Response {
    let status = match &e {
        Error::Auth(_) => StatusCode::UNAUTHORIZED,
        Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Transport(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error!(error = %e, status = status.as_u16(), "Content request failed");
    (
        status,
        Json(serde_json::json!({
            "success": false,
            "error": e.to_string(),
        })),
    )
        .into_response()
}

fn ack() -> Response {
    Json(serde_json::json!({ "success": true })).into_response()
}

/// List paths under a prefix
///
/// POST /page-dir
#[instrument(skip(state))]
pub async fn list_pages(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<FilepathRequest>,
) -> Response {
    match state.bridge.glob(&request.filepath).await {
        Ok(data) => Json(PageDirResponse { data }).into_response(),
        Err(e) => error_response(e),
    }
}

/// Read a document; missing documents come back empty
///
/// GET /page?filepath=
#[instrument(skip(state))]
pub async fn read_page(
    Extension(state): Extension<Arc<AppState>>,
    Query(request): Query<FilepathRequest>,
) -> Response {
    match state.bridge.get(&request.filepath).await {
        Ok(payload) => payload.into_response(),
        Err(e) => error_response(e),
    }
}

/// Write a document
///
/// POST /page
#[instrument(skip(state, request), fields(filepath = %request.filepath))]
pub async fn write_page(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<WritePageRequest>,
) -> Response {
    info!(bytes = request.data.len(), "Writing page");
    match state.bridge.put(&request.filepath, &request.data).await {
        Ok(()) => ack(),
        Err(e) => error_response(e),
    }
}

/// Delete a document
///
/// DELETE /page
#[instrument(skip(state))]
pub async fn delete_page(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<FilepathRequest>,
) -> Response {
    info!(filepath = %request.filepath, "Deleting page");
    match state.bridge.delete(&request.filepath).await {
        Ok(()) => ack(),
        Err(e) => error_response(e),
    }
}

/// Health check
pub async fn health_check(Extension(state): Extension<Arc<AppState>>) -> Response {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "backend": state.bridge.kind().as_str(),
        "supports_building": state.bridge.supports_building(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
    .into_response()
}

/// Metrics endpoint (Prometheus format)
pub async fn metrics() -> Response {
    crate::metrics::export_metrics().into_response()
}
