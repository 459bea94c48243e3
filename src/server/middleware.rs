//! HTTP middleware

use axum::{
    body::Body,
    extract::Extension,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::server::AppState;

/// Reject content requests without the configured bearer token
pub async fn require_token(
    Extension(state): Extension<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.config.token.as_deref() else {
        return Ok(next.run(req).await);
    };

    let presented = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if presented == Some(expected) {
        Ok(next.run(req).await)
    } else {
        warn!(uri = %req.uri().path(), "Rejected request with missing or invalid token");
        Err(StatusCode::UNAUTHORIZED)
    }
}
