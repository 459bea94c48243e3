//! HTTP routes definition

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Content routes, same shape the REST bridge expects:
/// - POST   /page-dir  - List paths under a prefix
/// - GET    /page      - Read a document (`?filepath=`)
/// - POST   /page      - Write a document
/// - DELETE /page      - Delete a document
pub fn content_routes() -> Router {
    Router::new()
        .route("/page-dir", post(handlers::list_pages))
        .route(
            "/page",
            get(handlers::read_page)
                .post(handlers::write_page)
                .delete(handlers::delete_page),
        )
}

/// Health check routes
pub fn health_routes() -> Router {
    Router::new()
        .route("/_health", get(handlers::health_check))
        .route("/_metrics", get(handlers::metrics))
}
