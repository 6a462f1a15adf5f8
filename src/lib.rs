pub mod blob_store;
pub mod config;
pub mod db;
pub mod dto;
pub mod entity;
pub mod error;
pub mod files;
pub mod gateway;
pub mod lifecycle;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod order_code;
pub mod payments;
pub mod rate_limit;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod validation;

use axum::{Router, extract::DefaultBodyLimit, http::Uri, routing::get};

use crate::{
    error::AppError,
    routes::{create_api_router, doc::scalar_docs, health},
    state::AppState,
};

/// Application routes bound to `state`. Transport layers are added by the binary.
pub fn build_app(state: AppState) -> Router {
    // uploads arrive base64-encoded inside JSON, well past axum's 2 MB default
    let body_limit = DefaultBodyLimit::max(state.config.max_body_bytes);
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", create_api_router())
        .merge(scalar_docs())
        .fallback(not_found)
        .layer(body_limit)
        .with_state(state)
}

async fn not_found(uri: Uri) -> AppError {
    tracing::debug!(path = %uri.path(), "no route");
    AppError::NotFound
}
