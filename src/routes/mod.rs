use axum::{
    Json, Router,
    http::{StatusCode, Uri},
    routing::get,
};

use crate::{response::ApiResponse, state::AppState};

pub mod admin;
pub mod auth;
pub mod doc;
pub mod health;
pub mod history;
pub mod inventory;
pub mod notes;
pub mod notifications;
pub mod params;
pub mod products;
pub mod stats;
pub mod users;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(inventory::router())
        .merge(notes::router())
        .nest("/admin", admin::router())
}

/// Full application router minus the transport layers added in `main`.
pub fn create_app() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", create_api_router())
        .merge(doc::scalar_docs())
        .fallback(not_found)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<()>>) {
    tracing::debug!(path = %uri.path(), "no route matched");
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::failure(format!("Route {} not found", uri.path()))),
    )
}
