use axum::{Json, Router, extract::State, routing::post};
use uuid::Uuid;

use crate::{
    dto::products::{AddNoteRequest, EditNoteRequest},
    error::AppResult,
    extract::{AppJson, AppPath},
    middleware::auth::Session,
    models::Product,
    response::ApiResponse,
    services::product_service,
    state::AppState,
};

/// Note routes are open to every signed-in user, not only admins.
pub fn router() -> Router<AppState> {
    Router::new().route("/products/{id}/notes", post(add_note).put(edit_note))
}

#[utoipa::path(
    post,
    path = "/api/products/{id}/notes",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = AddNoteRequest,
    responses(
        (status = 200, description = "Product with the appended note", body = ApiResponse<Product>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Notes"
)]
pub async fn add_note(
    State(state): State<AppState>,
    session: Session,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<AddNoteRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::add_note(&state, &session, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}/notes",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = EditNoteRequest,
    responses(
        (status = 200, description = "Product with the edited note", body = ApiResponse<Product>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Product or note not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Notes"
)]
pub async fn edit_note(
    State(state): State<AppState>,
    session: Session,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<EditNoteRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::edit_note(&state, &session, id, payload).await?;
    Ok(Json(resp))
}
