use axum::{Json, Router, extract::State, http::StatusCode, routing::get, routing::post};

use crate::{
    dto::history::{CreateHistoryRequest, CreatedHistoryEntry, HistoryQuery, PopulateResult},
    error::AppResult,
    extract::{AppJson, AppQuery},
    middleware::auth::AdminSession,
    models::HistoryEntry,
    response::{ApiResponse, Paginated},
    services::history_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/history", get(list_history).post(append_history))
        .route("/history/populate", post(populate_history))
}

#[utoipa::path(
    get,
    path = "/api/admin/history",
    params(
        ("page" = Option<u64>, Query, description = "Page number, default 1"),
        ("limit" = Option<u64>, Query, description = "Items per page, default 10"),
        ("type" = Option<String>, Query, description = "One of the history types"),
        ("productId" = Option<uuid::Uuid>, Query, description = "Product filter"),
        ("userId" = Option<uuid::Uuid>, Query, description = "Actor filter"),
        ("search" = Option<String>, Query, description = "Matches details, product name or actor name"),
        ("period" = Option<String>, Query, description = "`all` or a number of days")
    ),
    responses(
        (status = 200, description = "History, newest first", body = ApiResponse<Paginated<HistoryEntry>>),
        (status = 400, description = "Invalid operation type or period")
    ),
    security(("bearer_auth" = [])),
    tag = "History"
)]
pub async fn list_history(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    AppQuery(query): AppQuery<HistoryQuery>,
) -> AppResult<Json<ApiResponse<Paginated<HistoryEntry>>>> {
    let resp = history_service::list_history(&state, &session, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/history",
    request_body = CreateHistoryRequest,
    responses(
        (status = 201, description = "Entry stored", body = ApiResponse<CreatedHistoryEntry>),
        (status = 400, description = "Missing fields or invalid operation type")
    ),
    security(("bearer_auth" = [])),
    tag = "History"
)]
pub async fn append_history(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    AppJson(payload): AppJson<CreateHistoryRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CreatedHistoryEntry>>)> {
    let resp = history_service::append_history(&state, &session, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

/// Destructive: discards the whole log and rebuilds a lossy approximation
/// from current users and products.
#[utoipa::path(
    post,
    path = "/api/admin/history/populate",
    responses(
        (status = 200, description = "History rebuilt", body = ApiResponse<PopulateResult>)
    ),
    security(("bearer_auth" = [])),
    tag = "History"
)]
pub async fn populate_history(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
) -> AppResult<Json<ApiResponse<PopulateResult>>> {
    let resp = history_service::repopulate_history(&state, &session).await?;
    Ok(Json(resp))
}
