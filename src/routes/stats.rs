use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::stats::DashboardStats,
    error::AppResult,
    middleware::auth::AdminSession,
    response::ApiResponse,
    services::stats_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/stats", get(dashboard_stats))
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Dashboard totals and six-month trends", body = ApiResponse<DashboardStats>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Stats"
)]
pub async fn dashboard_stats(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
) -> AppResult<Json<ApiResponse<DashboardStats>>> {
    let resp = stats_service::dashboard_stats(&state, &session).await?;
    Ok(Json(resp))
}
