use axum::{Json, Router, extract::State, routing::delete, routing::get, routing::put};

use crate::{
    dto::notifications::{
        ClearNotificationsQuery, ClearedNotifications, CreateNotificationRequest,
        CreatedNotification, MarkReadRequest, NotificationList, NotificationQuery,
        NotificationUpdate, ReadStatus,
    },
    error::AppResult,
    extract::{AppJson, AppPath, AppQuery},
    middleware::auth::AdminSession,
    models::Notification,
    response::{ApiResponse, MessageData},
    services::notification_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            get(list_notifications)
                .post(create_notification)
                .delete(clear_notifications),
        )
        .route("/notifications/mark-all-read", put(mark_all_read))
        .route("/notifications/clear-all", delete(clear_all))
        .route(
            "/notifications/{id}",
            get(get_notification)
                .put(mark_read)
                .patch(update_notification)
                .delete(delete_notification),
        )
}

#[utoipa::path(
    get,
    path = "/api/admin/notifications",
    params(
        ("unreadOnly" = Option<bool>, Query, description = "Only unread notifications"),
        ("type" = Option<String>, Query, description = "info, warning, error or success"),
        ("limit" = Option<usize>, Query, description = "Maximum number of items")
    ),
    responses(
        (status = 200, description = "Derived notifications, newest first", body = ApiResponse<NotificationList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    AppQuery(query): AppQuery<NotificationQuery>,
) -> AppResult<Json<ApiResponse<NotificationList>>> {
    let resp = notification_service::list_notifications(&state, &session, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/notifications/{id}",
    params(("id" = String, Path, description = "low_stock_*, update_*, history_* or manual_*")),
    responses(
        (status = 200, description = "Notification", body = ApiResponse<Notification>),
        (status = 400, description = "Invalid notification ID"),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn get_notification(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    AppPath(id): AppPath<String>,
) -> AppResult<Json<ApiResponse<Notification>>> {
    let resp = notification_service::get_notification(&state, &session, &id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/notifications",
    request_body = CreateNotificationRequest,
    responses(
        (status = 200, description = "Transient notification, not stored", body = ApiResponse<CreatedNotification>),
        (status = 400, description = "Missing required fields")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn create_notification(
    AdminSession(session): AdminSession,
    AppJson(payload): AppJson<CreateNotificationRequest>,
) -> AppResult<Json<ApiResponse<CreatedNotification>>> {
    let resp = notification_service::create_notification(&session, payload)?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/notifications/{id}",
    params(("id" = String, Path, description = "Notification ID")),
    request_body = MarkReadRequest,
    responses(
        (status = 200, description = "Acknowledged", body = ApiResponse<ReadStatus>),
        (status = 400, description = "Invalid notification ID")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_read(
    AdminSession(session): AdminSession,
    AppPath(id): AppPath<String>,
    AppJson(payload): AppJson<MarkReadRequest>,
) -> AppResult<Json<ApiResponse<ReadStatus>>> {
    let resp = notification_service::mark_read(&session, &id, payload)?;
    Ok(Json(resp))
}

/// Body is any JSON object; it is echoed back untouched.
#[utoipa::path(
    patch,
    path = "/api/admin/notifications/{id}",
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Acknowledged", body = ApiResponse<NotificationUpdate>),
        (status = 400, description = "Invalid notification ID or update data")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn update_notification(
    AdminSession(session): AdminSession,
    AppPath(id): AppPath<String>,
    AppJson(update): AppJson<serde_json::Value>,
) -> AppResult<Json<ApiResponse<NotificationUpdate>>> {
    let resp = notification_service::update_notification_state(&session, &id, update)?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/notifications/{id}",
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Acknowledged", body = ApiResponse<MessageData>),
        (status = 400, description = "Invalid notification ID")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn delete_notification(
    AdminSession(session): AdminSession,
    AppPath(id): AppPath<String>,
) -> AppResult<Json<ApiResponse<MessageData>>> {
    let resp = notification_service::delete_notification(&session, &id)?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/notifications",
    params(
        ("type" = Option<String>, Query, description = "Kind to clear"),
        ("olderThan" = Option<String>, Query, description = "Cutoff timestamp")
    ),
    responses(
        (status = 200, description = "Acknowledged", body = ApiResponse<ClearedNotifications>)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn clear_notifications(
    AdminSession(session): AdminSession,
    AppQuery(query): AppQuery<ClearNotificationsQuery>,
) -> AppResult<Json<ApiResponse<ClearedNotifications>>> {
    let resp = notification_service::clear_notifications(&session, query)?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/notifications/mark-all-read",
    responses(
        (status = 200, description = "Acknowledged", body = ApiResponse<MessageData>)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_all_read(
    AdminSession(session): AdminSession,
) -> AppResult<Json<ApiResponse<MessageData>>> {
    let resp = notification_service::mark_all_read(&session)?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/notifications/clear-all",
    responses(
        (status = 200, description = "Acknowledged", body = ApiResponse<MessageData>)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn clear_all(
    AdminSession(session): AdminSession,
) -> AppResult<Json<ApiResponse<MessageData>>> {
    let resp = notification_service::clear_all(&session)?;
    Ok(Json(resp))
}
