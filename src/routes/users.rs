use axum::{Json, Router, extract::State, http::StatusCode, routing::get, routing::put};
use uuid::Uuid;

use crate::{
    dto::users::{CreateUserRequest, UpdateUserRequest, UserEnvelope, UserQuery},
    error::AppResult,
    extract::{AppJson, AppPath, AppQuery},
    middleware::auth::AdminSession,
    models::User,
    response::{ApiResponse, MessageData, Paginated},
    services::user_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", put(update_user).delete(delete_user))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(
        ("page" = Option<u64>, Query, description = "Page number, default 1"),
        ("limit" = Option<u64>, Query, description = "Items per page, default 10"),
        ("search" = Option<String>, Query, description = "Matches first name, last name or email")
    ),
    responses(
        (status = 200, description = "Users, newest first", body = ApiResponse<Paginated<User>>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    AppQuery(query): AppQuery<UserQuery>,
) -> AppResult<Json<ApiResponse<Paginated<User>>>> {
    let resp = user_service::list_users(&state, &session, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created, pending approval", body = ApiResponse<UserEnvelope>),
        (status = 400, description = "Missing required fields"),
        (status = 409, description = "Email already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserEnvelope>>)> {
    let resp = user_service::create_user(&state, &session, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = ApiResponse<UserEnvelope>),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<UserEnvelope>>> {
    let resp = user_service::update_user(&state, &session, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = ApiResponse<MessageData>),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<MessageData>>> {
    let resp = user_service::delete_user(&state, &session, id).await?;
    Ok(Json(resp))
}
