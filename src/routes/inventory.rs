use axum::{Json, Router, extract::State, http::StatusCode, routing::get, routing::put};
use uuid::Uuid;

use crate::{
    dto::products::{CreateProductRequest, DeletedProduct, UpdateProductRequest},
    error::AppResult,
    extract::{AppJson, AppPath},
    middleware::auth::Session,
    models::Product,
    response::ApiResponse,
    services::product_service,
    state::AppState,
};

/// Inventory surface of the user dashboard. Any signed-in user may use it.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_inventory).post(add_product))
        .route("/products/{id}", put(edit_product).delete(remove_product))
}

#[utoipa::path(
    get,
    path = "/api/products",
    responses(
        (status = 200, description = "All products, newest first", body = ApiResponse<Vec<Product>>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    _session: Session,
) -> AppResult<Json<ApiResponse<Vec<Product>>>> {
    let resp = product_service::list_all_products(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<Product>),
        (status = 400, description = "Invalid product data"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn add_product(
    State(state): State<AppState>,
    session: Session,
    AppJson(payload): AppJson<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Product>>)> {
    let resp = product_service::store_product(&state, &session, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated product", body = ApiResponse<Product>),
        (status = 400, description = "Invalid product data"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn edit_product(
    State(state): State<AppState>,
    session: Session,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::edit_product(&state, &session, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Deleted product", body = ApiResponse<DeletedProduct>),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn remove_product(
    State(state): State<AppState>,
    session: Session,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<DeletedProduct>>> {
    let resp = product_service::remove_product(&state, &session, id).await?;
    Ok(Json(resp))
}
