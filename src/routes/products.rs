use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use uuid::Uuid;

use crate::{
    dto::products::{
        CreateProductRequest, DeleteProductQuery, DeletedProduct, ProductList,
        UpdateProductByBodyRequest, UpdateProductRequest,
    },
    error::AppResult,
    extract::{AppJson, AppPath, AppQuery},
    middleware::auth::AdminSession,
    models::Product,
    response::ApiResponse,
    routes::params::ProductQuery,
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(list_products)
                .post(create_product)
                .put(update_product_by_body)
                .delete(delete_product),
        )
        .route("/products/{id}", get(get_product).put(update_product))
}

#[utoipa::path(
    get,
    path = "/api/admin/products",
    params(
        ("page" = Option<u64>, Query, description = "Page number, default 1"),
        ("limit" = Option<u64>, Query, description = "Items per page, default 10, max 100"),
        ("search" = Option<String>, Query, description = "Substring of the name or of any note"),
        ("minQuantity" = Option<i32>, Query, description = "Lower quantity bound"),
        ("maxQuantity" = Option<i32>, Query, description = "Upper quantity bound"),
        ("minPrice" = Option<f64>, Query, description = "Lower price bound"),
        ("maxPrice" = Option<f64>, Query, description = "Upper price bound"),
        ("sortField" = Option<String>, Query, description = "createdAt, name, quantity, price, owner, lastEditedAt"),
        ("sortOrder" = Option<String>, Query, description = "asc or desc, default desc")
    ),
    responses(
        (status = 200, description = "Filtered page with stats over the same filter", body = ApiResponse<ProductList>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    AppQuery(query): AppQuery<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_products(&state, &session, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product", body = ApiResponse<Product>),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::get_product(&state, &session, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<Product>),
        (status = 400, description = "Invalid product data")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    AppJson(payload): AppJson<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Product>>)> {
    let resp = product_service::create_product(&state, &session, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated product", body = ApiResponse<Product>),
        (status = 400, description = "Invalid product data"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::update_product(&state, &session, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/products",
    request_body = UpdateProductByBodyRequest,
    responses(
        (status = 200, description = "Updated product", body = ApiResponse<Product>),
        (status = 400, description = "Missing id or invalid product data"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product_by_body(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    AppJson(payload): AppJson<UpdateProductByBodyRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::update_product_by_body(&state, &session, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/products",
    params(("id" = Uuid, Query, description = "Product ID")),
    responses(
        (status = 200, description = "Deleted product", body = ApiResponse<DeletedProduct>),
        (status = 400, description = "Product ID is required"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    AppQuery(query): AppQuery<DeleteProductQuery>,
) -> AppResult<Json<ApiResponse<DeletedProduct>>> {
    let resp = product_service::delete_product(&state, &session, query.id).await?;
    Ok(Json(resp))
}
