use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{ActorSnapshot, Product};

/// A note as sent by the client. `createdBy` is required when notes are
/// supplied at creation and ignored when appending through an update.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteInput {
    pub content: String,
    #[serde(default)]
    pub created_by: Option<ActorSnapshot>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    #[validate(range(min = 0, message = "Invalid product data"))]
    pub quantity: i32,
    #[validate(range(min = 0.0, message = "Invalid product data"))]
    pub price: f64,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub notes: Option<Vec<NoteInput>>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Invalid product data"))]
    pub quantity: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "Invalid product data"))]
    pub price: Option<f64>,
    #[serde(default)]
    pub owner: Option<String>,
    /// Only the last element is treated as a new note.
    #[serde(default)]
    pub notes: Option<Vec<NoteInput>>,
}

/// Body of `PUT /api/admin/products`, which addresses the product by body id.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductByBodyRequest {
    #[serde(default, alias = "_id")]
    pub id: Option<Uuid>,
    #[serde(flatten)]
    pub changes: UpdateProductRequest,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteProductQuery {
    pub id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductStats {
    pub total_products: u64,
    pub total_value: f64,
    pub average_price: f64,
    pub total_quantity: i64,
    pub low_stock_items: u64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductList {
    pub items: Vec<Product>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub stats: ProductStats,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletedProduct {
    pub message: String,
    pub deleted_product: Product,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddNoteRequest {
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditNoteRequest {
    pub note_id: Uuid,
    pub content: String,
}
