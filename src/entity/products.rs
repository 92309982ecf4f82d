use sea_orm::{FromJsonQueryResult, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::models::{ActorSnapshot, ProductNote};

/// Notes live inside the product row as a JSONB array, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct ProductNotes(pub Vec<ProductNote>);

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner: String,
    pub name: String,
    pub quantity: i32,
    #[sea_orm(column_type = "Double")]
    pub price: f64,
    #[sea_orm(column_type = "JsonBinary")]
    pub created_by: ActorSnapshot,
    pub created_at: DateTimeUtc,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub last_edited_by: Option<ActorSnapshot>,
    pub last_edited_at: Option<DateTimeUtc>,
    #[sea_orm(column_type = "JsonBinary")]
    pub notes: ProductNotes,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
