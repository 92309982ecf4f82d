use sea_orm::entity::prelude::*;

use crate::models::HistoryType;

/// Append-only audit rows. Product and user columns are snapshots, so there
/// are no relations to the tables they describe.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(column_name = "type")]
    pub kind: HistoryType,
    pub product_id: Option<Uuid>,
    pub product_name: Option<String>,
    pub user_id: Uuid,
    pub user_first_name: String,
    pub user_last_name: String,
    pub details: String,
    pub timestamp: DateTimeUtc,
    pub note_id: Option<Uuid>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub metadata: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
