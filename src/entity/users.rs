use sea_orm::entity::prelude::*;

use crate::models::{ActorSnapshot, UserGroup};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[sea_orm(unique)]
    pub email: String,
    /// Absent for accounts provisioned by an admin without a password.
    pub password_hash: Option<String>,
    pub group: UserGroup,
    pub active: bool,
    pub approved: bool,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub approved_by: Option<ActorSnapshot>,
    pub approved_at: Option<DateTimeUtc>,
    pub last_active: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

impl Model {
    pub fn actor(&self) -> ActorSnapshot {
        ActorSnapshot {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
