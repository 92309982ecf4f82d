use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveValue::Set, DeriveActiveEnum, EnumIter, FromJsonQueryResult, Iterable};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{history, products, users};

/// Products with fewer units than this are "low stock" everywhere: list stats,
/// the dashboard counter and the notification feed.
pub const LOW_STOCK_THRESHOLD: i32 = 10;

/// A user counts as online while `lastActive` is newer than this.
pub const ONLINE_WINDOW_MINUTES: i64 = 5;

pub fn is_low_stock(quantity: i32) -> bool {
    quantity < LOW_STOCK_THRESHOLD
}

pub fn is_online(last_active: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    last_active.is_some_and(|seen| seen > now - Duration::minutes(ONLINE_WINDOW_MINUTES))
}

/// Money is reported with two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Copy of a user's identity taken at the moment of an action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromJsonQueryResult, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActorSnapshot {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

impl ActorSnapshot {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductNote {
    pub id: Uuid,
    pub content: String,
    pub created_by: ActorSnapshot,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<ActorSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub is_new: bool,
    pub is_updated: bool,
}

impl ProductNote {
    pub fn new(content: impl Into<String>, created_by: ActorSnapshot, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            created_by,
            created_at: now,
            updated_by: None,
            updated_at: None,
            is_new: true,
            is_updated: false,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize,
    Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum UserGroup {
    #[default]
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl UserGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserGroup::User => "user",
            UserGroup::Admin => "admin",
        }
    }
}

impl fmt::Display for UserGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed taxonomy of audit records. Extending it needs a migration too.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum HistoryType {
    #[sea_orm(string_value = "product_create")]
    ProductCreate,
    #[sea_orm(string_value = "product_update")]
    ProductUpdate,
    #[sea_orm(string_value = "product_delete")]
    ProductDelete,
    #[sea_orm(string_value = "note_add")]
    NoteAdd,
    #[sea_orm(string_value = "note_edit")]
    NoteEdit,
    #[sea_orm(string_value = "note_delete")]
    NoteDelete,
    #[sea_orm(string_value = "user_create")]
    UserCreate,
    #[sea_orm(string_value = "user_update")]
    UserUpdate,
    #[sea_orm(string_value = "user_delete")]
    UserDelete,
    #[sea_orm(string_value = "user_ban")]
    UserBan,
    #[sea_orm(string_value = "user_role_change")]
    UserRoleChange,
    #[sea_orm(string_value = "inventory_update")]
    InventoryUpdate,
    #[sea_orm(string_value = "price_update")]
    PriceUpdate,
}

impl HistoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryType::ProductCreate => "product_create",
            HistoryType::ProductUpdate => "product_update",
            HistoryType::ProductDelete => "product_delete",
            HistoryType::NoteAdd => "note_add",
            HistoryType::NoteEdit => "note_edit",
            HistoryType::NoteDelete => "note_delete",
            HistoryType::UserCreate => "user_create",
            HistoryType::UserUpdate => "user_update",
            HistoryType::UserDelete => "user_delete",
            HistoryType::UserBan => "user_ban",
            HistoryType::UserRoleChange => "user_role_change",
            HistoryType::InventoryUpdate => "inventory_update",
            HistoryType::PriceUpdate => "price_update",
        }
    }
}

impl fmt::Display for HistoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownHistoryType(pub String);

impl fmt::Display for UnknownHistoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown history type `{}`", self.0)
    }
}

impl std::error::Error for UnknownHistoryType {}

impl FromStr for HistoryType {
    type Err = UnknownHistoryType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HistoryType::iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownHistoryType(s.to_string()))
    }
}

/// One value in a history entry's free-form metadata bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Flag(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<String>),
}

pub type HistoryMetadata = BTreeMap<String, MetadataValue>;

impl MetadataValue {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            MetadataValue::Flag(b) => serde_json::Value::Bool(*b),
            MetadataValue::Number(n) => serde_json::Value::Number(n.clone()),
            MetadataValue::Text(s) => serde_json::Value::String(s.clone()),
            MetadataValue::List(items) => serde_json::Value::Array(
                items.iter().cloned().map(serde_json::Value::String).collect(),
            ),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<i32> for MetadataValue {
    fn from(value: i32) -> Self {
        MetadataValue::Number(value.into())
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(MetadataValue::Number)
            .unwrap_or_else(|| MetadataValue::Text(value.to_string()))
    }
}

impl From<Vec<String>> for MetadataValue {
    fn from(value: Vec<String>) -> Self {
        MetadataValue::List(value)
    }
}

impl From<&[&str]> for MetadataValue {
    fn from(value: &[&str]) -> Self {
        MetadataValue::List(value.iter().map(|s| s.to_string()).collect())
    }
}

pub fn metadata_to_json(metadata: &HistoryMetadata) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = metadata
        .iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect();
    serde_json::Value::Object(map)
}

pub fn metadata_from_json(value: serde_json::Value) -> Option<HistoryMetadata> {
    match serde_json::from_value(value) {
        Ok(metadata) => Some(metadata),
        Err(err) => {
            tracing::warn!(error = %err, "unreadable history metadata");
            None
        }
    }
}

/// Product as returned by the API, with the derived inventory figures.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub owner: String,
    pub name: String,
    pub quantity: i32,
    pub price: f64,
    pub total_value: f64,
    pub is_low_stock: bool,
    pub created_by: ActorSnapshot,
    pub created_at: DateTime<Utc>,
    pub last_edited_by: Option<ActorSnapshot>,
    pub last_edited_at: Option<DateTime<Utc>>,
    pub notes: Vec<ProductNote>,
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        Self {
            id: model.id,
            total_value: round2(f64::from(model.quantity) * model.price),
            is_low_stock: is_low_stock(model.quantity),
            owner: model.owner,
            name: model.name,
            quantity: model.quantity,
            price: model.price,
            created_by: model.created_by,
            created_at: model.created_at,
            last_edited_by: model.last_edited_by,
            last_edited_at: model.last_edited_at,
            notes: model.notes.0,
        }
    }
}

/// User as returned by the API. The password hash never leaves the service.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub group: UserGroup,
    pub active: bool,
    pub approved: bool,
    pub approved_by: Option<ActorSnapshot>,
    pub approved_at: Option<DateTime<Utc>>,
    pub last_active: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub is_online: bool,
}

impl User {
    pub fn from_model(model: users::Model, now: DateTime<Utc>) -> Self {
        Self {
            id: model.id,
            is_online: is_online(model.last_active, now),
            username: model.username,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            group: model.group,
            active: model.active,
            approved: model.approved,
            approved_by: model.approved_by,
            approved_at: model.approved_at,
            last_active: model.last_active,
            created_at: model.created_at,
        }
    }
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        User::from_model(model, Utc::now())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: HistoryType,
    pub product_id: Option<Uuid>,
    pub product_name: Option<String>,
    pub user_id: Uuid,
    pub user_first_name: String,
    pub user_last_name: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
    pub note_id: Option<Uuid>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<HistoryMetadata>,
}

impl From<history::Model> for HistoryEntry {
    fn from(model: history::Model) -> Self {
        Self {
            id: model.id,
            kind: model.kind,
            product_id: model.product_id,
            product_name: model.product_name,
            user_id: model.user_id,
            user_first_name: model.user_first_name,
            user_last_name: model.user_last_name,
            details: model.details,
            timestamp: model.timestamp,
            note_id: model.note_id,
            metadata: model.metadata.and_then(metadata_from_json),
        }
    }
}

/// A history record about to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryEntry {
    pub kind: HistoryType,
    pub product_id: Option<Uuid>,
    pub product_name: Option<String>,
    pub actor: ActorSnapshot,
    pub details: String,
    pub timestamp: DateTime<Utc>,
    pub note_id: Option<Uuid>,
    pub metadata: Option<HistoryMetadata>,
}

impl NewHistoryEntry {
    pub fn new(kind: HistoryType, actor: &ActorSnapshot, details: impl Into<String>) -> Self {
        Self {
            kind,
            product_id: None,
            product_name: None,
            actor: actor.clone(),
            details: details.into(),
            timestamp: Utc::now(),
            note_id: None,
            metadata: None,
        }
    }

    pub fn product(mut self, id: Uuid, name: impl Into<String>) -> Self {
        self.product_id = Some(id);
        self.product_name = Some(name.into());
        self
    }

    pub fn note(mut self, id: Uuid) -> Self {
        self.note_id = Some(id);
        self
    }

    pub fn metadata(mut self, metadata: HistoryMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn into_active_model(self) -> history::ActiveModel {
        history::ActiveModel {
            id: Set(Uuid::new_v4()),
            kind: Set(self.kind),
            product_id: Set(self.product_id),
            product_name: Set(self.product_name),
            user_id: Set(self.actor.id),
            user_first_name: Set(self.actor.first_name),
            user_last_name: Set(self.actor.last_name),
            details: Set(self.details),
            timestamp: Set(self.timestamp),
            note_id: Set(self.note_id),
            metadata: Set(self.metadata.as_ref().map(metadata_to_json)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Warning,
    Error,
    Success,
}

/// Alert computed from current product and history state. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}
