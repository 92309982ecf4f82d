use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{HistoryEntry, HistoryMetadata};

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub product_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub search: Option<String>,
    /// `all` or a number of days.
    pub period: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateHistoryRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub details: Option<String>,
    pub product_id: Option<Uuid>,
    pub product_name: Option<String>,
    pub note_id: Option<Uuid>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<HistoryMetadata>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedHistoryEntry {
    pub message: String,
    pub history_entry: HistoryEntry,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PopulateResult {
    pub message: String,
    pub entries_count: usize,
}
