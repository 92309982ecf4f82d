use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Notification, NotificationKind};

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    pub unread_only: Option<bool>,
    #[serde(rename = "type")]
    pub kind: Option<NotificationKind>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationList {
    pub items: Vec<Notification>,
    pub total: usize,
    pub unread_count: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateNotificationRequest {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub link: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedNotification {
    pub message: String,
    pub notification: Notification,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkReadRequest {
    pub read: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadStatus {
    pub message: String,
    pub id: String,
    pub read: bool,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationUpdate {
    pub message: String,
    pub id: String,
    #[schema(value_type = Object)]
    pub update: serde_json::Value,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClearNotificationsQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub older_than: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClearedNotifications {
    pub message: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub older_than: Option<String>,
}
