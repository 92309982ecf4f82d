//! Notifications are a view over live product and history state. Nothing here
//! is stored, so read/clear operations succeed without persisting anything.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde_json::json;
use uuid::Uuid;

use crate::{
    dto::notifications::{
        ClearNotificationsQuery, ClearedNotifications, CreateNotificationRequest,
        CreatedNotification, MarkReadRequest, NotificationList, NotificationQuery,
        NotificationUpdate, ReadStatus,
    },
    entity::{History, Products, history, products},
    error::{AppError, AppResult},
    middleware::auth::{Session, ensure_admin},
    models::{LOW_STOCK_THRESHOLD, Notification, NotificationKind},
    response::{ApiResponse, MessageData},
    state::AppState,
};

pub const DEFAULT_LIMIT: usize = 50;
pub const RECENT_WINDOW_HOURS: i64 = 24;

/// Parsed form of the synthetic notification ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationId {
    LowStock(Uuid),
    Update(Uuid),
    History(Uuid),
    Manual(String),
}

impl NotificationId {
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationId::LowStock(_) => NotificationKind::Warning,
            _ => NotificationKind::Info,
        }
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationId::LowStock(id) => write!(f, "low_stock_{id}"),
            NotificationId::Update(id) => write!(f, "update_{id}"),
            NotificationId::History(id) => write!(f, "history_{id}"),
            NotificationId::Manual(token) => write!(f, "manual_{token}"),
        }
    }
}

impl FromStr for NotificationId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::BadRequest("Invalid notification ID".into());
        let uuid = |raw: &str| Uuid::parse_str(raw).map_err(|_| invalid());

        if let Some(rest) = s.strip_prefix("low_stock_") {
            return Ok(NotificationId::LowStock(uuid(rest)?));
        }
        if let Some(rest) = s.strip_prefix("update_") {
            return Ok(NotificationId::Update(uuid(rest)?));
        }
        if let Some(rest) = s.strip_prefix("history_") {
            return Ok(NotificationId::History(uuid(rest)?));
        }
        match s.strip_prefix("manual_") {
            Some(token) if !token.is_empty() => Ok(NotificationId::Manual(token.to_string())),
            _ => Err(invalid()),
        }
    }
}

pub fn low_stock_notification(product: &products::Model, now: DateTime<Utc>) -> Notification {
    Notification {
        id: NotificationId::LowStock(product.id).to_string(),
        kind: NotificationKind::Warning,
        message: format!(
            "Niski stan magazynowy: {} ({} szt.)",
            product.name, product.quantity
        ),
        timestamp: now,
        read: false,
        link: Some(format!("/admin/products/{}", product.id)),
        data: json!({
            "productId": product.id,
            "currentQuantity": product.quantity,
        }),
    }
}

pub fn update_notification(product: &products::Model) -> Option<Notification> {
    let editor = product.last_edited_by.as_ref()?;
    let edited_at = product.last_edited_at?;
    Some(Notification {
        id: NotificationId::Update(product.id).to_string(),
        kind: NotificationKind::Info,
        message: format!(
            "{} zaktualizował(a) produkt \"{}\"",
            editor.full_name(),
            product.name
        ),
        timestamp: edited_at,
        read: false,
        link: Some(format!("/admin/products/{}", product.id)),
        data: json!({
            "productId": product.id,
            "updatedBy": editor,
        }),
    })
}

fn history_link(entry: &history::Model) -> Option<String> {
    let kind = entry.kind.as_str();
    if kind.starts_with("product_") {
        return entry
            .product_id
            .map(|id| format!("/admin/products/{id}"));
    }
    if kind.starts_with("user_") {
        return Some("/admin/users".to_string());
    }
    None
}

pub fn history_notification(entry: &history::Model) -> Notification {
    Notification {
        id: NotificationId::History(entry.id).to_string(),
        kind: NotificationKind::Info,
        message: entry.details.clone(),
        timestamp: entry.timestamp,
        read: false,
        link: history_link(entry),
        data: json!({
            "type": entry.kind,
            "userId": entry.user_id,
            "productId": entry.product_id,
            "noteId": entry.note_id,
        }),
    }
}

/// Filter by kind and read state, newest first, then truncate.
pub fn select_notifications(
    mut items: Vec<Notification>,
    query: &NotificationQuery,
) -> NotificationList {
    if let Some(kind) = query.kind {
        items.retain(|n| n.kind == kind);
    }
    if query.unread_only.unwrap_or(false) {
        items.retain(|n| !n.read);
    }
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    // 0 means no limit
    match query.limit.unwrap_or(DEFAULT_LIMIT) {
        0 => {}
        limit => items.truncate(limit),
    }

    let unread_count = items.iter().filter(|n| !n.read).count();
    NotificationList {
        total: items.len(),
        unread_count,
        items,
    }
}

async fn live_notifications(state: &AppState, now: DateTime<Utc>) -> AppResult<Vec<Notification>> {
    let since = now - Duration::hours(RECENT_WINDOW_HOURS);

    let (low_stock, edited, recent_history) = tokio::try_join!(
        Products::find()
            .filter(products::Column::Quantity.lt(LOW_STOCK_THRESHOLD))
            .all(&state.orm),
        Products::find()
            .filter(products::Column::LastEditedAt.gte(since))
            .filter(products::Column::LastEditedBy.is_not_null())
            .all(&state.orm),
        History::find()
            .filter(history::Column::Timestamp.gte(since))
            .order_by_desc(history::Column::Timestamp)
            .all(&state.orm),
    )?;

    let mut items: Vec<Notification> = low_stock
        .iter()
        .map(|product| low_stock_notification(product, now))
        .collect();
    items.extend(edited.iter().filter_map(update_notification));
    items.extend(recent_history.iter().map(history_notification));
    Ok(items)
}

pub async fn list_notifications(
    state: &AppState,
    session: &Session,
    query: NotificationQuery,
) -> AppResult<ApiResponse<NotificationList>> {
    ensure_admin(session)?;
    let items = live_notifications(state, Utc::now()).await?;
    Ok(ApiResponse::success(select_notifications(items, &query)))
}

pub async fn get_notification(
    state: &AppState,
    session: &Session,
    id: &str,
) -> AppResult<ApiResponse<Notification>> {
    ensure_admin(session)?;
    let id = id.parse::<NotificationId>()?.to_string();
    let notification = live_notifications(state, Utc::now())
        .await?
        .into_iter()
        .find(|n| n.id == id)
        .ok_or_else(|| AppError::NotFound("Notification not found".into()))?;
    Ok(ApiResponse::success(notification))
}

/// Builds a transient notification and echoes it back; nothing is stored.
pub fn create_notification(
    session: &Session,
    payload: CreateNotificationRequest,
) -> AppResult<ApiResponse<CreatedNotification>> {
    ensure_admin(session)?;
    if payload.message.trim().is_empty() {
        return Err(AppError::BadRequest("Missing required fields".into()));
    }
    let now = Utc::now();
    let notification = Notification {
        id: NotificationId::Manual(now.timestamp_millis().to_string()).to_string(),
        kind: payload.kind,
        message: payload.message,
        timestamp: now,
        read: false,
        link: payload.link,
        data: json!({ "createdBy": session.actor() }),
    };
    Ok(ApiResponse::success(CreatedNotification {
        message: "Notification created successfully".into(),
        notification,
    }))
}

pub fn mark_read(
    session: &Session,
    id: &str,
    payload: MarkReadRequest,
) -> AppResult<ApiResponse<ReadStatus>> {
    ensure_admin(session)?;
    let parsed = id.parse::<NotificationId>()?;
    Ok(ApiResponse::success(ReadStatus {
        message: "Notification status updated".into(),
        id: parsed.to_string(),
        read: payload.read,
        kind: parsed.kind(),
    }))
}

pub fn update_notification_state(
    session: &Session,
    id: &str,
    update: serde_json::Value,
) -> AppResult<ApiResponse<NotificationUpdate>> {
    ensure_admin(session)?;
    let parsed = id.parse::<NotificationId>()?;
    if !update.is_object() {
        return Err(AppError::BadRequest("Invalid update data".into()));
    }
    Ok(ApiResponse::success(NotificationUpdate {
        message: "Notification updated successfully".into(),
        id: parsed.to_string(),
        update,
    }))
}

pub fn delete_notification(session: &Session, id: &str) -> AppResult<ApiResponse<MessageData>> {
    ensure_admin(session)?;
    id.parse::<NotificationId>()?;
    Ok(ApiResponse::success(MessageData::new(
        "Notification deleted successfully",
    )))
}

pub fn clear_notifications(
    session: &Session,
    query: ClearNotificationsQuery,
) -> AppResult<ApiResponse<ClearedNotifications>> {
    ensure_admin(session)?;
    Ok(ApiResponse::success(ClearedNotifications {
        message: "Notifications cleared successfully".into(),
        kind: query.kind,
        older_than: query.older_than,
    }))
}

pub fn mark_all_read(session: &Session) -> AppResult<ApiResponse<MessageData>> {
    ensure_admin(session)?;
    Ok(ApiResponse::success(MessageData::new(
        "All notifications marked as read",
    )))
}

pub fn clear_all(session: &Session) -> AppResult<ApiResponse<MessageData>> {
    ensure_admin(session)?;
    Ok(ApiResponse::success(MessageData::new(
        "All notifications cleared",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        entity::products::ProductNotes,
        models::{ActorSnapshot, HistoryType, UserGroup},
    };

    fn product(quantity: i32, edited_hours_ago: Option<i64>) -> products::Model {
        let actor = ActorSnapshot {
            id: Uuid::new_v4(),
            first_name: "Ewa".into(),
            last_name: "Kot".into(),
        };
        products::Model {
            id: Uuid::new_v4(),
            owner: String::new(),
            name: "Widget".into(),
            quantity,
            price: 10.0,
            created_by: actor.clone(),
            created_at: Utc::now(),
            last_edited_by: edited_hours_ago.map(|_| actor.clone()),
            last_edited_at: edited_hours_ago.map(|h| Utc::now() - Duration::hours(h)),
            notes: ProductNotes::default(),
        }
    }

    fn history_row(kind: HistoryType, product_id: Option<Uuid>) -> history::Model {
        history::Model {
            id: Uuid::new_v4(),
            kind,
            product_id,
            product_name: product_id.map(|_| "Widget".to_string()),
            user_id: Uuid::new_v4(),
            user_first_name: "Ewa".into(),
            user_last_name: "Kot".into(),
            details: "Zaktualizowano produkt: ilość: 5 → 50".into(),
            timestamp: Utc::now(),
            note_id: None,
            metadata: None,
        }
    }

    #[test]
    fn ids_round_trip_through_the_grammar() {
        let id = Uuid::new_v4();
        for parsed in [
            NotificationId::LowStock(id),
            NotificationId::Update(id),
            NotificationId::History(id),
            NotificationId::Manual("1700000000000".into()),
        ] {
            assert_eq!(parsed.to_string().parse::<NotificationId>().unwrap(), parsed);
        }
    }

    #[test]
    fn unknown_id_shapes_are_bad_requests() {
        for raw in ["", "low_stock_nope", "promo_1", "manual_", "update_123"] {
            assert!(matches!(
                raw.parse::<NotificationId>(),
                Err(AppError::BadRequest(_))
            ));
        }
    }

    #[test]
    fn low_stock_message_and_link() {
        let p = product(5, None);
        let n = low_stock_notification(&p, Utc::now());
        assert_eq!(n.kind, NotificationKind::Warning);
        assert_eq!(n.message, "Niski stan magazynowy: Widget (5 szt.)");
        assert_eq!(n.link, Some(format!("/admin/products/{}", p.id)));
        assert_eq!(n.id, format!("low_stock_{}", p.id));
    }

    #[test]
    fn update_notification_needs_an_editor() {
        assert!(update_notification(&product(50, None)).is_none());
        let n = update_notification(&product(50, Some(1))).unwrap();
        assert_eq!(n.message, "Ewa Kot zaktualizował(a) produkt \"Widget\"");
    }

    #[test]
    fn history_links_follow_the_type_family() {
        let pid = Uuid::new_v4();
        let product = history_notification(&history_row(HistoryType::ProductUpdate, Some(pid)));
        assert_eq!(product.link, Some(format!("/admin/products/{pid}")));
        let user = history_notification(&history_row(HistoryType::UserBan, None));
        assert_eq!(user.link.as_deref(), Some("/admin/users"));
        let note = history_notification(&history_row(HistoryType::NoteAdd, Some(pid)));
        assert_eq!(note.link, None);
    }

    #[test]
    fn selection_filters_sorts_and_limits() {
        let now = Utc::now();
        let mut items = vec![
            low_stock_notification(&product(1, None), now - Duration::hours(2)),
            update_notification(&product(20, Some(1))).unwrap(),
            history_notification(&history_row(HistoryType::ProductCreate, None)),
        ];
        items[2].timestamp = now;

        let warnings = select_notifications(
            items.clone(),
            &NotificationQuery {
                kind: Some(NotificationKind::Warning),
                ..Default::default()
            },
        );
        assert_eq!(warnings.total, 1);
        assert_eq!(warnings.unread_count, 1);

        let limited = select_notifications(
            items,
            &NotificationQuery {
                limit: Some(2),
                ..Default::default()
            },
        );
        assert_eq!(limited.total, 2);
        assert!(limited.items[0].timestamp >= limited.items[1].timestamp);
        assert!(limited.items[0].id.starts_with("history_"));
    }

    #[test]
    fn zero_limit_keeps_every_notification() {
        let now = Utc::now();
        let items: Vec<Notification> = (0..60)
            .map(|_| low_stock_notification(&product(1, None), now))
            .collect();

        let unlimited = select_notifications(
            items.clone(),
            &NotificationQuery {
                limit: Some(0),
                ..Default::default()
            },
        );
        assert_eq!(unlimited.total, 60);

        let defaulted = select_notifications(items, &NotificationQuery::default());
        assert_eq!(defaulted.total, DEFAULT_LIMIT);
    }

    #[test]
    fn manual_notification_carries_its_author() {
        let session = Session {
            id: Uuid::new_v4(),
            username: None,
            first_name: "Ewa".into(),
            last_name: "Kot".into(),
            email: "ewa@example.com".into(),
            group: UserGroup::Admin,
            active: true,
        };
        let created = create_notification(
            &session,
            CreateNotificationRequest {
                kind: NotificationKind::Success,
                message: "Dostawa przyjęta".into(),
                link: None,
            },
        )
        .unwrap()
        .data
        .unwrap();
        assert_eq!(created.message, "Notification created successfully");
        assert!(created.notification.id.starts_with("manual_"));
        assert_eq!(created.notification.data["createdBy"]["id"], json!(session.id));
        assert_eq!(created.notification.data["createdBy"]["firstName"], "Ewa");
    }
}
