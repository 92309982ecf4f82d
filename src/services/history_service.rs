use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};

use crate::{
    audit,
    dto::history::{CreateHistoryRequest, CreatedHistoryEntry, HistoryQuery, PopulateResult},
    entity::{
        History, Products, Users,
        history::Column,
        products::Model as ProductModel,
        users::Model as UserModel,
    },
    error::{AppError, AppResult},
    middleware::auth::{Session, ensure_admin},
    models::{
        HistoryEntry, HistoryMetadata, HistoryType, MetadataValue, NewHistoryEntry, ProductNote,
        UserGroup,
    },
    response::{ApiResponse, Paginated},
    routes::params::Pagination,
    services::{contains_pattern, search_term},
    state::AppState,
};

pub const POPULATE_BATCH_SIZE: usize = 100;
const NOTE_PREVIEW_CHARS: usize = 50;

fn invalid_type() -> AppError {
    AppError::BadRequest("Invalid operation type".into())
}

pub fn parse_history_type(raw: &str) -> AppResult<HistoryType> {
    raw.parse().map_err(|_| invalid_type())
}

/// `all` (or nothing) means unbounded; otherwise a positive number of days.
pub fn parse_period(period: Option<&str>, now: DateTime<Utc>) -> AppResult<Option<DateTime<Utc>>> {
    match period.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(days) => days
            .parse::<i64>()
            .ok()
            .filter(|days| *days > 0)
            .and_then(Duration::try_days)
            .and_then(|span| now.checked_sub_signed(span))
            .map(Some)
            .ok_or_else(|| AppError::BadRequest("Invalid period".into())),
    }
}

pub async fn list_history(
    state: &AppState,
    session: &Session,
    query: HistoryQuery,
) -> AppResult<ApiResponse<Paginated<HistoryEntry>>> {
    ensure_admin(session)?;
    let (page, limit, offset) = Pagination::new(query.page, query.limit).normalize();
    let kind = query
        .kind
        .as_deref()
        .filter(|k| !k.is_empty())
        .map(parse_history_type)
        .transpose()?;
    let since = parse_period(query.period.as_deref(), Utc::now())?;

    let mut condition = Condition::all();
    if let Some(kind) = kind {
        condition = condition.add(Column::Kind.eq(kind));
    }
    if let Some(product_id) = query.product_id {
        condition = condition.add(Column::ProductId.eq(product_id));
    }
    if let Some(user_id) = query.user_id {
        condition = condition.add(Column::UserId.eq(user_id));
    }
    if let Some(search) = search_term(query.search.as_ref()) {
        let pattern = contains_pattern(search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Details).ilike(pattern.clone()))
                .add(Expr::col(Column::ProductName).ilike(pattern.clone()))
                .add(Expr::col(Column::UserFirstName).ilike(pattern.clone()))
                .add(Expr::col(Column::UserLastName).ilike(pattern)),
        );
    }
    if let Some(since) = since {
        condition = condition.add(Column::Timestamp.gte(since));
    }

    let filtered = History::find().filter(condition);
    let items_query = filtered
        .clone()
        .order_by_desc(Column::Timestamp)
        .order_by_asc(Column::Id)
        .limit(limit)
        .offset(offset)
        .all(&state.orm);
    let count_query = filtered.count(&state.orm);
    let (items, total) = tokio::try_join!(items_query, count_query)?;

    let items = items.into_iter().map(HistoryEntry::from).collect();
    Ok(ApiResponse::success(Paginated::new(items, total, page, limit)))
}

/// Explicit append from the admin UI. Unlike internal recording, a failed
/// write is reported to the caller.
pub async fn append_history(
    state: &AppState,
    session: &Session,
    payload: CreateHistoryRequest,
) -> AppResult<ApiResponse<CreatedHistoryEntry>> {
    ensure_admin(session)?;
    let (Some(kind), Some(details)) = (
        payload.kind.as_deref().filter(|k| !k.is_empty()),
        payload.details.filter(|d| !d.trim().is_empty()),
    ) else {
        return Err(AppError::BadRequest("Missing required fields".into()));
    };
    let kind = parse_history_type(kind)?;

    let mut entry = NewHistoryEntry::new(kind, &session.actor(), details);
    entry.product_id = payload.product_id;
    entry.product_name = payload.product_name;
    entry.note_id = payload.note_id;
    entry.metadata = payload.metadata;

    let saved = audit::log_history(&state.orm, entry).await?;
    Ok(ApiResponse::success(CreatedHistoryEntry {
        message: "History entry added successfully".into(),
        history_entry: saved.into(),
    }))
}

fn note_preview(content: &str) -> String {
    let mut preview: String = content.chars().take(NOTE_PREVIEW_CHARS).collect();
    if content.chars().count() > NOTE_PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}

fn fields(names: &[&str]) -> MetadataValue {
    MetadataValue::from(names)
}

fn user_entries(user: &UserModel) -> Vec<NewHistoryEntry> {
    if user.first_name.trim().is_empty() || user.last_name.trim().is_empty() {
        tracing::warn!(user_id = %user.id, "skipping user without a name");
        return Vec::new();
    }
    let actor = user.actor();
    let mut entries = vec![
        NewHistoryEntry::new(
            HistoryType::UserCreate,
            &actor,
            format!("Utworzono użytkownika: {} {}", user.first_name, user.last_name),
        )
        .at(user.created_at)
        .metadata(HistoryMetadata::from([
            ("email".to_string(), user.email.as_str().into()),
            (
                "affectedFields".to_string(),
                fields(&["firstName", "lastName", "email"]),
            ),
        ])),
    ];

    if user.group == UserGroup::Admin {
        entries.push(
            NewHistoryEntry::new(
                HistoryType::UserRoleChange,
                &actor,
                "Przypisano role użytkownikowi",
            )
            .at(user.approved_at.unwrap_or(user.created_at))
            .metadata(HistoryMetadata::from([
                ("newValue".to_string(), user.group.as_str().into()),
                ("affectedFields".to_string(), fields(&["group"])),
            ])),
        );
    }

    if !user.active {
        entries.push(
            NewHistoryEntry::new(HistoryType::UserBan, &actor, "Zablokowano konto użytkownika")
                .at(user.created_at)
                .metadata(HistoryMetadata::from([(
                    "reason".to_string(),
                    "Konto zostało zablokowane przez administratora".into(),
                )])),
        );
    }

    entries
}

fn note_entries(product: &ProductModel, note: &ProductNote) -> Vec<NewHistoryEntry> {
    let metadata = || {
        HistoryMetadata::from([
            ("content".to_string(), note_preview(&note.content).into()),
            ("affectedFields".to_string(), fields(&["notes"])),
        ])
    };
    let mut entries = vec![
        NewHistoryEntry::new(
            HistoryType::NoteAdd,
            &note.created_by,
            format!("Dodano notatkę do produktu: {}", product.name),
        )
        .product(product.id, &product.name)
        .note(note.id)
        .at(note.created_at)
        .metadata(metadata()),
    ];

    if let (Some(updated_at), Some(updated_by)) = (note.updated_at, note.updated_by.as_ref()) {
        entries.push(
            NewHistoryEntry::new(
                HistoryType::NoteEdit,
                updated_by,
                format!("Zaktualizowano notatkę w produkcie: {}", product.name),
            )
            .product(product.id, &product.name)
            .note(note.id)
            .at(updated_at)
            .metadata(metadata()),
        );
    }
    entries
}

fn product_entries(product: &ProductModel) -> Vec<NewHistoryEntry> {
    if product.name.trim().is_empty() {
        tracing::warn!(product_id = %product.id, "skipping product without a name");
        return Vec::new();
    }
    let mut entries = vec![
        NewHistoryEntry::new(
            HistoryType::ProductCreate,
            &product.created_by,
            format!("Utworzono produkt: {}", product.name),
        )
        .product(product.id, &product.name)
        .at(product.created_at)
        .metadata(HistoryMetadata::from([
            ("quantity".to_string(), product.quantity.into()),
            ("price".to_string(), product.price.into()),
            (
                "affectedFields".to_string(),
                fields(&["name", "quantity", "price"]),
            ),
        ])),
    ];

    // Only the latest edit is recoverable from current state.
    if let (Some(edited_at), Some(editor)) = (product.last_edited_at, product.last_edited_by.as_ref())
    {
        entries.push(
            NewHistoryEntry::new(
                HistoryType::InventoryUpdate,
                editor,
                format!("Zaktualizowano stan magazynowy produktu: {}", product.name),
            )
            .product(product.id, &product.name)
            .at(edited_at)
            .metadata(HistoryMetadata::from([
                ("newValue".to_string(), product.quantity.into()),
                ("affectedFields".to_string(), fields(&["quantity"])),
            ])),
        );
        entries.push(
            NewHistoryEntry::new(
                HistoryType::PriceUpdate,
                editor,
                format!("Zaktualizowano cenę produktu: {}", product.name),
            )
            .product(product.id, &product.name)
            .at(edited_at)
            .metadata(HistoryMetadata::from([
                ("newValue".to_string(), format!("{}zł", product.price).into()),
                ("affectedFields".to_string(), fields(&["price"])),
            ])),
        );
    }

    for note in &product.notes.0 {
        entries.extend(note_entries(product, note));
    }
    entries
}

/// Lossy reconstruction of the log from current users and products, newest
/// first. Intermediate edits cannot be recovered.
pub fn rebuild_history(users: &[UserModel], products: &[ProductModel]) -> Vec<NewHistoryEntry> {
    let mut entries: Vec<NewHistoryEntry> = users
        .iter()
        .flat_map(user_entries)
        .chain(products.iter().flat_map(product_entries))
        .collect();
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    entries
}

/// Destructive: wipes the whole history table before rebuilding it.
pub async fn repopulate_history(
    state: &AppState,
    session: &Session,
) -> AppResult<ApiResponse<PopulateResult>> {
    ensure_admin(session)?;

    let (users, products) = tokio::try_join!(
        Users::find().all(&state.orm),
        Products::find().all(&state.orm)
    )?;
    let entries = rebuild_history(&users, &products);
    tracing::warn!(
        users = users.len(),
        products = products.len(),
        entries = entries.len(),
        "rebuilding history from current state; previous entries are discarded"
    );

    let txn = state.orm.begin().await?;
    History::delete_many().exec(&txn).await?;
    let count = audit::insert_batched(&txn, entries, POPULATE_BATCH_SIZE).await?;
    txn.commit().await?;

    let message = if count == 0 {
        "Brak danych do zaktualizowania historii"
    } else {
        "Historia została zaktualizowana"
    };
    Ok(ApiResponse::success(PopulateResult {
        message: message.into(),
        entries_count: count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{entity::products::ProductNotes, models::ActorSnapshot};
    use uuid::Uuid;

    fn user(first: &str, group: UserGroup, active: bool) -> UserModel {
        UserModel {
            id: Uuid::new_v4(),
            username: None,
            first_name: first.into(),
            last_name: "Nowak".into(),
            email: format!("{}@example.com", first.to_lowercase()),
            password_hash: None,
            group,
            active,
            approved: true,
            approved_by: None,
            approved_at: None,
            last_active: None,
            created_at: Utc::now() - Duration::days(30),
        }
    }

    fn product(name: &str, edited: bool, notes: Vec<ProductNote>) -> ProductModel {
        let actor = ActorSnapshot {
            id: Uuid::new_v4(),
            first_name: "Anna".into(),
            last_name: "Nowak".into(),
        };
        ProductModel {
            id: Uuid::new_v4(),
            owner: String::new(),
            name: name.into(),
            quantity: 7,
            price: 19.99,
            created_by: actor.clone(),
            created_at: Utc::now() - Duration::days(10),
            last_edited_by: edited.then(|| actor.clone()),
            last_edited_at: edited.then(Utc::now),
            notes: ProductNotes(notes),
        }
    }

    fn count(entries: &[NewHistoryEntry], kind: HistoryType) -> usize {
        entries.iter().filter(|e| e.kind == kind).count()
    }

    #[test]
    fn period_accepts_all_or_positive_days() {
        let now = Utc::now();
        assert_eq!(parse_period(None, now).unwrap(), None);
        assert_eq!(parse_period(Some("all"), now).unwrap(), None);
        assert_eq!(
            parse_period(Some("7"), now).unwrap(),
            Some(now - Duration::days(7))
        );
        assert!(parse_period(Some("0"), now).is_err());
        assert!(parse_period(Some("week"), now).is_err());
    }

    #[test]
    fn period_out_of_calendar_range_is_rejected() {
        let now = Utc::now();
        for raw in ["9999999999999", "106751991167300"] {
            assert!(matches!(
                parse_period(Some(raw), now),
                Err(AppError::BadRequest(msg)) if msg == "Invalid period"
            ));
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(parse_history_type("user_ban").is_ok());
        assert!(matches!(
            parse_history_type("user_promote"),
            Err(AppError::BadRequest(msg)) if msg == "Invalid operation type"
        ));
    }

    #[test]
    fn rebuild_emits_one_create_per_named_user_and_product() {
        let users = vec![
            user("Jan", UserGroup::User, true),
            user("Ada", UserGroup::Admin, false),
            user("", UserGroup::User, true),
        ];
        let products = vec![product("Widget", true, vec![]), product("Bolt", false, vec![])];
        let entries = rebuild_history(&users, &products);

        assert_eq!(count(&entries, HistoryType::UserCreate), 2);
        assert_eq!(count(&entries, HistoryType::UserRoleChange), 1);
        assert_eq!(count(&entries, HistoryType::UserBan), 1);
        assert_eq!(count(&entries, HistoryType::ProductCreate), 2);
        assert_eq!(count(&entries, HistoryType::InventoryUpdate), 1);
        assert_eq!(count(&entries, HistoryType::PriceUpdate), 1);
    }

    #[test]
    fn rebuild_is_sorted_newest_first() {
        let entries = rebuild_history(
            &[user("Jan", UserGroup::User, true)],
            &[product("Widget", true, vec![])],
        );
        assert!(entries.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[test]
    fn price_update_carries_currency_suffix() {
        let entries = rebuild_history(&[], &[product("Widget", true, vec![])]);
        let price = entries
            .iter()
            .find(|e| e.kind == HistoryType::PriceUpdate)
            .unwrap();
        assert_eq!(
            price.metadata.as_ref().unwrap().get("newValue"),
            Some(&MetadataValue::Text("19.99zł".into()))
        );
    }

    #[test]
    fn notes_yield_add_and_edit_entries_with_preview() {
        let author = ActorSnapshot {
            id: Uuid::new_v4(),
            first_name: "Ola".into(),
            last_name: "Lis".into(),
        };
        let mut edited = ProductNote::new("x".repeat(60), author.clone(), Utc::now());
        edited.updated_by = Some(author.clone());
        edited.updated_at = Some(Utc::now());
        let plain = ProductNote::new("short", author, Utc::now());

        let entries = rebuild_history(&[], &[product("Widget", false, vec![edited, plain])]);
        assert_eq!(count(&entries, HistoryType::NoteAdd), 2);
        assert_eq!(count(&entries, HistoryType::NoteEdit), 1);

        let preview = entries
            .iter()
            .find(|e| e.kind == HistoryType::NoteEdit)
            .and_then(|e| e.metadata.as_ref())
            .and_then(|m| m.get("content"))
            .unwrap();
        assert_eq!(preview, &MetadataValue::Text(format!("{}...", "x".repeat(50))));
    }
}
