use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, FromQueryResult, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    db::OrmConn,
    dto::products::{
        AddNoteRequest, CreateProductRequest, DeletedProduct, EditNoteRequest, NoteInput,
        ProductList, ProductStats, UpdateProductByBodyRequest, UpdateProductRequest,
    },
    entity::products::{ActiveModel, Column, Entity as Products, Model as ProductModel, ProductNotes},
    error::{AppError, AppResult},
    middleware::auth::{Session, ensure_admin},
    models::{
        ActorSnapshot, HistoryType, LOW_STOCK_THRESHOLD, NewHistoryEntry, Product, ProductNote,
        round2,
    },
    response::{ApiResponse, total_pages},
    routes::params::{ProductQuery, ProductSortField, SortOrder},
    services::{contains_pattern, search_term},
    state::AppState,
};

#[derive(Debug, Default, FromQueryResult)]
struct StatsRow {
    total_value: Option<f64>,
    average_price: Option<f64>,
    total_quantity: Option<i64>,
    low_stock_items: Option<i64>,
}

fn invalid_product() -> AppError {
    AppError::BadRequest("Invalid product data".into())
}

fn product_not_found() -> AppError {
    AppError::NotFound("Product not found".into())
}

/// Filter shared by the page query, the count and the stats aggregate.
fn list_condition(query: &ProductQuery) -> Condition {
    let mut condition = Condition::all();

    if let Some(search) = search_term(query.search.as_ref()) {
        let pattern = contains_pattern(search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::cust_with_values(
                    r#"EXISTS (SELECT 1 FROM jsonb_array_elements("products"."notes") AS note WHERE note->>'content' ILIKE $1)"#,
                    [pattern],
                )),
        );
    }

    if let Some(min) = query.min_quantity {
        condition = condition.add(Column::Quantity.gte(min));
    }
    if let Some(max) = query.max_quantity {
        condition = condition.add(Column::Quantity.lte(max));
    }
    if let Some(min) = query.min_price {
        condition = condition.add(Column::Price.gte(min));
    }
    if let Some(max) = query.max_price {
        condition = condition.add(Column::Price.lte(max));
    }

    condition
}

fn sort_column(field: ProductSortField) -> Column {
    match field {
        ProductSortField::CreatedAt => Column::CreatedAt,
        ProductSortField::Name => Column::Name,
        ProductSortField::Quantity => Column::Quantity,
        ProductSortField::Price => Column::Price,
        ProductSortField::Owner => Column::Owner,
        ProductSortField::LastEditedAt => Column::LastEditedAt,
    }
}

pub async fn list_products(
    state: &AppState,
    session: &Session,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(session)?;
    let (page, limit, offset) = query.pagination().normalize();
    let condition = list_condition(&query);

    let sort_col = sort_column(query.sort_field.unwrap_or_default());
    let filtered = Products::find().filter(condition);
    let ordered = match query.sort_order.unwrap_or_default() {
        SortOrder::Asc => filtered.clone().order_by_asc(sort_col),
        SortOrder::Desc => filtered.clone().order_by_desc(sort_col),
    }
    // id breaks ties so consecutive pages never overlap
    .order_by_asc(Column::Id);

    let items_query = ordered.limit(limit).offset(offset).all(&state.orm);
    let count_query = filtered.clone().count(&state.orm);
    let stats_query = filtered
        .select_only()
        .column_as(
            Expr::cust("COALESCE(SUM(price * quantity), 0)::float8"),
            "total_value",
        )
        .column_as(Expr::cust("COALESCE(AVG(price), 0)::float8"), "average_price")
        .column_as(Expr::cust("COALESCE(SUM(quantity), 0)::int8"), "total_quantity")
        .column_as(
            Expr::cust_with_values("COUNT(*) FILTER (WHERE quantity < $1)", [LOW_STOCK_THRESHOLD]),
            "low_stock_items",
        )
        .into_model::<StatsRow>()
        .one(&state.orm);

    let (items, total, stats) = tokio::try_join!(items_query, count_query, stats_query)?;
    let stats = stats.unwrap_or_default();

    tracing::debug!(total, page, limit, "listed products");

    Ok(ApiResponse::success(ProductList {
        items: items.into_iter().map(Product::from).collect(),
        total,
        page,
        limit,
        total_pages: total_pages(total, limit),
        stats: ProductStats {
            total_products: total,
            total_value: round2(stats.total_value.unwrap_or(0.0)),
            average_price: round2(stats.average_price.unwrap_or(0.0)),
            total_quantity: stats.total_quantity.unwrap_or(0),
            low_stock_items: stats.low_stock_items.unwrap_or(0).max(0) as u64,
        },
    }))
}

async fn find_product(conn: &OrmConn, id: Uuid) -> AppResult<ProductModel> {
    Products::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(product_not_found)
}

pub async fn get_product(
    state: &AppState,
    session: &Session,
    id: Uuid,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(session)?;
    let product = find_product(&state.orm, id).await?;
    Ok(ApiResponse::success(product.into()))
}

/// Whole inventory, newest first, for the user dashboard.
pub async fn list_all_products(state: &AppState) -> AppResult<ApiResponse<Vec<Product>>> {
    let items = Products::find()
        .order_by_desc(Column::CreatedAt)
        .order_by_asc(Column::Id)
        .all(&state.orm)
        .await?;
    Ok(ApiResponse::success(items.into_iter().map(Product::from).collect()))
}

fn valid_actor(actor: &ActorSnapshot) -> bool {
    !actor.first_name.trim().is_empty() && !actor.last_name.trim().is_empty()
}

fn validate_new_product(payload: &CreateProductRequest) -> AppResult<()> {
    payload.validate()?;
    if payload.name.trim().is_empty() || !payload.price.is_finite() {
        return Err(invalid_product());
    }
    let notes_ok = payload.notes.iter().flatten().all(|note| {
        !note.content.trim().is_empty() && note.created_by.as_ref().is_some_and(valid_actor)
    });
    if !notes_ok {
        return Err(invalid_product());
    }
    Ok(())
}

/// Only the fields that were sent are checked.
fn validate_changes(changes: &UpdateProductRequest) -> AppResult<()> {
    changes.validate()?;
    if changes.name.as_ref().is_some_and(|name| name.trim().is_empty()) {
        return Err(invalid_product());
    }
    if changes.price.is_some_and(|price| !price.is_finite()) {
        return Err(invalid_product());
    }
    if appended_note(changes).is_some_and(|note| note.content.trim().is_empty()) {
        return Err(invalid_product());
    }
    Ok(())
}

/// Clients resend the whole notes array; only its last element is new.
fn appended_note(changes: &UpdateProductRequest) -> Option<&NoteInput> {
    changes.notes.as_ref().and_then(|notes| notes.last())
}

fn note_from_input(input: NoteInput, now: DateTime<Utc>) -> AppResult<ProductNote> {
    let created_by = input.created_by.ok_or_else(invalid_product)?;
    Ok(ProductNote::new(input.content, created_by, now))
}

/// Human-readable diffs for the update log. Owner changes are not listed.
pub fn product_changes(before: &ProductModel, after: &ProductModel) -> Vec<String> {
    let mut changes = Vec::new();
    if before.name != after.name {
        changes.push(format!("nazwa: {} → {}", before.name, after.name));
    }
    if before.quantity != after.quantity {
        changes.push(format!("ilość: {} → {}", before.quantity, after.quantity));
    }
    if before.price != after.price {
        changes.push(format!("cena: {} → {}", before.price, after.price));
    }
    changes
}

/// Apply a partial update in memory. Edit metadata is stamped even when
/// nothing else changes. Returns the updated row and the appended note.
pub fn apply_product_changes(
    existing: &ProductModel,
    changes: &UpdateProductRequest,
    actor: &ActorSnapshot,
    now: DateTime<Utc>,
) -> (ProductModel, Option<ProductNote>) {
    let mut updated = existing.clone();
    if let Some(name) = &changes.name {
        updated.name = name.clone();
    }
    if let Some(quantity) = changes.quantity {
        updated.quantity = quantity;
    }
    if let Some(price) = changes.price {
        updated.price = price;
    }
    if let Some(owner) = &changes.owner {
        updated.owner = owner.clone();
    }

    let note = appended_note(changes).map(|input| ProductNote::new(&input.content, actor.clone(), now));
    if let Some(note) = &note {
        updated.notes.0.push(note.clone());
    }

    updated.last_edited_by = Some(actor.clone());
    updated.last_edited_at = Some(now);
    (updated, note)
}

pub async fn create_product(
    state: &AppState,
    session: &Session,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(session)?;
    store_product(state, session, payload).await
}

/// Create as the caller without the admin gate. The user dashboard adds
/// stock through this.
pub async fn store_product(
    state: &AppState,
    session: &Session,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    validate_new_product(&payload)?;

    let now = Utc::now();
    let actor = session.actor();
    let notes = payload
        .notes
        .unwrap_or_default()
        .into_iter()
        .map(|note| note_from_input(note, now))
        .collect::<AppResult<Vec<_>>>()?;

    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        owner: Set(payload.owner.unwrap_or_default()),
        name: Set(payload.name),
        quantity: Set(payload.quantity),
        price: Set(payload.price),
        created_by: Set(actor.clone()),
        created_at: Set(now),
        last_edited_by: Set(None),
        last_edited_at: Set(None),
        notes: Set(ProductNotes(notes)),
    };
    let product = active.insert(&state.orm).await?;
    tracing::info!(product_id = %product.id, "product created");

    audit::record(
        &state.orm,
        NewHistoryEntry::new(
            HistoryType::ProductCreate,
            &actor,
            format!("Utworzono produkt \"{}\"", product.name),
        )
        .product(product.id, &product.name),
    )
    .await;

    Ok(ApiResponse::success(product.into()))
}

pub async fn update_product(
    state: &AppState,
    session: &Session,
    id: Uuid,
    changes: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(session)?;
    edit_product(state, session, id, changes).await
}

/// Partial update stamped with the caller as last editor, no admin gate.
pub async fn edit_product(
    state: &AppState,
    session: &Session,
    id: Uuid,
    changes: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    validate_changes(&changes)?;

    let existing = find_product(&state.orm, id).await?;
    let actor = session.actor();
    let (updated, note) = apply_product_changes(&existing, &changes, &actor, Utc::now());

    let mut active: ActiveModel = existing.clone().into();
    active.name = Set(updated.name.clone());
    active.quantity = Set(updated.quantity);
    active.price = Set(updated.price);
    active.owner = Set(updated.owner.clone());
    active.notes = Set(updated.notes.clone());
    active.last_edited_by = Set(updated.last_edited_by.clone());
    active.last_edited_at = Set(updated.last_edited_at);
    let product = active.update(&state.orm).await?;
    tracing::info!(product_id = %product.id, "product updated");

    if let Some(note) = note {
        audit::record(
            &state.orm,
            NewHistoryEntry::new(
                HistoryType::NoteAdd,
                &actor,
                format!("Dodano notatkę: \"{}\"", note.content),
            )
            .product(product.id, &product.name)
            .note(note.id),
        )
        .await;
    }

    let diffs = product_changes(&existing, &product);
    if !diffs.is_empty() {
        audit::record(
            &state.orm,
            NewHistoryEntry::new(
                HistoryType::ProductUpdate,
                &actor,
                format!("Zaktualizowano produkt: {}", diffs.join(", ")),
            )
            .product(product.id, &product.name),
        )
        .await;
    }

    Ok(ApiResponse::success(product.into()))
}

pub async fn update_product_by_body(
    state: &AppState,
    session: &Session,
    payload: UpdateProductByBodyRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(session)?;
    let id = payload
        .id
        .ok_or_else(|| AppError::BadRequest("Product ID is required".into()))?;
    edit_product(state, session, id, payload.changes).await
}

pub async fn delete_product(
    state: &AppState,
    session: &Session,
    id: Option<Uuid>,
) -> AppResult<ApiResponse<DeletedProduct>> {
    ensure_admin(session)?;
    let id = id.ok_or_else(|| AppError::BadRequest("Product ID is required".into()))?;
    remove_product(state, session, id).await
}

/// Hard delete by id, no admin gate.
pub async fn remove_product(
    state: &AppState,
    session: &Session,
    id: Uuid,
) -> AppResult<ApiResponse<DeletedProduct>> {
    let product = find_product(&state.orm, id).await?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(product_not_found());
    }
    tracing::info!(product_id = %id, "product deleted");

    audit::record(
        &state.orm,
        NewHistoryEntry::new(
            HistoryType::ProductDelete,
            &session.actor(),
            format!("Usunięto produkt \"{}\"", product.name),
        )
        .product(product.id, &product.name),
    )
    .await;

    Ok(ApiResponse::success(DeletedProduct {
        message: "Product deleted successfully".into(),
        deleted_product: product.into(),
    }))
}

/// Append a note as the caller. Open to every signed-in user.
pub async fn add_note(
    state: &AppState,
    session: &Session,
    product_id: Uuid,
    payload: AddNoteRequest,
) -> AppResult<ApiResponse<Product>> {
    if payload.content.trim().is_empty() {
        return Err(AppError::BadRequest("Note content is required".into()));
    }

    let existing = find_product(&state.orm, product_id).await?;
    let actor = session.actor();
    let note = ProductNote::new(payload.content, actor.clone(), Utc::now());

    let mut notes = existing.notes.clone();
    notes.0.push(note.clone());
    let mut active: ActiveModel = existing.into();
    active.notes = Set(notes);
    let product = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        NewHistoryEntry::new(
            HistoryType::NoteAdd,
            &actor,
            format!("Dodano notatkę: \"{}\"", note.content),
        )
        .product(product.id, &product.name)
        .note(note.id),
    )
    .await;

    Ok(ApiResponse::success(product.into()))
}

pub async fn edit_note(
    state: &AppState,
    session: &Session,
    product_id: Uuid,
    payload: EditNoteRequest,
) -> AppResult<ApiResponse<Product>> {
    if payload.content.trim().is_empty() {
        return Err(AppError::BadRequest("Note content is required".into()));
    }

    let existing = find_product(&state.orm, product_id).await?;
    let actor = session.actor();

    let mut notes = existing.notes.clone();
    let note = notes
        .0
        .iter_mut()
        .find(|note| note.id == payload.note_id)
        .ok_or_else(|| AppError::NotFound("Note not found".into()))?;
    let old_content = std::mem::replace(&mut note.content, payload.content.clone());
    note.updated_by = Some(actor.clone());
    note.updated_at = Some(Utc::now());
    note.is_updated = true;

    let mut active: ActiveModel = existing.into();
    active.notes = Set(notes);
    let product = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        NewHistoryEntry::new(
            HistoryType::NoteEdit,
            &actor,
            format!(
                "Zaktualizowano notatkę z \"{}\" na \"{}\"",
                old_content, payload.content
            ),
        )
        .product(product.id, &product.name)
        .note(payload.note_id),
    )
    .await;

    Ok(ApiResponse::success(product.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(first: &str) -> ActorSnapshot {
        ActorSnapshot {
            id: Uuid::new_v4(),
            first_name: first.into(),
            last_name: "Nowak".into(),
        }
    }

    fn widget() -> ProductModel {
        ProductModel {
            id: Uuid::new_v4(),
            owner: String::new(),
            name: "Widget".into(),
            quantity: 5,
            price: 10.0,
            created_by: actor("Anna"),
            created_at: Utc::now(),
            last_edited_by: None,
            last_edited_at: None,
            notes: ProductNotes::default(),
        }
    }

    fn note_input(content: &str) -> NoteInput {
        NoteInput {
            content: content.into(),
            created_by: None,
        }
    }

    #[test]
    fn empty_update_stamps_edit_metadata_without_diffs() {
        let existing = widget();
        let editor = actor("Bartek");
        let now = Utc::now();
        let (updated, note) =
            apply_product_changes(&existing, &UpdateProductRequest::default(), &editor, now);

        assert!(note.is_none());
        assert_eq!(updated.last_edited_by, Some(editor));
        assert_eq!(updated.last_edited_at, Some(now));
        assert!(product_changes(&existing, &updated).is_empty());
    }

    #[test]
    fn quantity_change_reads_as_polish_diff() {
        let existing = widget();
        let changes = UpdateProductRequest {
            quantity: Some(50),
            ..Default::default()
        };
        let (updated, _) = apply_product_changes(&existing, &changes, &actor("B"), Utc::now());
        assert_eq!(product_changes(&existing, &updated), vec!["ilość: 5 → 50"]);
    }

    #[test]
    fn owner_changes_are_left_out_of_the_diff() {
        let existing = widget();
        let changes = UpdateProductRequest {
            owner: Some("Magazyn B".into()),
            price: Some(12.5),
            ..Default::default()
        };
        let (updated, _) = apply_product_changes(&existing, &changes, &actor("B"), Utc::now());
        assert_eq!(updated.owner, "Magazyn B");
        assert_eq!(product_changes(&existing, &updated), vec!["cena: 10 → 12.5"]);
    }

    #[test]
    fn only_the_last_resent_note_is_appended() {
        let existing = widget();
        let editor = actor("Celina");
        let changes = UpdateProductRequest {
            notes: Some(vec![note_input("n1"), note_input("n2"), note_input("n3")]),
            ..Default::default()
        };
        let (updated, note) = apply_product_changes(&existing, &changes, &editor, Utc::now());

        assert_eq!(updated.notes.0.len(), 1);
        let note = note.unwrap();
        assert_eq!(note.content, "n3");
        assert_eq!(note.created_by, editor);
        assert!(note.is_new);
    }

    #[test]
    fn update_validation_checks_supplied_fields_only() {
        assert!(validate_changes(&UpdateProductRequest::default()).is_ok());
        let negative = UpdateProductRequest {
            quantity: Some(-1),
            ..Default::default()
        };
        assert!(matches!(
            validate_changes(&negative),
            Err(AppError::BadRequest(_))
        ));
        let blank = UpdateProductRequest {
            name: Some("  ".into()),
            ..Default::default()
        };
        assert!(validate_changes(&blank).is_err());
    }

    #[test]
    fn created_notes_need_an_author() {
        let payload = CreateProductRequest {
            name: "Widget".into(),
            quantity: 1,
            price: 2.0,
            owner: None,
            notes: Some(vec![note_input("orphan")]),
        };
        assert!(validate_new_product(&payload).is_err());

        let payload = CreateProductRequest {
            notes: Some(vec![NoteInput {
                content: "signed".into(),
                created_by: Some(actor("Anna")),
            }]),
            ..payload
        };
        assert!(validate_new_product(&payload).is_ok());
    }
}
