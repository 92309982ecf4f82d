use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    db::OrmConn,
    dto::users::{CreateUserRequest, UpdateUserRequest, UserEnvelope, UserQuery},
    entity::users::{self, ActiveModel, Column, Entity as Users},
    error::{AppError, AppResult},
    middleware::auth::{Session, ensure_admin},
    models::{
        ActorSnapshot, HistoryMetadata, HistoryType, NewHistoryEntry, ONLINE_WINDOW_MINUTES, User,
    },
    response::{ApiResponse, MessageData, Paginated},
    routes::params::Pagination,
    services::{contains_pattern, search_term},
    state::AppState,
};

/// Login gate. Inactive accounts are reported before unapproved ones.
pub fn can_authenticate(user: &users::Model) -> AppResult<()> {
    if !user.active {
        return Err(AppError::AccountInactive);
    }
    if !user.approved {
        return Err(AppError::PendingApproval);
    }
    Ok(())
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".into())
}

/// Map a unique-index violation to the field that clashed.
pub(crate) fn unique_violation(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) if detail.contains("username") => {
            AppError::Conflict("Username already exists".into())
        }
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Email already exists".into())
        }
        _ => AppError::OrmError(err),
    }
}

pub(crate) async fn ensure_unique_identity(
    conn: &OrmConn,
    email: &str,
    username: Option<&str>,
    except: Option<Uuid>,
) -> AppResult<()> {
    let mut clash = Condition::any().add(Column::Email.eq(email));
    if let Some(username) = username {
        clash = clash.add(Column::Username.eq(username));
    }
    let mut finder = Users::find().filter(clash);
    if let Some(id) = except {
        finder = finder.filter(Column::Id.ne(id));
    }

    if let Some(existing) = finder.one(conn).await? {
        if existing.email == email {
            return Err(AppError::Conflict("Email already exists".into()));
        }
        return Err(AppError::Conflict("Username already exists".into()));
    }
    Ok(())
}

pub async fn list_users(
    state: &AppState,
    session: &Session,
    query: UserQuery,
) -> AppResult<ApiResponse<Paginated<User>>> {
    ensure_admin(session)?;
    let (page, limit, offset) = Pagination::new(query.page, query.limit).normalize();
    let now = Utc::now();

    // Reading the list keeps recently seen users online.
    let refreshed = Users::update_many()
        .col_expr(Column::LastActive, Expr::value(now))
        .filter(Column::LastActive.gt(now - Duration::minutes(ONLINE_WINDOW_MINUTES)))
        .exec(&state.orm)
        .await?;
    tracing::debug!(refreshed = refreshed.rows_affected, "refreshed online users");

    let mut condition = Condition::all();
    if let Some(search) = search_term(query.search.as_ref()) {
        let pattern = contains_pattern(search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::FirstName).ilike(pattern.clone()))
                .add(Expr::col(Column::LastName).ilike(pattern.clone()))
                .add(Expr::col(Column::Email).ilike(pattern)),
        );
    }

    let filtered = Users::find().filter(condition);
    let items_query = filtered
        .clone()
        .order_by_desc(Column::CreatedAt)
        .order_by_asc(Column::Id)
        .limit(limit)
        .offset(offset)
        .all(&state.orm);
    let count_query = filtered.count(&state.orm);
    let (items, total) = tokio::try_join!(items_query, count_query)?;

    let items = items
        .into_iter()
        .map(|model| User::from_model(model, now))
        .collect();
    Ok(ApiResponse::success(Paginated::new(items, total, page, limit)))
}

pub async fn create_user(
    state: &AppState,
    session: &Session,
    payload: CreateUserRequest,
) -> AppResult<ApiResponse<UserEnvelope>> {
    ensure_admin(session)?;
    payload.validate()?;
    if payload.first_name.trim().is_empty() || payload.last_name.trim().is_empty() {
        return Err(AppError::BadRequest("Missing required fields".into()));
    }
    let username = payload.username.filter(|u| !u.trim().is_empty());
    ensure_unique_identity(&state.orm, &payload.email, username.as_deref(), None).await?;

    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username),
        first_name: Set(payload.first_name),
        last_name: Set(payload.last_name),
        email: Set(payload.email),
        password_hash: Set(None),
        group: Set(payload.group.unwrap_or_default()),
        active: Set(true),
        approved: Set(false),
        approved_by: Set(None),
        approved_at: Set(None),
        last_active: Set(None),
        created_at: Set(Utc::now()),
    };
    let user = active.insert(&state.orm).await.map_err(unique_violation)?;
    tracing::info!(user_id = %user.id, "user created by admin");

    let metadata = HistoryMetadata::from([("email".to_string(), user.email.clone().into())]);
    audit::record(
        &state.orm,
        NewHistoryEntry::new(
            HistoryType::UserCreate,
            &session.actor(),
            format!("Utworzono użytkownika {} {}", user.first_name, user.last_name),
        )
        .metadata(metadata),
    )
    .await;

    Ok(ApiResponse::success(UserEnvelope {
        message: "User created successfully".into(),
        user: user.into(),
    }))
}

fn non_blank(value: &Option<String>) -> Option<&String> {
    value.as_ref().filter(|v| !v.trim().is_empty())
}

/// Apply an admin edit in memory. Approval stamps or clears the approver,
/// deactivation clears `lastActive`, blank names are ignored.
pub fn apply_user_changes(
    existing: &users::Model,
    changes: &UpdateUserRequest,
    actor: &ActorSnapshot,
    now: DateTime<Utc>,
) -> users::Model {
    let mut updated = existing.clone();

    if let Some(approved) = changes.approved.filter(|a| *a != existing.approved) {
        updated.approved = approved;
        if approved {
            updated.approved_by = Some(actor.clone());
            updated.approved_at = Some(now);
        } else {
            updated.approved_by = None;
            updated.approved_at = None;
        }
    }

    if let Some(active) = changes.active {
        updated.active = active;
        if !active {
            updated.last_active = None;
        }
    }
    if let Some(group) = changes.group {
        updated.group = group;
    }
    if let Some(first_name) = non_blank(&changes.first_name) {
        updated.first_name = first_name.clone();
    }
    if let Some(last_name) = non_blank(&changes.last_name) {
        updated.last_name = last_name.clone();
    }
    if let Some(email) = non_blank(&changes.email) {
        updated.email = email.clone();
    }

    updated
}

fn status_label(active: bool) -> &'static str {
    if active { "aktywny" } else { "nieaktywny" }
}

/// History produced by an admin edit: approval changes get their own entry,
/// everything else is batched into one `user_update`.
pub fn user_change_entries(
    before: &users::Model,
    after: &users::Model,
    actor: &ActorSnapshot,
) -> Vec<NewHistoryEntry> {
    let mut entries = Vec::new();

    if before.approved != after.approved {
        let (kind, details) = if after.approved {
            (
                HistoryType::UserUpdate,
                format!(
                    "Zatwierdzono konto użytkownika {} {}",
                    after.first_name, after.last_name
                ),
            )
        } else {
            (
                HistoryType::UserBan,
                format!(
                    "Odrzucono konto użytkownika {} {}",
                    after.first_name, after.last_name
                ),
            )
        };
        entries.push(NewHistoryEntry::new(kind, actor, details));
    }

    let mut changes = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    if before.active != after.active {
        changes.push(format!(
            "status: {} → {}",
            status_label(before.active),
            status_label(after.active)
        ));
        fields.push("active".into());
    }
    if before.group != after.group {
        changes.push(format!("grupa: {} → {}", before.group, after.group));
        fields.push("group".into());
    }
    if before.first_name != after.first_name || before.last_name != after.last_name {
        changes.push(format!(
            "imię i nazwisko: {} {} → {} {}",
            before.first_name, before.last_name, after.first_name, after.last_name
        ));
        if before.first_name != after.first_name {
            fields.push("firstName".into());
        }
        if before.last_name != after.last_name {
            fields.push("lastName".into());
        }
    }
    if before.email != after.email {
        changes.push(format!("email: {} → {}", before.email, after.email));
        fields.push("email".into());
    }

    if !changes.is_empty() {
        let metadata = HistoryMetadata::from([("affectedFields".to_string(), fields.into())]);
        entries.push(
            NewHistoryEntry::new(
                HistoryType::UserUpdate,
                actor,
                format!("Zaktualizowano użytkownika: {}", changes.join(", ")),
            )
            .metadata(metadata),
        );
    }

    entries
}

pub async fn update_user(
    state: &AppState,
    session: &Session,
    id: Uuid,
    changes: UpdateUserRequest,
) -> AppResult<ApiResponse<UserEnvelope>> {
    ensure_admin(session)?;
    changes.validate()?;

    let existing = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(user_not_found)?;

    if let Some(email) = non_blank(&changes.email).filter(|e| **e != existing.email) {
        ensure_unique_identity(&state.orm, email, None, Some(existing.id)).await?;
    }

    let actor = session.actor();
    let updated = apply_user_changes(&existing, &changes, &actor, Utc::now());

    let mut active: ActiveModel = existing.clone().into();
    active.approved = Set(updated.approved);
    active.approved_by = Set(updated.approved_by.clone());
    active.approved_at = Set(updated.approved_at);
    active.active = Set(updated.active);
    active.last_active = Set(updated.last_active);
    active.group = Set(updated.group);
    active.first_name = Set(updated.first_name.clone());
    active.last_name = Set(updated.last_name.clone());
    active.email = Set(updated.email.clone());
    let user = active.update(&state.orm).await.map_err(unique_violation)?;
    tracing::info!(user_id = %user.id, "user updated");

    for entry in user_change_entries(&existing, &user, &actor) {
        audit::record(&state.orm, entry).await;
    }

    Ok(ApiResponse::success(UserEnvelope {
        message: "User updated successfully".into(),
        user: user.into(),
    }))
}

pub async fn delete_user(
    state: &AppState,
    session: &Session,
    id: Uuid,
) -> AppResult<ApiResponse<MessageData>> {
    ensure_admin(session)?;
    let user = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(user_not_found)?;

    Users::delete_by_id(id).exec(&state.orm).await?;
    tracing::info!(user_id = %id, "user deleted");

    audit::record(
        &state.orm,
        NewHistoryEntry::new(
            HistoryType::UserDelete,
            &session.actor(),
            format!("Usunięto użytkownika {} {}", user.first_name, user.last_name),
        ),
    )
    .await;

    Ok(ApiResponse::success(MessageData::new("User deleted successfully")))
}

/// Record the moment a user was last seen.
pub async fn touch_last_active(conn: &OrmConn, id: Uuid) -> AppResult<()> {
    Users::update_many()
        .col_expr(Column::LastActive, Expr::value(Utc::now()))
        .filter(Column::Id.eq(id))
        .exec(conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MetadataValue, UserGroup};

    fn pending_user() -> users::Model {
        users::Model {
            id: Uuid::new_v4(),
            username: Some("jkowalski".into()),
            first_name: "Jan".into(),
            last_name: "Kowalski".into(),
            email: "jan@example.com".into(),
            password_hash: None,
            group: UserGroup::User,
            active: true,
            approved: false,
            approved_by: None,
            approved_at: None,
            last_active: Some(Utc::now()),
            created_at: Utc::now(),
        }
    }

    fn admin() -> ActorSnapshot {
        ActorSnapshot {
            id: Uuid::new_v4(),
            first_name: "Ada".into(),
            last_name: "Admin".into(),
        }
    }

    #[test]
    fn authentication_distinguishes_inactive_from_pending() {
        let mut user = pending_user();
        assert!(matches!(can_authenticate(&user), Err(AppError::PendingApproval)));
        user.active = false;
        assert!(matches!(can_authenticate(&user), Err(AppError::AccountInactive)));
        user.active = true;
        user.approved = true;
        assert!(can_authenticate(&user).is_ok());
    }

    #[test]
    fn approval_stamps_approver_and_gets_its_own_entry() {
        let before = pending_user();
        let actor = admin();
        let now = Utc::now();
        let changes = UpdateUserRequest {
            approved: Some(true),
            ..Default::default()
        };
        let after = apply_user_changes(&before, &changes, &actor, now);

        assert_eq!(after.approved_by, Some(actor.clone()));
        assert_eq!(after.approved_at, Some(now));

        let entries = user_change_entries(&before, &after, &actor);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, HistoryType::UserUpdate);
        assert_eq!(
            entries[0].details,
            "Zatwierdzono konto użytkownika Jan Kowalski"
        );
    }

    #[test]
    fn revoking_approval_clears_approver_and_logs_a_ban() {
        let mut before = pending_user();
        before.approved = true;
        before.approved_by = Some(admin());
        before.approved_at = Some(Utc::now());
        let actor = admin();
        let changes = UpdateUserRequest {
            approved: Some(false),
            ..Default::default()
        };
        let after = apply_user_changes(&before, &changes, &actor, Utc::now());

        assert!(after.approved_by.is_none());
        assert!(after.approved_at.is_none());
        let entries = user_change_entries(&before, &after, &actor);
        assert_eq!(entries[0].kind, HistoryType::UserBan);
    }

    #[test]
    fn field_changes_are_batched_with_affected_fields() {
        let before = pending_user();
        let actor = admin();
        let changes = UpdateUserRequest {
            active: Some(false),
            group: Some(UserGroup::Admin),
            email: Some("jan.k@example.com".into()),
            first_name: Some(String::new()),
            ..Default::default()
        };
        let after = apply_user_changes(&before, &changes, &actor, Utc::now());
        assert!(after.last_active.is_none());
        assert_eq!(after.first_name, "Jan");

        let entries = user_change_entries(&before, &after, &actor);
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].details,
            "Zaktualizowano użytkownika: status: aktywny → nieaktywny, grupa: user → admin, email: jan@example.com → jan.k@example.com"
        );
        let fields = entries[0].metadata.as_ref().unwrap().get("affectedFields");
        assert_eq!(
            fields,
            Some(&MetadataValue::List(vec![
                "active".into(),
                "group".into(),
                "email".into()
            ]))
        );
    }

    #[test]
    fn no_change_means_no_history() {
        let before = pending_user();
        let actor = admin();
        let after = apply_user_changes(&before, &UpdateUserRequest::default(), &actor, Utc::now());
        assert!(user_change_entries(&before, &after, &actor).is_empty());
    }
}
