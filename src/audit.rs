use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait};

use crate::{
    db::OrmConn,
    entity::history::{self, Entity as History},
    error::AppResult,
    models::NewHistoryEntry,
};

/// Append one history row and return it.
pub async fn log_history<C>(conn: &C, entry: NewHistoryEntry) -> AppResult<history::Model>
where
    C: ConnectionTrait,
{
    let model = entry.into_active_model().insert(conn).await?;
    Ok(model)
}

/// Best-effort append used alongside mutations. A failed write is logged and
/// swallowed; it never undoes or blocks the change it documents.
pub async fn record(conn: &OrmConn, entry: NewHistoryEntry) {
    let kind = entry.kind;
    if let Err(err) = log_history(conn, entry).await {
        tracing::warn!(error = %err, history_type = %kind, "history write failed");
    }
}

/// Insert many rows in fixed-size batches.
pub async fn insert_batched<C>(
    conn: &C,
    entries: Vec<NewHistoryEntry>,
    batch_size: usize,
) -> AppResult<usize>
where
    C: ConnectionTrait,
{
    let total = entries.len();
    let mut pending = entries.into_iter().peekable();
    while pending.peek().is_some() {
        let batch: Vec<history::ActiveModel> = pending
            .by_ref()
            .take(batch_size.max(1))
            .map(NewHistoryEntry::into_active_model)
            .collect();
        History::insert_many(batch).exec(conn).await?;
    }
    Ok(total)
}
