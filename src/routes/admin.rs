use axum::Router;

use crate::{
    routes::{history, notifications, products, stats, users},
    state::AppState,
};

/// Everything under `/api/admin`; each handler rejects non-admin sessions itself.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(products::router())
        .merge(users::router())
        .merge(history::router())
        .merge(notifications::router())
        .merge(stats::router())
}
