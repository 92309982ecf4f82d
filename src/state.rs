use std::sync::Arc;

use crate::{
    config::{AppConfig, DatabaseSettings},
    db::{DbPool, OrmConn, create_orm_conn, create_pool},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub auth: Arc<AuthSettings>,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
}

impl AppState {
    pub fn new(database: &DatabaseSettings, auth: AuthSettings) -> anyhow::Result<Self> {
        let pool = create_pool(database)?;
        let orm = create_orm_conn(&pool);
        Ok(Self {
            pool,
            orm,
            auth: Arc::new(auth),
        })
    }

    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        Self::new(
            &config.database,
            AuthSettings {
                jwt_secret: config.jwt_secret.clone(),
                session_ttl_hours: config.session_ttl_hours,
            },
        )
    }
}
