use std::str::FromStr;

use anyhow::Result;
use sea_orm::{ConnectionTrait, DatabaseConnection, SqlxPostgresConnector, Statement};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use crate::config::DatabaseSettings;

pub type DbPool = PgPool;
pub type OrmConn = DatabaseConnection;

const MIGRATIONS: &[(&str, &str)] = &[(
    "0001_init.sql",
    include_str!("../migrations/0001_init.sql"),
)];

/// Build the process-wide pool. No connection is opened here; the first query
/// establishes one and later requests reuse the pool.
pub fn create_pool(settings: &DatabaseSettings) -> Result<DbPool> {
    let statement_timeout = settings.socket_timeout.as_millis().to_string();
    let options = PgConnectOptions::from_str(&settings.url)?
        .options([("statement_timeout", statement_timeout)]);

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.connect_timeout)
        .idle_timeout(settings.idle_timeout)
        .connect_lazy_with(options);
    Ok(pool)
}

/// Wrap the shared pool in a SeaORM connection.
pub fn create_orm_conn(pool: &DbPool) -> OrmConn {
    SqlxPostgresConnector::from_sqlx_postgres_pool(pool.clone())
}

/// Minimal migration runner that executes the embedded SQL files in order.
/// Every statement is idempotent, so the runner is safe to call on each start.
pub async fn run_migrations(conn: &OrmConn) -> Result<()> {
    let backend = conn.get_database_backend();
    for (name, sql) in MIGRATIONS {
        tracing::debug!(migration = %name, "applying migration");
        // Postgres prepared statements cannot contain multiple commands,
        // so split the migration file and run each statement individually.
        for stmt in sql.split(';') {
            let stmt = stmt.trim();
            if stmt.is_empty() {
                continue;
            }
            let statement = format!("{stmt};");
            conn.execute(Statement::from_string(backend, statement))
                .await?;
        }
    }

    Ok(())
}
