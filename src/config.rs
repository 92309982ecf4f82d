use std::{env, str::FromStr, time::Duration};

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: DatabaseSettings,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub run_migrations: bool,
}

/// Pool sizing and the driver-level timeouts that bound every request's database work.
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout: Duration,
    pub socket_timeout: Duration,
    pub idle_timeout: Duration,
}

impl DatabaseSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            connect_timeout: Duration::from_secs(10),
            socket_timeout: Duration::from_secs(45),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env_or("APP_PORT", 3000);

        let defaults = DatabaseSettings::new(database_url);
        let database = DatabaseSettings {
            max_connections: env_or("DB_MAX_CONNECTIONS", defaults.max_connections),
            connect_timeout: env_secs("DB_CONNECT_TIMEOUT_SECS", defaults.connect_timeout),
            socket_timeout: env_secs("DB_SOCKET_TIMEOUT_SECS", defaults.socket_timeout),
            idle_timeout: env_secs("DB_IDLE_TIMEOUT_SECS", defaults.idle_timeout),
            ..defaults
        };

        Ok(Self {
            host,
            port,
            database,
            jwt_secret,
            session_ttl_hours: env_or("SESSION_TTL_HOURS", 24),
            run_migrations: env_or("RUN_MIGRATIONS", true),
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
