use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::config::{DatabaseConfig, WaitConfig};

pub mod wait;

pub use wait::{wait_for_ready, WaitError};

/// Database operation errors with contextual information
#[derive(Error, Debug)]
pub enum DbError {
    /// SQL query or connection error
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Database configuration is invalid or missing
    #[error("Database configuration error: {0}. Check DATABASE_URL and connection settings.")]
    Config(String),

    /// Database never became reachable during startup
    #[error(transparent)]
    Unavailable(#[from] WaitError),
}

impl DbError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Parse a `postgresql://` URL into connect options
pub fn connect_options(url: &str) -> DbResult<PgConnectOptions> {
    PgConnectOptions::from_str(url).map_err(|e| DbError::config(format!("invalid database URL: {}", e)))
}

pub async fn create_pool(config: &DatabaseConfig) -> DbResult<PgPool> {
    let options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs));

    let pool = options.connect_with(connect_options(&config.url)?).await?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

/// Wait for the database to accept connections, then create the pool
pub async fn connect(database: &DatabaseConfig, wait: &WaitConfig) -> DbResult<PgPool> {
    let options = connect_options(&database.url)?;

    tracing::info!(
        host = options.get_host(),
        port = options.get_port(),
        max_attempts = wait.max_attempts,
        "Waiting for database"
    );
    wait_for_ready(&options, wait.max_attempts, wait.delay()).await?;

    create_pool(database).await
}

pub async fn health_check(pool: &PgPool) -> DbResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(DbError::from)
}
