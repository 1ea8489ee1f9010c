//! Event store connection configuration.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Default size of the connection pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default time to wait for a pooled connection.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised while configuring or connecting the store.
#[derive(Debug, Error)]
pub enum StoreConfigError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connecting or migrating failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Applying migrations failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Settings for the PostgreSQL connection pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Maximum pooled connections.
    pub max_connections: u32,
    /// How long to wait for a free connection.
    pub acquire_timeout: Duration,
}

impl StoreConfig {
    /// Creates a configuration with default pool settings.
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }

    /// Reads `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS` and
    /// `DATABASE_ACQUIRE_TIMEOUT_MS` from the environment.
    ///
    /// # Errors
    ///
    /// Returns `StoreConfigError::Config` if `DATABASE_URL` is unset or a
    /// numeric setting does not parse.
    pub fn from_env() -> Result<Self, StoreConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`StoreConfig::from_env`].
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, StoreConfigError> {
        let database_url = lookup("DATABASE_URL").ok_or_else(|| {
            StoreConfigError::Config("DATABASE_URL environment variable must be set".into())
        })?;
        let mut config = Self::new(database_url);

        if let Some(raw) = lookup("DATABASE_MAX_CONNECTIONS") {
            config.max_connections = raw.parse().map_err(|e| {
                StoreConfigError::Config(format!("DATABASE_MAX_CONNECTIONS must be a valid u32: {e}"))
            })?;
        }
        if let Some(raw) = lookup("DATABASE_ACQUIRE_TIMEOUT_MS") {
            let millis: u64 = raw.parse().map_err(|e| {
                StoreConfigError::Config(format!(
                    "DATABASE_ACQUIRE_TIMEOUT_MS must be a valid u64: {e}"
                ))
            })?;
            config.acquire_timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }

    /// Opens a connection pool.
    ///
    /// # Errors
    ///
    /// Returns `StoreConfigError::Database` if the database is unreachable.
    pub async fn connect(&self) -> Result<PgPool, StoreConfigError> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .connect(&self.database_url)
            .await?;
        Ok(pool)
    }
}

/// Applies the bundled schema migrations.
///
/// # Errors
///
/// Returns `StoreConfigError::Migration` if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreConfigError> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}
