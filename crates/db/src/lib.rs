//! Database layer for foodgram.

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use foodgram_common::{AppError, Config};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, SqlErr};
use std::time::Duration;
use tracing::log::LevelFilter;

/// Initialize database connection.
pub async fn init(config: &Config) -> Result<DatabaseConnection, AppError> {
    let mut opt = ConnectOptions::new(&config.database.url);

    opt.max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);

    Database::connect(opt)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Run pending migrations.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), AppError> {
    use sea_orm_migration::MigratorTrait;
    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// One page of a listing together with the unpaginated total.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Items on the requested page.
    pub items: Vec<T>,
    /// Number of items across all pages.
    pub total: u64,
}

/// Map a write error, turning unique-index violations into `conflict`.
///
/// Concurrent inserts of the same pair are settled by the store: the loser
/// observes the same error as a sequential duplicate.
pub(crate) fn map_write_err(err: DbErr, conflict: impl FnOnce() -> AppError) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => conflict(),
        _ => AppError::Database(err.to_string()),
    }
}
