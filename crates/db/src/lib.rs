//! Database layer for hasker-rs.

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use hasker_common::{AppError, Config, DatabaseConfig};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::{info, log::LevelFilter};

/// Pool options for the configured database.
#[must_use]
pub fn connect_options(config: &DatabaseConfig) -> ConnectOptions {
    let mut opt = ConnectOptions::new(&config.url);

    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .sqlx_logging(config.log_statements)
        .sqlx_logging_level(LevelFilter::Debug);

    opt
}

/// Connect to the database.
pub async fn init(config: &Config) -> Result<DatabaseConnection, AppError> {
    let db = Database::connect(connect_options(&config.database))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    info!(
        max_connections = config.database.max_connections,
        "Database connected"
    );
    Ok(db)
}

/// Bring the schema up to date.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), AppError> {
    use sea_orm_migration::MigratorTrait;
    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}
