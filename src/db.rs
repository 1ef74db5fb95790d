//! Connection factory
//!
//! The only place a database pool is built. Callers receive the returned
//! handle by parameter.

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::config::DatabaseConfig;

pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(1)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .sqlx_logging(false);

    info!(
        max_connections = config.max_connections,
        connect_timeout_secs = config.connect_timeout.as_secs(),
        "Connecting to database"
    );

    Database::connect(options).await
}

/// Apply pending versioned migrations
pub async fn migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    info!("Running migrations...");
    migration::Migrator::up(db, None).await
}
