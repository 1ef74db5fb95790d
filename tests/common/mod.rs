use chrono::{DateTime, Utc};
use crypto_pipeline::config::{DatabaseConfig, TableConfig};
use crypto_pipeline::db;
use crypto_pipeline::models::snapshot::PriceSnapshot;
use crypto_pipeline::services::snapshot_store::SnapshotStore;
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, DbErr};

/// Set up a migrated in-memory SQLite database
///
/// A single pooled connection keeps every query on the same in-memory file.
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = db::connect(&DatabaseConfig::single("sqlite::memory:")).await?;
    db::migrate(&db).await?;
    Ok(db)
}

/// Store over the default table names with the snapshot tables in place
#[allow(dead_code)]
pub async fn setup_test_store() -> Result<SnapshotStore, DbErr> {
    let store = SnapshotStore::new(setup_test_db().await?, TableConfig::default());
    store.ensure_schema().await?;
    Ok(store)
}

#[allow(dead_code)]
pub fn price(asset_id: &str, primary: Decimal, captured_at: DateTime<Utc>) -> PriceSnapshot {
    PriceSnapshot {
        asset_id: asset_id.to_string(),
        price_primary: primary,
        price_secondary: Some(primary / Decimal::from(2)),
        captured_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_setup_test_db() {
        let db = setup_test_db().await;
        assert!(db.is_ok(), "Test database connection should succeed");
    }
}
