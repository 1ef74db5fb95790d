use sea_orm_migration::prelude::*;

use crate::schema::{price_snapshots_table, price_snapshots_time_index, DEFAULT_PRICE_TABLE};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Composite primary key (asset_id, captured_at) dedupes reruns of the same upstream snapshot
        manager
            .create_table(price_snapshots_table(DEFAULT_PRICE_TABLE))
            .await?;

        // Dashboard reads are time-window scans
        manager
            .create_index(price_snapshots_time_index(DEFAULT_PRICE_TABLE))
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new(DEFAULT_PRICE_TABLE)).to_owned())
            .await
    }
}
