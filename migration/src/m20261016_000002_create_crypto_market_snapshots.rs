use sea_orm_migration::prelude::*;

use crate::schema::{market_snapshots_table, market_snapshots_time_index, DEFAULT_MARKET_TABLE};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(market_snapshots_table(DEFAULT_MARKET_TABLE))
            .await?;

        manager
            .create_index(market_snapshots_time_index(DEFAULT_MARKET_TABLE))
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new(DEFAULT_MARKET_TABLE)).to_owned())
            .await
    }
}
