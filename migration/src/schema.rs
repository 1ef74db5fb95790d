//! Table definitions for the snapshot tables.
//!
//! Snapshot table names are configurable at runtime, so the statements are
//! built from a name instead of a fixed `Table` iden. The versioned
//! migrations create the default tables; the pipeline reuses the same
//! builders to ensure custom-named tables exist.

use sea_orm_migration::prelude::*;

pub const DEFAULT_PRICE_TABLE: &str = "crypto_prices";
pub const DEFAULT_MARKET_TABLE: &str = "crypto_market_snapshots";

#[derive(Iden, Clone, Copy)]
pub enum PriceSnapshot {
    AssetId,
    PricePrimary,
    PriceSecondary,
    CapturedAt,
    IngestedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum MarketSnapshot {
    AssetId,
    Symbol,
    Name,
    CurrentPrice,
    MarketCap,
    TotalVolume,
    CapturedAt,
    IngestedAt,
}

/// Price table keyed by (asset_id, captured_at)
pub fn price_snapshots_table(name: &str) -> TableCreateStatement {
    Table::create()
        .table(Alias::new(name))
        .if_not_exists()
        .col(
            ColumnDef::new(PriceSnapshot::AssetId)
                .string()
                .not_null(),
        )
        .col(
            ColumnDef::new(PriceSnapshot::PricePrimary)
                .decimal() // numeric in PostgreSQL
                .null(),
        )
        .col(
            ColumnDef::new(PriceSnapshot::PriceSecondary)
                .decimal()
                .null(),
        )
        .col(
            ColumnDef::new(PriceSnapshot::CapturedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(
            ColumnDef::new(PriceSnapshot::IngestedAt)
                .timestamp_with_time_zone()
                .not_null()
                .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
        )
        .primary_key(
            Index::create()
                .col(PriceSnapshot::AssetId)
                .col(PriceSnapshot::CapturedAt),
        )
        .to_owned()
}

pub fn price_snapshots_time_index(name: &str) -> IndexCreateStatement {
    Index::create()
        .if_not_exists()
        .name(format!("idx_{}_captured_at", name))
        .table(Alias::new(name))
        .col(PriceSnapshot::CapturedAt)
        .to_owned()
}

/// Market summary table, same natural key as the price table
pub fn market_snapshots_table(name: &str) -> TableCreateStatement {
    Table::create()
        .table(Alias::new(name))
        .if_not_exists()
        .col(
            ColumnDef::new(MarketSnapshot::AssetId)
                .string()
                .not_null(),
        )
        .col(ColumnDef::new(MarketSnapshot::Symbol).string().null())
        .col(ColumnDef::new(MarketSnapshot::Name).string().null())
        .col(
            ColumnDef::new(MarketSnapshot::CurrentPrice)
                .decimal()
                .not_null(),
        )
        .col(ColumnDef::new(MarketSnapshot::MarketCap).decimal().null())
        .col(ColumnDef::new(MarketSnapshot::TotalVolume).decimal().null())
        .col(
            ColumnDef::new(MarketSnapshot::CapturedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(
            ColumnDef::new(MarketSnapshot::IngestedAt)
                .timestamp_with_time_zone()
                .not_null()
                .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
        )
        .primary_key(
            Index::create()
                .col(MarketSnapshot::AssetId)
                .col(MarketSnapshot::CapturedAt),
        )
        .to_owned()
}

pub fn market_snapshots_time_index(name: &str) -> IndexCreateStatement {
    Index::create()
        .if_not_exists()
        .name(format!("idx_{}_captured_at", name))
        .table(Alias::new(name))
        .col(MarketSnapshot::CapturedAt)
        .to_owned()
}
