//! Snapshot persistence
//!
//! Table names are configurable, so statements are built with `sea_query`
//! against an [`Alias`] rather than through static entities. Writes use
//! `INSERT .. ON CONFLICT (asset_id, captured_at) DO NOTHING`, which keeps
//! the new rows of a batch that partly collides with stored snapshots.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use migration::schema::{self, MarketSnapshot as MarketCol, PriceSnapshot as PriceCol};
use sea_orm::sea_query::{Alias, Expr, InsertStatement, NullOrdering, OnConflict, Order, Query};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, FromQueryResult, SqlErr};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::TableConfig;
use crate::models::snapshot::{MarketRecord, MarketSnapshot, PriceRecord, PriceSnapshot, RowSet};

#[derive(Debug, Error)]
pub enum LoadError {
    /// The store rejected the batch on a uniqueness constraint
    #[error("unique constraint violation: {0}")]
    Conflict(String),
    #[error("invalid insert statement: {0}")]
    Statement(String),
    #[error("database error: {0}")]
    Database(DbErr),
}

impl From<DbErr> for LoadError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => LoadError::Conflict(msg),
            _ => LoadError::Database(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LoadOutcome {
    pub attempted: u64,
    pub inserted: u64,
    /// Rows whose natural key was already stored
    pub skipped: u64,
}

/// Persists one normalized batch
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, rows: &RowSet) -> Result<LoadOutcome, LoadError>;
}

#[derive(Clone)]
pub struct SnapshotStore {
    db: DatabaseConnection,
    tables: TableConfig,
}

impl SnapshotStore {
    pub fn new(db: DatabaseConnection, tables: TableConfig) -> Self {
        Self { db, tables }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn tables(&self) -> &TableConfig {
        &self.tables
    }

    /// Idempotent `CREATE TABLE IF NOT EXISTS` for the configured tables
    pub async fn ensure_schema(&self) -> Result<(), DbErr> {
        let backend = self.db.get_database_backend();

        self.db
            .execute(backend.build(&schema::price_snapshots_table(&self.tables.price_table)))
            .await?;
        self.db
            .execute(backend.build(&schema::price_snapshots_time_index(&self.tables.price_table)))
            .await?;
        self.db
            .execute(backend.build(&schema::market_snapshots_table(&self.tables.market_table)))
            .await?;
        self.db
            .execute(backend.build(&schema::market_snapshots_time_index(&self.tables.market_table)))
            .await?;

        debug!(
            price_table = %self.tables.price_table,
            market_table = %self.tables.market_table,
            "Snapshot tables ensured"
        );
        Ok(())
    }

    pub async fn insert_prices(&self, rows: &[PriceSnapshot]) -> Result<LoadOutcome, LoadError> {
        if rows.is_empty() {
            return Ok(LoadOutcome::default());
        }

        let ingested_at = Utc::now();
        let mut insert = Query::insert();
        insert
            .into_table(Alias::new(&self.tables.price_table))
            .columns([
                PriceCol::AssetId,
                PriceCol::PricePrimary,
                PriceCol::PriceSecondary,
                PriceCol::CapturedAt,
                PriceCol::IngestedAt,
            ])
            .on_conflict(
                OnConflict::columns([PriceCol::AssetId, PriceCol::CapturedAt])
                    .do_nothing()
                    .to_owned(),
            );

        for row in rows {
            insert
                .values([
                    row.asset_id.clone().into(),
                    Some(row.price_primary).into(),
                    row.price_secondary.into(),
                    row.captured_at.into(),
                    ingested_at.into(),
                ])
                .map_err(|e| LoadError::Statement(e.to_string()))?;
        }

        self.execute_insert(&self.tables.price_table, rows.len() as u64, &insert)
            .await
    }

    pub async fn insert_markets(&self, rows: &[MarketSnapshot]) -> Result<LoadOutcome, LoadError> {
        if rows.is_empty() {
            return Ok(LoadOutcome::default());
        }

        let ingested_at = Utc::now();
        let mut insert = Query::insert();
        insert
            .into_table(Alias::new(&self.tables.market_table))
            .columns([
                MarketCol::AssetId,
                MarketCol::Symbol,
                MarketCol::Name,
                MarketCol::CurrentPrice,
                MarketCol::MarketCap,
                MarketCol::TotalVolume,
                MarketCol::CapturedAt,
                MarketCol::IngestedAt,
            ])
            .on_conflict(
                OnConflict::columns([MarketCol::AssetId, MarketCol::CapturedAt])
                    .do_nothing()
                    .to_owned(),
            );

        for row in rows {
            insert
                .values([
                    row.asset_id.clone().into(),
                    row.symbol.clone().into(),
                    row.name.clone().into(),
                    row.current_price.into(),
                    row.market_cap.into(),
                    row.total_volume.into(),
                    row.captured_at.into(),
                    ingested_at.into(),
                ])
                .map_err(|e| LoadError::Statement(e.to_string()))?;
        }

        self.execute_insert(&self.tables.market_table, rows.len() as u64, &insert)
            .await
    }

    async fn execute_insert(
        &self,
        table: &str,
        attempted: u64,
        insert: &InsertStatement,
    ) -> Result<LoadOutcome, LoadError> {
        let backend = self.db.get_database_backend();
        let result = self.db.execute(backend.build(insert)).await?;

        let inserted = result.rows_affected();
        let outcome = LoadOutcome {
            attempted,
            inserted,
            skipped: attempted.saturating_sub(inserted),
        };

        if outcome.skipped > 0 {
            info!(
                table = %table,
                skipped = outcome.skipped,
                inserted = outcome.inserted,
                "Some snapshots already stored (duplicates skipped)"
            );
        } else {
            info!(table = %table, inserted = outcome.inserted, "Loaded snapshots");
        }

        Ok(outcome)
    }

    /// Most recent price rows, newest first
    pub async fn latest_prices(&self, limit: u64) -> Result<Vec<PriceRecord>, DbErr> {
        let stmt = Query::select()
            .columns(price_columns())
            .from(Alias::new(&self.tables.price_table))
            .order_by(PriceCol::CapturedAt, Order::Desc)
            .order_by(PriceCol::AssetId, Order::Asc)
            .limit(limit)
            .to_owned();

        let backend = self.db.get_database_backend();
        PriceRecord::find_by_statement(backend.build(&stmt))
            .all(&self.db)
            .await
    }

    /// Price rows captured at or after `since`, oldest first
    pub async fn prices_since(
        &self,
        since: DateTime<Utc>,
        asset_id: Option<&str>,
    ) -> Result<Vec<PriceRecord>, DbErr> {
        let mut stmt = Query::select();
        stmt.columns(price_columns())
            .from(Alias::new(&self.tables.price_table))
            .and_where(Expr::col(PriceCol::CapturedAt).gte(since))
            .order_by(PriceCol::CapturedAt, Order::Asc)
            .order_by(PriceCol::AssetId, Order::Asc);
        if let Some(asset_id) = asset_id {
            stmt.and_where(Expr::col(PriceCol::AssetId).eq(asset_id));
        }

        let backend = self.db.get_database_backend();
        PriceRecord::find_by_statement(backend.build(&stmt))
            .all(&self.db)
            .await
    }

    /// Most recent market rows, newest first, larger market caps first within a snapshot
    pub async fn latest_markets(&self, limit: u64) -> Result<Vec<MarketRecord>, DbErr> {
        let stmt = Query::select()
            .columns([
                MarketCol::AssetId,
                MarketCol::Symbol,
                MarketCol::Name,
                MarketCol::CurrentPrice,
                MarketCol::MarketCap,
                MarketCol::TotalVolume,
                MarketCol::CapturedAt,
                MarketCol::IngestedAt,
            ])
            .from(Alias::new(&self.tables.market_table))
            .order_by(MarketCol::IngestedAt, Order::Desc)
            .order_by_with_nulls(MarketCol::MarketCap, Order::Desc, NullOrdering::Last)
            .limit(limit)
            .to_owned();

        let backend = self.db.get_database_backend();
        MarketRecord::find_by_statement(backend.build(&stmt))
            .all(&self.db)
            .await
    }

    pub async fn count_prices(&self) -> Result<u64, DbErr> {
        self.count(&self.tables.price_table).await
    }

    pub async fn count_markets(&self) -> Result<u64, DbErr> {
        self.count(&self.tables.market_table).await
    }

    async fn count(&self, table: &str) -> Result<u64, DbErr> {
        #[derive(FromQueryResult)]
        struct RowCount {
            total: i64,
        }

        let stmt = Query::select()
            .expr_as(Expr::cust("COUNT(*)"), Alias::new("total"))
            .from(Alias::new(table))
            .to_owned();

        let backend = self.db.get_database_backend();
        let count = RowCount::find_by_statement(backend.build(&stmt))
            .one(&self.db)
            .await?
            .map(|r| r.total.max(0) as u64)
            .unwrap_or(0);

        Ok(count)
    }
}

fn price_columns() -> [PriceCol; 5] {
    [
        PriceCol::AssetId,
        PriceCol::PricePrimary,
        PriceCol::PriceSecondary,
        PriceCol::CapturedAt,
        PriceCol::IngestedAt,
    ]
}

#[async_trait]
impl Loader for SnapshotStore {
    async fn load(&self, rows: &RowSet) -> Result<LoadOutcome, LoadError> {
        match rows {
            RowSet::Prices(rows) => self.insert_prices(rows).await,
            RowSet::Markets(rows) => self.insert_markets(rows).await,
        }
    }
}
