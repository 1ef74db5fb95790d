//! Snapshot rows, on their way into the store and back out of it

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

/// One asset price at the source's last-updated time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub asset_id: String,
    pub price_primary: Decimal,
    /// `None` only when a single currency is configured
    pub price_secondary: Option<Decimal>,
    pub captured_at: DateTime<Utc>,
}

/// Wider market summary row from `/coins/markets`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub asset_id: String,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub current_price: Decimal,
    pub market_cap: Option<Decimal>,
    pub total_volume: Option<Decimal>,
    pub captured_at: DateTime<Utc>,
}

/// Normalized output of one transform step
#[derive(Debug, Clone, PartialEq)]
pub enum RowSet {
    Prices(Vec<PriceSnapshot>),
    Markets(Vec<MarketSnapshot>),
}

impl RowSet {
    pub fn len(&self) -> usize {
        match self {
            RowSet::Prices(rows) => rows.len(),
            RowSet::Markets(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stored price row as read back by the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, FromQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct PriceRecord {
    pub asset_id: String,
    pub price_primary: Option<Decimal>,
    pub price_secondary: Option<Decimal>,
    pub captured_at: DateTime<Utc>,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct MarketRecord {
    pub asset_id: String,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub current_price: Decimal,
    pub market_cap: Option<Decimal>,
    pub total_volume: Option<Decimal>,
    pub captured_at: DateTime<Utc>,
    pub ingested_at: DateTime<Utc>,
}
