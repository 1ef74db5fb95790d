//! Raw API JSON to normalized snapshot rows
//!
//! Two input shapes are accepted:
//! - an object keyed by asset id, each value holding per-currency prices and
//!   a `last_updated_at` epoch-seconds marker (`/simple/price`)
//! - an array of market summary objects (`/coins/markets`)
//!
//! Rows missing an essential field (a configured price or the timestamp) are
//! dropped and counted, never emitted with a null price.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::models::snapshot::{MarketSnapshot, PriceSnapshot, RowSet};

const LAST_UPDATED_AT: &str = "last_updated_at";

#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutput {
    pub rows: RowSet,
    /// Rows discarded for missing essential fields
    pub dropped: usize,
}

impl TransformOutput {
    fn empty() -> Self {
        Self {
            rows: RowSet::Prices(Vec::new()),
            dropped: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transformer {
    primary_currency: String,
    secondary_currency: Option<String>,
}

impl Transformer {
    pub fn new(primary_currency: impl Into<String>, secondary_currency: Option<String>) -> Self {
        Self {
            primary_currency: primary_currency.into().to_lowercase(),
            secondary_currency: secondary_currency.map(|c| c.to_lowercase()),
        }
    }

    pub fn transform(&self, raw: &Value) -> TransformOutput {
        let output = match raw {
            Value::Object(map) if map.is_empty() => TransformOutput::empty(),
            Value::Object(map) => self.transform_price_map(map),
            Value::Array(items) if items.is_empty() => TransformOutput {
                rows: RowSet::Markets(Vec::new()),
                dropped: 0,
            },
            Value::Array(items) => transform_market_list(items),
            Value::Null => TransformOutput::empty(),
            other => {
                warn!(kind = json_kind(other), "Unrecognized payload shape, nothing to transform");
                TransformOutput::empty()
            }
        };

        if output.dropped > 0 {
            warn!(
                dropped = output.dropped,
                kept = output.rows.len(),
                "Dropped rows with missing price or timestamp"
            );
        }
        debug!(rows = output.rows.len(), "Transformed payload");

        output
    }

    fn transform_price_map(&self, map: &Map<String, Value>) -> TransformOutput {
        let mut rows = Vec::with_capacity(map.len());
        let mut dropped = 0;

        for (asset_id, entry) in map {
            match self.price_row(asset_id, entry) {
                Some(row) => rows.push(row),
                None => {
                    debug!(asset_id = %asset_id, "Incomplete price entry");
                    dropped += 1;
                }
            }
        }

        TransformOutput {
            rows: RowSet::Prices(rows),
            dropped,
        }
    }

    fn price_row(&self, asset_id: &str, entry: &Value) -> Option<PriceSnapshot> {
        let fields = entry.as_object()?;

        let price_primary = fields.get(&self.primary_currency).and_then(json_decimal)?;
        let price_secondary = match &self.secondary_currency {
            Some(currency) => Some(fields.get(currency).and_then(json_decimal)?),
            None => None,
        };
        let captured_at = fields
            .get(LAST_UPDATED_AT)
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))?;

        Some(PriceSnapshot {
            asset_id: asset_id.to_string(),
            price_primary,
            price_secondary,
            captured_at,
        })
    }
}

fn transform_market_list(items: &[Value]) -> TransformOutput {
    let mut rows = Vec::with_capacity(items.len());
    let mut dropped = 0;

    for item in items {
        match market_row(item) {
            Some(row) => rows.push(row),
            None => dropped += 1,
        }
    }

    TransformOutput {
        rows: RowSet::Markets(rows),
        dropped,
    }
}

fn market_row(item: &Value) -> Option<MarketSnapshot> {
    let fields = item.as_object()?;

    let asset_id = fields.get("id").and_then(Value::as_str)?.to_string();
    let current_price = fields.get("current_price").and_then(json_decimal)?;
    let captured_at = fields
        .get("last_updated")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))?;

    let text = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_string);

    Some(MarketSnapshot {
        asset_id,
        symbol: text("symbol"),
        name: text("name"),
        current_price,
        market_cap: fields.get("market_cap").and_then(json_decimal),
        total_volume: fields.get("total_volume").and_then(json_decimal),
        captured_at,
    })
}

/// Exact decimal from a JSON number (or numeric string); `None` for null
fn json_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
                .or_else(|| n.as_f64().and_then(Decimal::from_f64_retain))
        }
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
