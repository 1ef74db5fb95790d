//! Per-asset insights over a window of stored price rows
//!
//! Latest price against the window average (trend) and the min/max range
//! (volatility), in the primary currency.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::snapshot::PriceRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSummary {
    pub asset_id: String,
    pub last_update: DateTime<Utc>,
    pub current_price: Decimal,
    pub average_price: Decimal,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub price_swing: Decimal,
    pub samples: usize,
    pub trend: Trend,
}

/// Summaries ordered by asset id; rows without a primary price are ignored
pub fn summarize(records: &[PriceRecord]) -> Vec<AssetSummary> {
    let mut by_asset: BTreeMap<&str, Vec<(DateTime<Utc>, Decimal)>> = BTreeMap::new();
    for record in records {
        if let Some(price) = record.price_primary {
            by_asset
                .entry(record.asset_id.as_str())
                .or_default()
                .push((record.captured_at, price));
        }
    }

    by_asset
        .into_iter()
        .filter_map(|(asset_id, points)| {
            let (last_update, current_price) = *points.iter().max_by_key(|(at, _)| *at)?;
            let min_price = points.iter().map(|(_, p)| *p).min()?;
            let max_price = points.iter().map(|(_, p)| *p).max()?;
            let total: Decimal = points.iter().map(|(_, p)| *p).sum();
            let average_price = (total / Decimal::from(points.len())).round_dp(8);

            let trend = match current_price.cmp(&average_price) {
                std::cmp::Ordering::Greater => Trend::Up,
                std::cmp::Ordering::Less => Trend::Down,
                std::cmp::Ordering::Equal => Trend::Flat,
            };

            Some(AssetSummary {
                asset_id: asset_id.to_string(),
                last_update,
                current_price,
                average_price,
                min_price,
                max_price,
                price_swing: max_price - min_price,
                samples: points.len(),
                trend,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(asset_id: &str, secs: i64, price: Option<Decimal>) -> PriceRecord {
        let at = DateTime::from_timestamp(secs, 0).unwrap();
        PriceRecord {
            asset_id: asset_id.to_string(),
            price_primary: price,
            price_secondary: None,
            captured_at: at,
            ingested_at: at,
        }
    }

    #[test]
    fn test_trend_and_swing() {
        let records = vec![
            record("bitcoin", 300, Some(dec!(51000))),
            record("bitcoin", 100, Some(dec!(49000))),
            record("bitcoin", 200, Some(dec!(50000))),
            record("ethereum", 100, Some(dec!(3200))),
            record("ethereum", 200, Some(dec!(2800))),
        ];

        let summaries = summarize(&records);
        assert_eq!(summaries.len(), 2);

        let btc = &summaries[0];
        assert_eq!(btc.asset_id, "bitcoin");
        assert_eq!(btc.current_price, dec!(51000));
        assert_eq!(btc.average_price, dec!(50000));
        assert_eq!(btc.price_swing, dec!(2000));
        assert_eq!(btc.samples, 3);
        assert_eq!(btc.trend, Trend::Up);
        assert_eq!(btc.last_update, DateTime::from_timestamp(300, 0).unwrap());

        let eth = &summaries[1];
        assert_eq!(eth.min_price, dec!(2800));
        assert_eq!(eth.max_price, dec!(3200));
        assert_eq!(eth.trend, Trend::Down);
    }

    #[test]
    fn test_single_sample_is_flat() {
        let summaries = summarize(&[record("solana", 1, Some(dec!(140)))]);
        assert_eq!(summaries[0].trend, Trend::Flat);
        assert_eq!(summaries[0].price_swing, Decimal::ZERO);
    }

    #[test]
    fn test_rows_without_price_are_ignored() {
        let summaries = summarize(&[record("solana", 1, None)]);
        assert!(summaries.is_empty());
        assert!(summarize(&[]).is_empty());
    }
}
