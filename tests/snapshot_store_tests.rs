mod common;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use crypto_pipeline::config::TableConfig;
use crypto_pipeline::models::snapshot::{MarketSnapshot, RowSet};
use crypto_pipeline::services::coingecko::{ExtractError, Extractor};
use crypto_pipeline::services::job_status::{self, jobs};
use crypto_pipeline::services::pipeline::{Pipeline, RunOutcome, RunReport};
use crypto_pipeline::services::snapshot_store::{LoadError, LoadOutcome, Loader, SnapshotStore};
use crypto_pipeline::services::transform::Transformer;
use rust_decimal_macros::dec;
use sea_orm::ConnectionTrait;
use serde_json::{json, Value};

use crate::common::{price, setup_test_db, setup_test_store};

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

fn now_secs() -> DateTime<Utc> {
    DateTime::from_timestamp(Utc::now().timestamp(), 0).unwrap()
}

#[tokio::test]
async fn test_ensure_schema_is_idempotent() {
    let store = setup_test_store().await.expect("store");

    store.ensure_schema().await.expect("second ensure_schema");
    assert_eq!(store.count_prices().await.unwrap(), 0);
    assert_eq!(store.count_markets().await.unwrap(), 0);
}

#[tokio::test]
async fn test_custom_table_names() {
    let db = setup_test_db().await.expect("db");
    let tables = TableConfig {
        price_table: "prices_custom".to_string(),
        market_table: "markets_custom".to_string(),
    };
    let store = SnapshotStore::new(db, tables);
    store.ensure_schema().await.expect("ensure_schema");
    store.ensure_schema().await.expect("ensure_schema again");

    let outcome = store
        .insert_prices(&[price("bitcoin", dec!(50000), at(1_700_000_000))])
        .await
        .unwrap();

    assert_eq!(outcome.inserted, 1);
    assert_eq!(store.count_prices().await.unwrap(), 1);
    assert_eq!(store.latest_prices(10).await.unwrap()[0].asset_id, "bitcoin");
}

#[tokio::test]
async fn test_reloading_same_batch_inserts_nothing() {
    let store = setup_test_store().await.expect("store");
    let batch = RowSet::Prices(vec![
        price("bitcoin", dec!(50000), at(1_700_000_000)),
        price("ethereum", dec!(3000), at(1_700_000_000)),
    ]);

    let first = store.load(&batch).await.unwrap();
    assert_eq!(
        first,
        LoadOutcome {
            attempted: 2,
            inserted: 2,
            skipped: 0
        }
    );

    let second = store.load(&batch).await.unwrap();
    assert_eq!(
        second,
        LoadOutcome {
            attempted: 2,
            inserted: 0,
            skipped: 2
        }
    );
    assert_eq!(store.count_prices().await.unwrap(), 2);
}

#[tokio::test]
async fn test_partial_overlap_keeps_new_rows() {
    let store = setup_test_store().await.expect("store");
    store
        .insert_prices(&[price("bitcoin", dec!(50000), at(1_700_000_000))])
        .await
        .unwrap();

    // Same bitcoin snapshot plus a newer one and a new asset
    let outcome = store
        .insert_prices(&[
            price("bitcoin", dec!(50000), at(1_700_000_000)),
            price("bitcoin", dec!(50100), at(1_700_000_060)),
            price("solana", dec!(140), at(1_700_000_000)),
        ])
        .await
        .unwrap();

    assert_eq!(outcome.attempted, 3);
    assert_eq!(outcome.inserted, 2);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(store.count_prices().await.unwrap(), 3);
}

#[tokio::test]
async fn test_empty_batch_is_a_no_op() {
    let store = setup_test_store().await.expect("store");

    let outcome = store.insert_prices(&[]).await.unwrap();

    assert_eq!(outcome, LoadOutcome::default());
    assert_eq!(store.count_prices().await.unwrap(), 0);
}

#[tokio::test]
async fn test_latest_prices_newest_first() {
    let store = setup_test_store().await.expect("store");
    store
        .insert_prices(&[
            price("ethereum", dec!(3000), at(1_700_000_000)),
            price("bitcoin", dec!(50000), at(1_700_000_000)),
            price("bitcoin", dec!(51000), at(1_700_000_120)),
        ])
        .await
        .unwrap();

    let latest = store.latest_prices(2).await.unwrap();

    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0].asset_id, "bitcoin");
    assert_eq!(latest[0].captured_at, at(1_700_000_120));
    assert_eq!(latest[0].price_primary, Some(dec!(51000)));
    assert_eq!(latest[0].price_secondary, Some(dec!(25500)));
    // Ties on captured_at are ordered by asset id
    assert_eq!(latest[1].asset_id, "bitcoin");
    assert_eq!(latest[1].captured_at, at(1_700_000_000));
}

#[tokio::test]
async fn test_prices_since_filters_window_and_asset() {
    let store = setup_test_store().await.expect("store");
    let now = now_secs();
    store
        .insert_prices(&[
            price("bitcoin", dec!(48000), now - Duration::days(3)),
            price("bitcoin", dec!(50000), now - Duration::hours(2)),
            price("bitcoin", dec!(51000), now - Duration::minutes(5)),
            price("ethereum", dec!(3000), now - Duration::minutes(5)),
        ])
        .await
        .unwrap();

    let day = store
        .prices_since(now - Duration::hours(24), None)
        .await
        .unwrap();
    assert_eq!(day.len(), 3);
    assert_eq!(day[0].price_primary, Some(dec!(50000)));

    let btc = store
        .prices_since(now - Duration::hours(24), Some("bitcoin"))
        .await
        .unwrap();
    assert_eq!(btc.len(), 2);
    assert!(btc.iter().all(|r| r.asset_id == "bitcoin"));
    assert!(btc[0].captured_at < btc[1].captured_at);
}

#[tokio::test]
async fn test_market_rows_round_trip() {
    let store = setup_test_store().await.expect("store");
    let captured_at = at(1_700_000_000);
    let rows = vec![
        MarketSnapshot {
            asset_id: "bitcoin".to_string(),
            symbol: Some("btc".to_string()),
            name: Some("Bitcoin".to_string()),
            current_price: dec!(50000),
            market_cap: Some(dec!(980000000000)),
            total_volume: Some(dec!(25000000000)),
            captured_at,
        },
        MarketSnapshot {
            asset_id: "ethereum".to_string(),
            symbol: None,
            name: None,
            current_price: dec!(3000),
            market_cap: None,
            total_volume: None,
            captured_at,
        },
    ];

    let outcome = store.load(&RowSet::Markets(rows.clone())).await.unwrap();
    assert_eq!(outcome.inserted, 2);

    let again = store.load(&RowSet::Markets(rows)).await.unwrap();
    assert_eq!(again.skipped, 2);

    let latest = store.latest_markets(10).await.unwrap();
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0].asset_id, "bitcoin");
    assert_eq!(latest[0].symbol.as_deref(), Some("btc"));
    assert_eq!(latest[1].market_cap, None);
    assert_eq!(store.count_markets().await.unwrap(), 2);
}

#[tokio::test]
async fn test_job_status_counters() {
    let db = setup_test_db().await.expect("db");
    let report = |outcome: RunOutcome| RunReport {
        started_at: at(1_700_000_000),
        finished_at: at(1_700_000_001),
        outcome,
    };

    let loaded = report(RunOutcome::Loaded(LoadOutcome {
        attempted: 3,
        inserted: 3,
        skipped: 0,
    }));
    job_status::record_run(&db, jobs::PRICE_SNAPSHOT_SYNC, &loaded)
        .await
        .unwrap();
    job_status::record_run(&db, jobs::PRICE_SNAPSHOT_SYNC, &report(RunOutcome::NoData { reason: None }))
        .await
        .unwrap();
    let status = job_status::record_run(
        &db,
        jobs::PRICE_SNAPSHOT_SYNC,
        &report(RunOutcome::Failed {
            error: "database error: connection refused".to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(status.success_count, 1);
    assert_eq!(status.skip_count, 1);
    assert_eq!(status.error_count, 1);
    assert_eq!(status.rows_inserted_total, 3);
    assert_eq!(status.last_outcome.as_deref(), Some("failed"));
    assert!(status.last_error.unwrap().contains("connection refused"));
    assert_eq!(status.last_success_at, Some(at(1_700_000_001)));

    let all = job_status::all_statuses(&db).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].job_name, jobs::PRICE_SNAPSHOT_SYNC);
}

struct FixedPayload(Value);

#[async_trait]
impl Extractor for FixedPayload {
    async fn extract(&self) -> Result<Value, ExtractError> {
        Ok(self.0.clone())
    }
}

#[tokio::test]
async fn test_rerun_of_stored_snapshot_reports_duplicates() {
    let store = setup_test_store().await.expect("store");
    let pipeline = Pipeline::new(
        Arc::new(FixedPayload(json!({
            "bitcoin": {"usd": 50000, "eur": 45000, "last_updated_at": 1700000000}
        }))),
        Transformer::new("usd", Some("eur".to_string())),
        Arc::new(store.clone()),
    );

    let first = pipeline.run_once().await;
    assert_eq!(
        first.outcome,
        RunOutcome::Loaded(LoadOutcome {
            attempted: 1,
            inserted: 1,
            skipped: 0
        })
    );

    let second = pipeline.run_once().await;
    assert_eq!(second.outcome, RunOutcome::DuplicatesSkipped { attempted: 1 });
    assert_eq!(second.outcome.label(), "duplicates_skipped");
    assert!(!second.outcome.is_failure());
    assert_eq!(store.count_prices().await.unwrap(), 1);
}

#[tokio::test]
async fn test_unique_violation_is_classified_as_conflict() {
    let store = setup_test_store().await.expect("store");
    let insert = "INSERT INTO crypto_prices (asset_id, price_primary, captured_at, ingested_at) \
                  VALUES ('bitcoin', 50000, '2023-11-14T22:13:20+00:00', '2023-11-14T22:13:20+00:00')";

    store.db().execute_unprepared(insert).await.expect("first insert");
    let err = store
        .db()
        .execute_unprepared(insert)
        .await
        .expect_err("second insert must hit the primary key");

    match LoadError::from(err) {
        LoadError::Conflict(msg) => assert!(msg.contains("crypto_prices")),
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn test_long_identifiers_are_stored() {
    let store = setup_test_store().await.expect("store");
    let long_id = "wrapped-".repeat(16);

    let outcome = store
        .insert_prices(&[price(&long_id, dec!(1.25), at(1_700_000_000))])
        .await
        .unwrap();

    assert_eq!(outcome.inserted, 1);
    assert_eq!(store.latest_prices(1).await.unwrap()[0].asset_id, long_id);
}
