use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use crypto_pipeline::jobs::snapshot_sync::run_snapshot_schedule;
use crypto_pipeline::models::snapshot::RowSet;
use crypto_pipeline::services::coingecko::{ExtractError, Extractor};
use crypto_pipeline::services::pipeline::Pipeline;
use crypto_pipeline::services::snapshot_store::{LoadError, LoadOutcome, Loader};
use crypto_pipeline::services::transform::Transformer;
use sea_orm::{DbErr, RuntimeErr};
use serde_json::{json, Value};
use tokio::time::{sleep, Duration};

#[derive(Default)]
struct CountingExtractor {
    calls: AtomicUsize,
}

#[async_trait]
impl Extractor for CountingExtractor {
    async fn extract(&self) -> Result<Value, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({
            "bitcoin": {"usd": 50000, "eur": 45000, "last_updated_at": 1700000000}
        }))
    }
}

/// Every load fails as if the database went away
#[derive(Default)]
struct BrokenLoader {
    calls: AtomicUsize,
}

#[async_trait]
impl Loader for BrokenLoader {
    async fn load(&self, _rows: &RowSet) -> Result<LoadOutcome, LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(LoadError::Database(DbErr::Conn(RuntimeErr::Internal(
            "connection refused".to_string(),
        ))))
    }
}

#[tokio::test(start_paused = true)]
async fn test_schedule_survives_failed_runs() {
    let extractor = Arc::new(CountingExtractor::default());
    let loader = Arc::new(BrokenLoader::default());
    let pipeline = Pipeline::new(
        extractor.clone(),
        Transformer::new("usd", Some("eur".to_string())),
        loader.clone(),
    );
    let period = Duration::from_secs(60);

    // Ticks at 0s and 60s, shutdown at 90s
    let runs = run_snapshot_schedule(
        pipeline,
        period,
        None,
        "price_snapshot_sync",
        sleep(period + period / 2),
    )
    .await;

    assert_eq!(runs, 2);
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 2);
    assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_before_first_tick_runs_nothing() {
    let extractor = Arc::new(CountingExtractor::default());
    let pipeline = Pipeline::new(
        extractor.clone(),
        Transformer::new("usd", None),
        Arc::new(BrokenLoader::default()),
    );

    let runs = run_snapshot_schedule(
        pipeline,
        Duration::from_secs(60),
        None,
        "price_snapshot_sync",
        std::future::ready(()),
    )
    .await;

    assert_eq!(runs, 0);
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
}
