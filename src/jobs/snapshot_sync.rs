//! Snapshot Sync Job
//!
//! Runs the ETL pipeline once at startup and then on a fixed interval.
//! Runs never overlap: the loop awaits each run before waiting for the next
//! tick. A failed run is logged and recorded, and the next tick runs again.

use std::future::Future;

use sea_orm::DatabaseConnection;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};

use crate::services::job_status;
use crate::services::pipeline::{Pipeline, RunReport};

/// Run one cycle and record it under `job_name` when a status store is given
pub async fn run_and_record(
    pipeline: &Pipeline,
    status_db: Option<&DatabaseConnection>,
    job_name: &str,
) -> RunReport {
    let report = pipeline.run_once().await;

    if let Some(db) = status_db {
        if let Err(e) = job_status::record_run(db, job_name, &report).await {
            warn!(job = job_name, error = %e, "Failed to record run status");
        }
    }

    report
}

/// Tick until `shutdown` resolves; returns the number of runs performed
pub async fn run_snapshot_schedule<F>(
    pipeline: Pipeline,
    period: Duration,
    status_db: Option<DatabaseConnection>,
    job_name: &str,
    shutdown: F,
) -> usize
where
    F: Future<Output = ()>,
{
    info!(
        job = job_name,
        interval_secs = period.as_secs(),
        "Snapshot sync job started"
    );

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut runs = 0;
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping snapshot sync job gracefully");
                break;
            }
            // First tick completes immediately
            _ = ticker.tick() => {
                let report = run_and_record(&pipeline, status_db.as_ref(), job_name).await;
                runs += 1;
                info!(
                    job = job_name,
                    run = runs,
                    outcome = report.outcome.label(),
                    "Snapshot sync run finished, waiting for next tick"
                );
            }
        }
    }

    info!(job = job_name, runs = runs, "Snapshot sync job stopped");
    runs
}
