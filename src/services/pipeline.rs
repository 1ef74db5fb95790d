//! Extract → Transform → Load orchestration
//!
//! One call to [`Pipeline::run_once`] is one run. Each stage gates the next:
//! no payload skips transform and load, no rows skips load. Every failure
//! is caught here and turned into a [`RunOutcome`], so the scheduler never
//! sees an error and keeps ticking.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::services::coingecko::Extractor;
use crate::services::snapshot_store::{LoadError, LoadOutcome, Loader};
use crate::services::transform::Transformer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Rows were written (some may have been skipped as duplicates)
    Loaded(LoadOutcome),
    /// The store refused the batch on a uniqueness constraint
    DuplicatesSkipped { attempted: u64 },
    /// Extraction produced nothing (failed request or empty payload)
    NoData { reason: Option<String> },
    /// The payload held no complete rows
    NoRows { dropped: usize },
    Failed { error: String },
}

impl RunOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::Loaded(_) => "loaded",
            RunOutcome::DuplicatesSkipped { .. } => "duplicates_skipped",
            RunOutcome::NoData { .. } => "no_data",
            RunOutcome::NoRows { .. } => "no_rows",
            RunOutcome::Failed { .. } => "failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RunOutcome::Failed { .. })
    }

    /// Rows newly written by this run
    pub fn rows_inserted(&self) -> u64 {
        match self {
            RunOutcome::Loaded(outcome) => outcome.inserted,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: RunOutcome,
}

#[derive(Clone)]
pub struct Pipeline {
    extractor: Arc<dyn Extractor>,
    transformer: Transformer,
    loader: Arc<dyn Loader>,
}

impl Pipeline {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        transformer: Transformer,
        loader: Arc<dyn Loader>,
    ) -> Self {
        Self {
            extractor,
            transformer,
            loader,
        }
    }

    pub async fn run_once(&self) -> RunReport {
        let started_at = Utc::now();
        info!("--- [START] Starting ETL run ---");

        let outcome = self.execute().await;

        match &outcome {
            RunOutcome::Loaded(load) => info!(
                attempted = load.attempted,
                inserted = load.inserted,
                skipped = load.skipped,
                "[SUCCESS] ETL run completed"
            ),
            RunOutcome::DuplicatesSkipped { attempted } => info!(
                attempted = attempted,
                "ETL run completed, snapshots already stored (duplicate skipped)"
            ),
            RunOutcome::NoData { reason } => warn!(
                reason = reason.as_deref().unwrap_or("empty payload"),
                "No data extracted, skipping run"
            ),
            RunOutcome::NoRows { dropped } => warn!(
                dropped = dropped,
                "No complete rows after transform, skipping load"
            ),
            RunOutcome::Failed { error } => error!(error = %error, "ETL run failed"),
        }

        RunReport {
            started_at,
            finished_at: Utc::now(),
            outcome,
        }
    }

    async fn execute(&self) -> RunOutcome {
        // 1. Extract
        let raw = match self.extractor.extract().await {
            Ok(raw) => raw,
            Err(e) => {
                return RunOutcome::NoData {
                    reason: Some(e.to_string()),
                };
            }
        };
        if is_empty_payload(&raw) {
            return RunOutcome::NoData { reason: None };
        }

        // 2. Transform
        let transformed = self.transformer.transform(&raw);
        if transformed.rows.is_empty() {
            return RunOutcome::NoRows {
                dropped: transformed.dropped,
            };
        }

        // 3. Load
        let attempted = transformed.rows.len() as u64;
        match self.loader.load(&transformed.rows).await {
            // Every row was already stored
            Ok(outcome) if outcome.inserted == 0 && outcome.skipped > 0 => {
                RunOutcome::DuplicatesSkipped { attempted }
            }
            Ok(outcome) => RunOutcome::Loaded(outcome),
            Err(LoadError::Conflict(_)) => RunOutcome::DuplicatesSkipped { attempted },
            Err(e) => RunOutcome::Failed {
                error: e.to_string(),
            },
        }
    }
}

fn is_empty_payload(raw: &serde_json::Value) -> bool {
    match raw {
        serde_json::Value::Null => true,
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
