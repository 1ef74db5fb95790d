//! Job status service
//!
//! Keeps one row per scheduled job with its last outcome and running
//! counters, so the dashboard can tell a quiet pipeline from a broken one.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};

use crate::entities::job_status;
use crate::entities::prelude::JobStatus;
use crate::services::pipeline::{RunOutcome, RunReport};

/// Job names for tracking status
pub mod jobs {
    pub const PRICE_SNAPSHOT_SYNC: &str = "price_snapshot_sync";
    pub const MARKET_SNAPSHOT_SYNC: &str = "market_snapshot_sync";
}

/// Fold one run report into the job's status row
pub async fn record_run(
    db: &DatabaseConnection,
    job_name: &str,
    report: &RunReport,
) -> Result<job_status::Model, DbErr> {
    let existing = JobStatus::find()
        .filter(job_status::Column::JobName.eq(job_name))
        .one(db)
        .await?;

    let outcome = &report.outcome;
    let attempted_at = report.finished_at;
    let error = match outcome {
        RunOutcome::Failed { error } => Some(error.clone()),
        _ => None,
    };
    let (success, skip, failure) = match outcome {
        RunOutcome::Loaded(_) | RunOutcome::DuplicatesSkipped { .. } => (1, 0, 0),
        RunOutcome::NoData { .. } | RunOutcome::NoRows { .. } => (0, 1, 0),
        RunOutcome::Failed { .. } => (0, 0, 1),
    };
    let inserted = outcome.rows_inserted() as i64;

    let model = match existing {
        Some(record) => {
            let mut active_model: job_status::ActiveModel = record.clone().into();
            active_model.last_attempt_at = Set(Some(attempted_at));
            if success == 1 {
                active_model.last_success_at = Set(Some(attempted_at));
            }
            active_model.last_outcome = Set(Some(outcome.label().to_string()));
            active_model.last_error = Set(error);
            active_model.success_count = Set(record.success_count + success);
            active_model.skip_count = Set(record.skip_count + skip);
            active_model.error_count = Set(record.error_count + failure);
            active_model.rows_inserted_total = Set(record.rows_inserted_total + inserted);
            active_model.update(db).await?
        }
        None => {
            let new_record = job_status::ActiveModel {
                job_name: Set(job_name.to_string()),
                last_success_at: Set((success == 1).then_some(attempted_at)),
                last_attempt_at: Set(Some(attempted_at)),
                last_outcome: Set(Some(outcome.label().to_string())),
                last_error: Set(error),
                success_count: Set(success),
                skip_count: Set(skip),
                error_count: Set(failure),
                rows_inserted_total: Set(inserted),
                ..Default::default()
            };
            new_record.insert(db).await?
        }
    };

    tracing::debug!("[{}] Recorded run outcome: {}", job_name, outcome.label());
    Ok(model)
}

pub async fn all_statuses(db: &DatabaseConnection) -> Result<Vec<job_status::Model>, DbErr> {
    JobStatus::find()
        .order_by_asc(job_status::Column::JobName)
        .all(db)
        .await
}
