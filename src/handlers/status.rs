use axum::{extract::State, Json};

use crate::handlers::snapshots::{database_error, ApiError};
use crate::models::dashboard::StatusResponse;
use crate::services::job_status;
use crate::AppState;

/// GET /api/status
///
/// Last outcome and counters of every pipeline job. Not cached.
pub async fn get_status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let jobs = job_status::all_statuses(state.store.db())
        .await
        .map_err(database_error)?;

    Ok(Json(StatusResponse { jobs }))
}
