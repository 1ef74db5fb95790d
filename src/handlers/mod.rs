use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub mod dashboard;
pub mod snapshots;
pub mod status;

/// All dashboard routes, read-only
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/api/prices/latest", get(snapshots::get_latest_prices))
        .route("/api/prices/history", get(snapshots::get_price_history))
        .route("/api/prices/summary", get(snapshots::get_price_summary))
        .route("/api/markets/latest", get(snapshots::get_latest_markets))
        .route("/api/status", get(status::get_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
