//! Snapshot read endpoints
//!
//! Every response is cached for the configured TTL, so a dashboard polled by
//! many browsers costs one query per window.

use std::future::Future;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use sea_orm::DbErr;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::models::dashboard::{
    ErrorResponse, LatestQuery, MarketListResponse, PriceHistoryResponse, PriceListResponse,
    SummaryResponse, WindowQuery,
};
use crate::services::analytics;
use crate::AppState;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// GET /api/prices/latest?limit=N
///
/// Latest N price rows, newest first (default 50, max 500).
pub async fn get_latest_prices(
    State(state): State<AppState>,
    Query(query): Query<LatestQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.validate().map_err(bad_request)?;
    let key = format!("prices/latest?limit={}", limit);

    cached(&state, key, async {
        let data = state.store.latest_prices(limit).await?;
        Ok::<_, DbErr>(PriceListResponse {
            table: state.store.tables().price_table.clone(),
            count: data.len(),
            data,
        })
    })
    .await
}

/// GET /api/prices/history?window=24h&asset_id=bitcoin
///
/// Rows captured within the window, oldest first.
pub async fn get_price_history(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Value>, ApiError> {
    let window = query.validate().map_err(bad_request)?;
    let asset_id = query.asset_id.filter(|a| !a.is_empty());
    let key = format!(
        "prices/history?window={}&asset_id={}",
        window.as_str(),
        asset_id.as_deref().unwrap_or("*")
    );

    info!(window = window.as_str(), asset_id = ?asset_id, "Fetching price history");

    cached(&state, key, async {
        let since = Utc::now() - window.duration();
        let data = state.store.prices_since(since, asset_id.as_deref()).await?;
        Ok::<_, DbErr>(PriceHistoryResponse {
            window: window.as_str().to_string(),
            asset_id: asset_id.clone(),
            data,
        })
    })
    .await
}

/// GET /api/prices/summary?window=24h
///
/// Per-asset trend (latest vs average) and volatility (min/max swing).
pub async fn get_price_summary(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Value>, ApiError> {
    let window = query.validate().map_err(bad_request)?;
    let key = format!("prices/summary?window={}", window.as_str());

    cached(&state, key, async {
        let since = Utc::now() - window.duration();
        let records = state.store.prices_since(since, None).await?;
        Ok::<_, DbErr>(SummaryResponse {
            window: window.as_str().to_string(),
            assets: analytics::summarize(&records),
        })
    })
    .await
}

/// GET /api/markets/latest?limit=N
pub async fn get_latest_markets(
    State(state): State<AppState>,
    Query(query): Query<LatestQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.validate().map_err(bad_request)?;
    let key = format!("markets/latest?limit={}", limit);

    cached(&state, key, async {
        let data = state.store.latest_markets(limit).await?;
        Ok::<_, DbErr>(MarketListResponse {
            table: state.store.tables().market_table.clone(),
            count: data.len(),
            data,
        })
    })
    .await
}

async fn cached<T, Fut>(state: &AppState, key: String, load: Fut) -> Result<Json<Value>, ApiError>
where
    T: Serialize,
    Fut: Future<Output = Result<T, DbErr>>,
{
    if let Some(hit) = state.cache.get(&key).await {
        debug!(key = %key, "Cache hit");
        return Ok(Json(hit));
    }

    let response = load.await.map_err(database_error)?;
    let value = serde_json::to_value(response).map_err(|e| {
        error!(error = %e, "Failed to serialize response");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Serialization error: {}", e),
                code: Some("SERIALIZATION_ERROR".to_string()),
            }),
        )
    })?;

    state.cache.insert(key, value.clone()).await;
    Ok(Json(value))
}

fn bad_request(error: String) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error,
            code: Some("INVALID_QUERY".to_string()),
        }),
    )
}

pub(crate) fn database_error(e: DbErr) -> ApiError {
    error!(error = %e, "Database error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("Database error: {}", e),
            code: Some("DATABASE_ERROR".to_string()),
        }),
    )
}
