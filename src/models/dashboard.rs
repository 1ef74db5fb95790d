//! Dashboard request/response models

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::entities::job_status;
use crate::models::snapshot::{MarketRecord, PriceRecord};
use crate::services::analytics::AssetSummary;

pub const DEFAULT_LATEST_LIMIT: u64 = 50;
pub const MAX_LATEST_LIMIT: u64 = 500;

/// Valid time windows for history and summary queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Hour1,
    Day1,
    Day7,
    Day30,
}

impl Window {
    pub fn as_str(&self) -> &'static str {
        match self {
            Window::Hour1 => "1h",
            Window::Day1 => "24h",
            Window::Day7 => "7d",
            Window::Day30 => "30d",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1h" => Some(Window::Hour1),
            "24h" | "1d" => Some(Window::Day1),
            "7d" => Some(Window::Day7),
            "30d" => Some(Window::Day30),
            _ => None,
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Window::Hour1 => Duration::hours(1),
            Window::Day1 => Duration::hours(24),
            Window::Day7 => Duration::days(7),
            Window::Day30 => Duration::days(30),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatestQuery {
    pub limit: Option<u64>,
}

impl LatestQuery {
    pub fn validate(&self) -> Result<u64, String> {
        match self.limit {
            None => Ok(DEFAULT_LATEST_LIMIT),
            Some(0) => Err("limit must be at least 1".to_string()),
            Some(n) if n > MAX_LATEST_LIMIT => {
                Err(format!("limit must not exceed {}", MAX_LATEST_LIMIT))
            }
            Some(n) => Ok(n),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowQuery {
    /// 1h, 24h, 7d, 30d (defaults to 24h)
    #[serde(default = "default_window")]
    pub window: String,
    pub asset_id: Option<String>,
}

fn default_window() -> String {
    "24h".to_string()
}

impl WindowQuery {
    pub fn validate(&self) -> Result<Window, String> {
        Window::parse(&self.window).ok_or_else(|| {
            format!(
                "Invalid window: '{}'. Must be one of: 1h, 24h, 7d, 30d",
                self.window
            )
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceListResponse {
    pub table: String,
    pub count: usize,
    pub data: Vec<PriceRecord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistoryResponse {
    pub window: String,
    pub asset_id: Option<String>,
    pub data: Vec<PriceRecord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub window: String,
    pub assets: Vec<AssetSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketListResponse {
    pub table: String,
    pub count: usize,
    pub data: Vec<MarketRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub jobs: Vec<job_status::Model>,
}
