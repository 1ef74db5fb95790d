// src/lib.rs

use std::time::Duration;

use moka::future::Cache;
use services::snapshot_store::SnapshotStore;

/// Shared state of the dashboard server
#[derive(Clone)]
pub struct AppState {
    pub store: SnapshotStore,
    /// Serialized query responses keyed by route and parameters
    pub cache: Cache<String, serde_json::Value>,
}

impl AppState {
    pub fn new(store: SnapshotStore, cache_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(256)
            .time_to_live(cache_ttl)
            .build();

        Self { store, cache }
    }
}

pub mod entities {
    pub mod prelude;
    pub mod job_status;
}

pub mod services {
    pub mod analytics;
    pub mod coingecko;
    pub mod job_status;
    pub mod pipeline;
    pub mod snapshot_store;
    pub mod transform;
}

pub mod config;
pub mod db;
pub mod handlers;
pub mod jobs;
pub mod models;
pub mod telemetry;
