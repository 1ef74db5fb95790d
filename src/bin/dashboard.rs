use std::process::ExitCode;

use crypto_pipeline::config::AppConfig;
use crypto_pipeline::services::snapshot_store::SnapshotStore;
use crypto_pipeline::{db, handlers, telemetry, AppState};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    telemetry::init_tracing("info,crypto_pipeline=debug,tower_http=info,sqlx=warn");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {}. Check your environment or .env file.", e);
            return ExitCode::FAILURE;
        }
    };

    let db = match db::connect(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!(error = %e, "Could not connect to database");
            return ExitCode::FAILURE;
        }
    };

    // Tables may not exist yet if the pipeline has never run
    let store = SnapshotStore::new(db, config.tables.clone());
    if let Err(e) = db::migrate(store.db()).await {
        tracing::error!(error = %e, "Failed to run migrations");
        return ExitCode::FAILURE;
    }
    if let Err(e) = store.ensure_schema().await {
        tracing::error!(error = %e, "Failed to create snapshot tables");
        return ExitCode::FAILURE;
    }

    let state = AppState::new(store, config.dashboard.cache_ttl);
    let app = handlers::router(state);

    let listener = match tokio::net::TcpListener::bind(&config.dashboard.bind).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(bind = %config.dashboard.bind, error = %e, "Failed to bind dashboard listener");
            return ExitCode::FAILURE;
        }
    };

    match listener.local_addr() {
        Ok(addr) => tracing::info!("Dashboard listening on http://{}", addr),
        Err(_) => tracing::info!("Dashboard listening on {}", config.dashboard.bind),
    }

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received, stopping dashboard");
    };

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
        tracing::error!(error = %e, "Dashboard server error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
