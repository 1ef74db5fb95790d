use std::process::ExitCode;
use std::sync::Arc;

use crypto_pipeline::config::{AppConfig, Source};
use crypto_pipeline::jobs::snapshot_sync::{run_and_record, run_snapshot_schedule};
use crypto_pipeline::services::coingecko::CoinGeckoService;
use crypto_pipeline::services::job_status::jobs;
use crypto_pipeline::services::pipeline::Pipeline;
use crypto_pipeline::services::snapshot_store::SnapshotStore;
use crypto_pipeline::services::transform::Transformer;
use crypto_pipeline::{db, telemetry};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    telemetry::init_tracing("info,crypto_pipeline=debug,sqlx=warn");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {}. Check your environment or .env file.", e);
            return ExitCode::FAILURE;
        }
    };

    // Connect to database
    let db = match db::connect(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!(error = %e, "Database connection failed");
            return ExitCode::FAILURE;
        }
    };

    // Run migrations, then make sure custom-named tables exist too
    if let Err(e) = db::migrate(&db).await {
        tracing::error!(error = %e, "Failed to run migrations");
        return ExitCode::FAILURE;
    }
    let store = SnapshotStore::new(db.clone(), config.tables.clone());
    if let Err(e) = store.ensure_schema().await {
        tracing::error!(error = %e, "Failed to create snapshot tables");
        return ExitCode::FAILURE;
    }

    let source = config.pipeline.source;
    let coingecko = match CoinGeckoService::new(config.api.clone(), source) {
        Ok(service) => service,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build HTTP client");
            return ExitCode::FAILURE;
        }
    };

    let transformer = Transformer::new(
        config.api.primary_currency(),
        config.api.secondary_currency().map(str::to_string),
    );
    let pipeline = Pipeline::new(Arc::new(coingecko), transformer, Arc::new(store));

    let job_name = match source {
        Source::SimplePrice => jobs::PRICE_SNAPSHOT_SYNC,
        Source::Markets => jobs::MARKET_SNAPSHOT_SYNC,
    };

    tracing::info!(
        source = source.as_str(),
        interval_secs = config.pipeline.interval.as_secs(),
        run_once = config.pipeline.run_once,
        "Pipeline configured"
    );

    if config.pipeline.run_once {
        let report = run_and_record(&pipeline, Some(&db), job_name).await;
        return if report.outcome.is_failure() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    };

    run_snapshot_schedule(pipeline, config.pipeline.interval, Some(db), job_name, shutdown).await;

    ExitCode::SUCCESS
}
