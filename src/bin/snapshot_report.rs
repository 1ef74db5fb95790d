//! One-shot console report: latest stored rows plus trend and volatility per asset.

use std::process::ExitCode;

use chrono::{DateTime, TimeDelta, Utc};
use crypto_pipeline::config::AppConfig;
use crypto_pipeline::services::analytics::{self, Trend};
use crypto_pipeline::services::snapshot_store::SnapshotStore;
use crypto_pipeline::{db, telemetry};

const LATEST_ROWS: u64 = 10;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    telemetry::init_tracing("warn");

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
            tracing::error!(error = %e, "Database connection failed");
            return ExitCode::FAILURE;
        }
    };
    let store = SnapshotStore::new(db, config.tables.clone());

    let window_days = config.report.window_days;
    let Some(since) = window_start(Utc::now(), window_days) else {
        tracing::error!(window_days, "Report window is out of range");
        return ExitCode::FAILURE;
    };

    if let Err(e) = print_report(&store, since, window_days).await {
        tracing::error!(error = %e, "Error reading data");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Start of a window of `days` ending at `now`
fn window_start(now: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(TimeDelta::try_days(i64::from(days))?)
}

async fn print_report(
    store: &SnapshotStore,
    since: DateTime<Utc>,
    window_days: u32,
) -> Result<(), sea_orm::DbErr> {
    let table = &store.tables().price_table;
    println!("\n--- Latest {} rows from {} ---", LATEST_ROWS, table);

    let latest = store.latest_prices(LATEST_ROWS).await?;
    if latest.is_empty() {
        println!("The database is connected, but the table is empty.");
        return Ok(());
    }

    println!(
        "{:<16} {:>16} {:>16}  {}",
        "asset_id", "price_primary", "price_secondary", "captured_at"
    );
    for row in &latest {
        println!(
            "{:<16} {:>16} {:>16}  {}",
            row.asset_id,
            opt(row.price_primary),
            opt(row.price_secondary),
            row.captured_at.to_rfc3339()
        );
    }
    println!("Total stored rows: {}", store.count_prices().await?);

    let summaries = analytics::summarize(&store.prices_since(since, None).await?);

    println!("\n--- Market trend (latest vs. {}-day average) ---", window_days);
    for s in &summaries {
        let marker = match s.trend {
            Trend::Up => "UP",
            Trend::Down => "DOWN",
            Trend::Flat => "FLAT",
        };
        println!(
            "{:<16} current {:>14} avg {:>14}  {}",
            s.asset_id, s.current_price, s.average_price, marker
        );
    }

    println!("\n--- Volatility (min vs. max) ---");
    for s in &summaries {
        println!(
            "{:<16} min {:>14} max {:>14} swing {:>14}",
            s.asset_id, s.min_price, s.max_price, s.price_swing
        );
    }

    Ok(())
}

fn opt(value: Option<rust_decimal::Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
