//! Process configuration
//!
//! Everything is read from environment variables (a `.env` file is loaded
//! first by the binaries). Required values that are missing or malformed
//! produce a [`ConfigError`] at startup.

use std::env;
use std::time::Duration;

use migration::schema::{DEFAULT_MARKET_TABLE, DEFAULT_PRICE_TABLE};
use thiserror::Error;
use url::Url;

pub const DEFAULT_COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MARKETS_PER_PAGE: u32 = 50;
pub const DEFAULT_DASHBOARD_BIND: &str = "0.0.0.0:3000";
pub const DEFAULT_REPORT_WINDOW_DAYS: u32 = 30;
pub const MAX_REPORT_WINDOW_DAYS: u32 = 3650;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(String),
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            var: var.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Which upstream endpoint (and therefore JSON shape) the pipeline ingests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// `/simple/price`: map of asset id to per-currency prices
    SimplePrice,
    /// `/coins/markets`: array of per-asset market summaries
    Markets,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::SimplePrice => "simple_price",
            Source::Markets => "markets",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "simple_price" => Some(Source::SimplePrice),
            "markets" => Some(Source::Markets),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    /// Single-connection config, used for in-memory SQLite
    pub fn single(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 1,
            connect_timeout: Duration::from_secs(10),
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub asset_ids: Vec<String>,
    pub currencies: Vec<String>,
    pub markets_per_page: u32,
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn primary_currency(&self) -> &str {
        &self.currencies[0]
    }

    pub fn secondary_currency(&self) -> Option<&str> {
        self.currencies.get(1).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub price_table: String,
    pub market_table: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            price_table: DEFAULT_PRICE_TABLE.to_string(),
            market_table: DEFAULT_MARKET_TABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub source: Source,
    pub interval: Duration,
    pub run_once: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub bind: String,
    pub cache_ttl: Duration,
}

/// Settings of the `snapshot_report` binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    pub window_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub tables: TableConfig,
    pub pipeline: PipelineConfig,
    pub dashboard: DashboardConfig,
    pub report: ReportConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database = DatabaseConfig {
            url: database_url(&get)?,
            max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 5u32)?,
            connect_timeout: Duration::from_secs(parse_or(&get, "DB_CONNECT_TIMEOUT_SECS", 10u64)?),
            acquire_timeout: Duration::from_secs(parse_or(&get, "DB_ACQUIRE_TIMEOUT_SECS", 10u64)?),
        };
        if database.max_connections == 0 {
            return Err(ConfigError::invalid("DB_MAX_CONNECTIONS", "0", "must be at least 1"));
        }

        let source = match get("PIPELINE_SOURCE") {
            Some(raw) => Source::parse(&raw).ok_or_else(|| {
                ConfigError::invalid("PIPELINE_SOURCE", &raw, "expected simple_price or markets")
            })?,
            None => Source::SimplePrice,
        };

        let asset_ids = match get("PIPELINE_ASSET_IDS") {
            Some(raw) => split_list(&raw),
            None if source == Source::SimplePrice => vec!["bitcoin".to_string(), "ethereum".to_string()],
            None => Vec::new(),
        };
        if source == Source::SimplePrice && asset_ids.is_empty() {
            return Err(ConfigError::Missing("PIPELINE_ASSET_IDS".to_string()));
        }

        let currencies = match get("PIPELINE_CURRENCIES") {
            Some(raw) => split_list(&raw),
            None => vec!["usd".to_string(), "eur".to_string()],
        };
        if currencies.is_empty() || currencies.len() > 2 {
            return Err(ConfigError::invalid(
                "PIPELINE_CURRENCIES",
                &currencies.join(","),
                "expected one or two currency codes",
            ));
        }

        let timeout_secs: u64 = parse_or(&get, "PIPELINE_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;
        let api = ApiConfig {
            base_url: get("COINGECKO_BASE_URL")
                .unwrap_or_else(|| DEFAULT_COINGECKO_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: get("COINGECKO_API_KEY"),
            asset_ids,
            currencies,
            markets_per_page: parse_or(&get, "PIPELINE_MARKETS_PER_PAGE", DEFAULT_MARKETS_PER_PAGE)?,
            timeout: Duration::from_secs(timeout_secs),
        };

        let tables = TableConfig {
            price_table: table_name(&get, "PIPELINE_PRICE_TABLE", DEFAULT_PRICE_TABLE)?,
            market_table: table_name(&get, "PIPELINE_MARKET_TABLE", DEFAULT_MARKET_TABLE)?,
        };

        let interval_secs: u64 = parse_or(&get, "PIPELINE_INTERVAL_SECS", DEFAULT_INTERVAL_SECS)?;
        if interval_secs == 0 {
            return Err(ConfigError::invalid("PIPELINE_INTERVAL_SECS", "0", "must be positive"));
        }

        let pipeline = PipelineConfig {
            source,
            interval: Duration::from_secs(interval_secs),
            run_once: get("PIPELINE_RUN_ONCE")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        };

        let dashboard = DashboardConfig {
            bind: get("DASHBOARD_BIND").unwrap_or_else(|| DEFAULT_DASHBOARD_BIND.to_string()),
            cache_ttl: Duration::from_secs(parse_or(&get, "DASHBOARD_CACHE_TTL_SECS", 15u64)?),
        };

        let window_days: u32 = parse_or(&get, "REPORT_WINDOW_DAYS", DEFAULT_REPORT_WINDOW_DAYS)?;
        if window_days == 0 || window_days > MAX_REPORT_WINDOW_DAYS {
            return Err(ConfigError::invalid(
                "REPORT_WINDOW_DAYS",
                &window_days.to_string(),
                format!("must be between 1 and {}", MAX_REPORT_WINDOW_DAYS),
            ));
        }
        let report = ReportConfig { window_days };

        Ok(Self {
            database,
            api,
            tables,
            pipeline,
            dashboard,
            report,
        })
    }
}

/// `DATABASE_URL` wins; otherwise all five `DB_*` parts are required
///
/// Credentials and database name are percent-encoded, so reserved characters
/// in a password cannot move the host or database.
fn database_url<F>(get: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = get("DATABASE_URL") {
        return Ok(url);
    }

    let mut parts = Vec::with_capacity(5);
    for key in ["DB_USER", "DB_PASSWORD", "DB_HOST", "DB_PORT", "DB_NAME"] {
        parts.push(get(key).ok_or_else(|| ConfigError::Missing(key.to_string()))?);
    }
    let (user, password, host, port, name) = (&parts[0], &parts[1], &parts[2], &parts[3], &parts[4]);

    let port: u16 = port
        .parse()
        .map_err(|_| ConfigError::invalid("DB_PORT", port, "not a port number"))?;

    let mut url = Url::parse(&format!("postgres://{}", host))
        .map_err(|e| ConfigError::invalid("DB_HOST", host, e.to_string()))?;
    if url.host_str() != Some(host.as_str()) || url.path() != "" {
        return Err(ConfigError::invalid("DB_HOST", host, "not a plain host name"));
    }

    if url.set_port(Some(port)).is_err()
        || url.set_username(user).is_err()
        || url.set_password(Some(password)).is_err()
    {
        return Err(ConfigError::invalid("DB_HOST", host, "cannot carry credentials"));
    }
    url.set_path(&format!("/{}", name.trim_start_matches('/')));

    Ok(url.to_string())
}

fn parse_or<F, T>(get: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(key, &raw, e.to_string())),
        None => Ok(default),
    }
}

fn table_name<F>(get: &F, key: &str, default: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let name = get(key).unwrap_or_else(|| default.to_string());
    if is_valid_identifier(&name) {
        Ok(name)
    } else {
        Err(ConfigError::invalid(key, &name, "table names must match [A-Za-z_][A-Za-z0-9_]*"))
    }
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
