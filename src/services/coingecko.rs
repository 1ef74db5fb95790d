use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use thiserror::Error;

use crate::config::{ApiConfig, Source};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("CoinGecko API error {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Produces one raw payload per run
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self) -> Result<Value, ExtractError>;
}

#[derive(Clone)]
pub struct CoinGeckoService {
    client: Client,
    api: ApiConfig,
    source: Source,
}

impl CoinGeckoService {
    pub fn new(api: ApiConfig, source: Source) -> Result<Self, ExtractError> {
        let client = Client::builder().timeout(api.timeout).build()?;

        Ok(Self {
            client,
            api,
            source,
        })
    }

    /// `/simple/price` for the configured ids and currencies
    pub async fn fetch_simple_price(&self) -> Result<Value, ExtractError> {
        tracing::info!(
            ids = %self.api.asset_ids.join(","),
            currencies = %self.api.currencies.join(","),
            "Fetching simple prices from CoinGecko"
        );

        let url = format!("{}/simple/price", self.api.base_url);
        let request = self.client.get(&url).query(&[
            ("ids", self.api.asset_ids.join(",")),
            ("vs_currencies", self.api.currencies.join(",")),
            ("include_last_updated_at", "true".to_string()),
        ]);

        let data = self.send(request).await?;

        if let Some(map) = data.as_object() {
            tracing::info!("Fetched prices for {} assets", map.len());
        }

        Ok(data)
    }

    /// First page of `/coins/markets`, ordered by market cap
    pub async fn fetch_markets(&self) -> Result<Value, ExtractError> {
        tracing::info!(
            per_page = self.api.markets_per_page,
            currency = %self.api.primary_currency(),
            "Fetching market summaries from CoinGecko"
        );

        let url = format!("{}/coins/markets", self.api.base_url);
        let mut params = vec![
            ("vs_currency", self.api.primary_currency().to_string()),
            ("order", "market_cap_desc".to_string()),
            ("per_page", self.api.markets_per_page.to_string()),
            ("page", "1".to_string()),
            ("sparkline", "false".to_string()),
        ];
        if !self.api.asset_ids.is_empty() {
            params.push(("ids", self.api.asset_ids.join(",")));
        }

        let data = self.send(self.client.get(&url).query(&params)).await?;

        if let Some(items) = data.as_array() {
            tracing::info!("Fetched {} market records", items.len());
        }

        Ok(data)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, ExtractError> {
        let mut request = request.header("accept", "application/json");
        if let Some(key) = &self.api.api_key {
            request = request.header(self.api_key_header(), key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractError::Status { status, body });
        }

        Ok(response.json().await?)
    }

    fn api_key_header(&self) -> &'static str {
        if self.api.base_url.contains("pro-api") {
            "x-cg-pro-api-key"
        } else {
            "x-cg-demo-api-key"
        }
    }
}

#[async_trait]
impl Extractor for CoinGeckoService {
    async fn extract(&self) -> Result<Value, ExtractError> {
        match self.source {
            Source::SimplePrice => self.fetch_simple_price().await,
            Source::Markets => self.fetch_markets().await,
        }
    }
}
