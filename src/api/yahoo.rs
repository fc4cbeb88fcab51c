use std::num::NonZeroU32;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::time::{sleep, Duration};

use super::PriceSource;
use crate::config::PriceSourceConfig;
use crate::error::FetchError;
use crate::models::Quote;

const MAX_BACKOFF_MS: u64 = 60_000;
const USER_AGENT: &str = concat!("watchbot/", env!("CARGO_PKG_VERSION"));

type YahooRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Yahoo Finance chart API client
///
/// Cloneable; clones share the rate limiter.
#[derive(Clone)]
pub struct YahooFinanceClient {
    client: Client,
    base_url: String,
    max_retries: u32,
    initial_backoff_ms: u64,
    rate_limiter: Arc<YahooRateLimiter>,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: Option<String>,
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

impl YahooFinanceClient {
    pub fn new(config: &PriceSourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        let rpm = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(rpm)));

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries.max(1),
            initial_backoff_ms: config.initial_backoff_ms,
            rate_limiter,
        })
    }

    /// Get the current quote, retrying transient failures with exponential backoff
    pub async fn get_quote(&self, symbol: &str) -> Result<Quote, FetchError> {
        let mut attempt = 1;

        loop {
            self.rate_limiter.until_ready().await;

            match self.fetch_quote_once(symbol).await {
                Ok(quote) => {
                    if attempt > 1 {
                        tracing::info!("✓ Fetched {} after {} attempts", symbol, attempt);
                    }
                    return Ok(quote);
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let backoff_ms = backoff_ms(self.initial_backoff_ms, attempt);
                    tracing::warn!(
                        "Attempt {}/{} failed for {}: {}. Retrying in {}ms...",
                        attempt,
                        self.max_retries,
                        symbol,
                        e,
                        backoff_ms
                    );
                    sleep(Duration::from_millis(backoff_ms)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_quote_once(&self, symbol: &str) -> Result<Quote, FetchError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);

        let response = self
            .client
            .get(&url)
            .query(&[("range", "2d"), ("interval", "1d")])
            .send()
            .await
            .map_err(|source| FetchError::Http {
                symbol: symbol.to_string(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(symbol.to_string()));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FetchError::Status {
                symbol: symbol.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(|source| FetchError::Http {
            symbol: symbol.to_string(),
            source,
        })?;

        parse_chart(symbol, &body)
    }
}

/// Exponential backoff before retry `attempt + 1`, capped at `MAX_BACKOFF_MS`
fn backoff_ms(initial_backoff_ms: u64, attempt: u32) -> u64 {
    let factor = 2_u64.checked_pow(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    initial_backoff_ms.saturating_mul(factor).min(MAX_BACKOFF_MS)
}

fn parse_chart(symbol: &str, body: &str) -> Result<Quote, FetchError> {
    let malformed = |reason: String| FetchError::Malformed {
        symbol: symbol.to_string(),
        reason,
    };

    let parsed: ChartResponse = serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;

    if let Some(error) = parsed.chart.error {
        if error.code == "Not Found" {
            return Err(FetchError::NotFound(symbol.to_string()));
        }
        return Err(malformed(format!(
            "{}: {}",
            error.code,
            error.description.unwrap_or_default()
        )));
    }

    let meta = parsed
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .map(|r| r.meta)
        .ok_or_else(|| malformed("empty chart result".to_string()))?;

    let price = meta
        .regular_market_price
        .ok_or_else(|| malformed("missing regularMarketPrice".to_string()))?;

    if !price.is_finite() || price <= 0.0 {
        return Err(FetchError::InvalidPrice {
            symbol: symbol.to_string(),
            price,
        });
    }

    Ok(Quote {
        symbol: meta.symbol.unwrap_or_else(|| symbol.to_string()),
        price,
        previous_close: meta.chart_previous_close,
    })
}

#[async_trait]
impl PriceSource for YahooFinanceClient {
    async fn quote(&self, symbol: &str) -> Result<Quote, FetchError> {
        self.get_quote(symbol).await
    }
}
