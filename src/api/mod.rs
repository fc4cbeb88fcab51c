pub mod yahoo;

pub use yahoo::YahooFinanceClient;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::models::Quote;

/// Source of current prices for instrument symbols
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the current quote for `symbol`
    async fn quote(&self, symbol: &str) -> Result<Quote, FetchError>;

    /// Fetch only the current price
    async fn fetch(&self, symbol: &str) -> Result<f64, FetchError> {
        Ok(self.quote(symbol).await?.price)
    }
}
