//! Native coin to fiat quotes

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use rust_decimal::Decimal;

use crate::error::{Error, Result};

/// CoinGecko `simple/price` endpoint; `ids` and `vs_currencies` are appended per request
pub const DEFAULT_PRICE_FEED_URL: &str = "https://api.coingecko.com/api/v3/simple/price";

/// Source of a native-coin price in some fiat currency.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Fiat currency code of the quotes, e.g. "usd"
    fn currency(&self) -> String;

    /// Price of one whole native coin
    async fn native_price(&self) -> Result<Decimal>;
}

/// CoinGecko `simple/price` client
#[derive(Debug, Clone)]
pub struct CoinGeckoPriceFeed {
    url: String,
    coin_id: String,
    currency: String,
    http: reqwest::Client,
}

impl CoinGeckoPriceFeed {
    pub fn new(url: impl Into<String>, coin_id: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            coin_id: coin_id.into(),
            currency: currency.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Pull `<coin_id>.<currency>` out of a `simple/price` response body.
    pub fn extract_price(&self, body: &serde_json::Value) -> Result<Decimal> {
        let price = body
            .get(&self.coin_id)
            .and_then(|coin| coin.get(&self.currency))
            .and_then(|p| p.as_f64())
            .ok_or_else(|| {
                Error::PriceFeed(format!(
                    "Response has no {}.{} price",
                    self.coin_id, self.currency
                ))
            })?;
        Decimal::try_from(price).map_err(|e| Error::PriceFeed(format!("Invalid price {}: {}", price, e)))
    }
}

impl Default for CoinGeckoPriceFeed {
    fn default() -> Self {
        Self::new(DEFAULT_PRICE_FEED_URL, "ethereum", "usd")
    }
}

#[async_trait]
impl PriceFeed for CoinGeckoPriceFeed {
    fn currency(&self) -> String {
        self.currency.clone()
    }

    async fn native_price(&self) -> Result<Decimal> {
        let response = self
            .http
            .get(&self.url)
            .query(&[("ids", &self.coin_id), ("vs_currencies", &self.currency)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::PriceFeed(format!(
                "Price request failed with status: {}",
                response.status()
            )));
        }
        let body: serde_json::Value = response.json().await?;
        self.extract_price(&body)
    }
}
