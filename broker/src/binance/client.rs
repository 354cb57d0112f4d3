//! Binance REST API client.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::debug;
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use super::auth::Credentials;
use super::types::{AccountInfo, AvgPrice, BookTicker, OrderResponse, TickerPrice};
use crate::error::BrokerError;

/// Which Binance deployment to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn base_url(self) -> &'static str {
        match self {
            Network::Mainnet => "https://api.binance.com",
            Network::Testnet => "https://testnet.binance.vision",
        }
    }
}

/// Blocking Binance REST client.
///
/// Market-data endpoints work without credentials; account and order
/// endpoints require them.
pub struct BinanceClient {
    client: Client,
    credentials: Option<Credentials>,
    base_url: String,
}

impl BinanceClient {
    /// Create a new Binance client.
    pub fn new(network: Network, credentials: Option<Credentials>) -> Result<Self, BrokerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| BrokerError::Connection(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            credentials,
            base_url: network.base_url().to_string(),
        })
    }

    /// Point the client at a different host (e.g. a local stub).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Test connectivity (GET /api/v3/ping).
    pub fn ping(&self) -> Result<(), BrokerError> {
        let url = format!("{}/api/v3/ping", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| BrokerError::Connection(format!("ping failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(BrokerError::Connection(format!(
                "ping returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    /// Get account information (GET /api/v3/account).
    pub fn account_info(&self) -> Result<AccountInfo, String> {
        let credentials = self.require_credentials()?;
        let query = format!("timestamp={}", current_timestamp_ms());
        let signature = credentials.sign(&query);
        let url = format!(
            "{}/api/v3/account?{query}&signature={signature}",
            self.base_url
        );

        send(
            self.client
                .get(&url)
                .header("X-MBX-APIKEY", &credentials.api_key),
            "account",
        )
    }

    /// Submit a new market order (POST /api/v3/order).
    pub fn submit_market_order(
        &self,
        symbol: &str,
        side: &str,
        quantity: &str,
    ) -> Result<OrderResponse, String> {
        let credentials = self.require_credentials()?;
        let query = format!(
            "symbol={symbol}&side={side}&type=MARKET&quantity={quantity}&newOrderRespType=RESULT&timestamp={}",
            current_timestamp_ms()
        );
        let signature = credentials.sign(&query);
        let url = format!("{}/api/v3/order", self.base_url);

        debug!("Submitting Binance order: {query}");

        send(
            self.client
                .post(&url)
                .header("X-MBX-APIKEY", &credentials.api_key)
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(format!("{query}&signature={signature}")),
            "order",
        )
    }

    /// Get book ticker (best bid/ask) for a symbol (GET /api/v3/ticker/bookTicker).
    pub fn book_ticker(&self, symbol: &str) -> Result<BookTicker, String> {
        let url = format!("{}/api/v3/ticker/bookTicker?symbol={symbol}", self.base_url);
        send(self.client.get(&url), "ticker")
    }

    /// Get the rolling average price for a symbol (GET /api/v3/avgPrice).
    pub fn avg_price(&self, symbol: &str) -> Result<AvgPrice, String> {
        let url = format!("{}/api/v3/avgPrice?symbol={symbol}", self.base_url);
        send(self.client.get(&url), "avgPrice")
    }

    /// Get the last traded price for a symbol (GET /api/v3/ticker/price).
    pub fn last_price(&self, symbol: &str) -> Result<TickerPrice, String> {
        let url = format!("{}/api/v3/ticker/price?symbol={symbol}", self.base_url);
        send(self.client.get(&url), "price")
    }

    fn require_credentials(&self) -> Result<&Credentials, String> {
        self.credentials
            .as_ref()
            .ok_or_else(|| "no API credentials configured".to_string())
    }
}

/// Send a request and decode a JSON body, describing failures with `what`.
fn send<T: DeserializeOwned>(request: RequestBuilder, what: &str) -> Result<T, String> {
    let resp = request
        .send()
        .map_err(|e| format!("{what} request failed: {e}"))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        return Err(format!("{what} returned {status}: {body}"));
    }

    resp.json::<T>()
        .map_err(|e| format!("failed to parse {what}: {e}"))
}

/// Current timestamp in milliseconds.
fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}
