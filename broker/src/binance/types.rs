//! Binance-specific API response types.
//!
//! Numeric fields arrive as strings and are kept that way here; conversion to
//! `Decimal` happens in [`parse_decimal`] so a malformed field is an error
//! rather than a silent zero.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

/// Binance account balance entry.
#[derive(Debug, Deserialize)]
pub struct BalanceInfo {
    pub asset: String,
    pub free: String,
    pub locked: String,
}

/// Binance account info response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub balances: Vec<BalanceInfo>,
    #[serde(default)]
    pub can_trade: bool,
}

/// Binance order response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub symbol: String,
    pub order_id: u64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub executed_qty: String,
    #[serde(default)]
    pub cummulative_quote_qty: String,
}

/// Binance book ticker response (best bid/ask).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookTicker {
    pub symbol: String,
    pub bid_price: String,
    pub bid_qty: String,
    pub ask_price: String,
    pub ask_qty: String,
}

/// Binance rolling average price response.
#[derive(Debug, Deserialize)]
pub struct AvgPrice {
    pub mins: u32,
    pub price: String,
}

/// Binance last traded price response.
#[derive(Debug, Deserialize)]
pub struct TickerPrice {
    pub symbol: String,
    pub price: String,
}

/// Parse a Binance decimal string, naming the field on failure.
pub fn parse_decimal(field: &str, value: &str) -> Result<Decimal, String> {
    Decimal::from_str(value).map_err(|e| format!("bad {field} '{value}': {e}"))
}

impl BalanceInfo {
    /// `free + locked`.
    pub fn total(&self) -> Result<Decimal, String> {
        parse_decimal("free", &self.free)?
            .checked_add(parse_decimal("locked", &self.locked)?)
            .ok_or_else(|| format!("{} balance overflows", self.asset))
    }
}
