//! Binance spot implementation of the collaborator traits.
//!
//! Uses the REST API for all operations. Blocking (sync) via reqwest::blocking.
//! One [`BinanceClient`] is shared (via `Arc`) between the price sources, the
//! account provider and the executor.

pub mod auth;
pub mod client;
pub mod types;

use std::sync::Arc;

use driftguard::{Balances, MarketOrder, Pair, Price, Side};
use log::{debug, warn};

use crate::error::BrokerError;
use crate::types::*;
use crate::{AccountProvider, OrderExecutor, PriceSource};
use client::BinanceClient;
use types::parse_decimal;

/// Convert a pair to a Binance trading symbol ("SOL/USDC" → "SOLUSDC").
pub fn binance_symbol(pair: &Pair) -> String {
    format!("{}{}", pair.asset.symbol, pair.quote.symbol).to_uppercase()
}

/// Convert an order's `ASSET/QUOTE` symbol to a Binance trading symbol.
fn binance_symbol_str(pair_symbol: &str) -> String {
    pair_symbol.replace('/', "").to_uppercase()
}

/// Mid-price of a book ticker. Fails on an empty side or a crossed book.
pub fn book_ticker_price(
    pair: &Pair,
    ticker: &types::BookTicker,
    provider: &str,
) -> Result<Price, String> {
    let bid = parse_decimal("bidPrice", &ticker.bid_price)?;
    let ask = parse_decimal("askPrice", &ticker.ask_price)?;
    debug!(
        "{} book: bid {bid} x {} ask {ask} x {}",
        ticker.symbol, ticker.bid_qty, ticker.ask_qty
    );
    Price::from_bid_ask(pair.symbol(), bid, ask, provider)
        .map_err(|e| format!("{} book: {e}", ticker.symbol))
}

/// Which public endpoint a [`BinancePriceSource`] reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceEndpoint {
    /// `(best bid + best ask) / 2` from the book ticker.
    BookTicker,
    /// Rolling average price.
    AvgPrice,
    /// Last traded price.
    LastPrice,
}

/// A Binance market-data endpoint exposed as a [`PriceSource`].
pub struct BinancePriceSource {
    name: String,
    kind: ProviderKind,
    endpoint: PriceEndpoint,
    client: Arc<BinanceClient>,
}

impl BinancePriceSource {
    pub fn new(
        name: impl Into<String>,
        kind: ProviderKind,
        endpoint: PriceEndpoint,
        client: Arc<BinanceClient>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            endpoint,
            client,
        }
    }

    fn fetch(&self, pair: &Pair) -> Result<Price, String> {
        let symbol = binance_symbol(pair);
        match self.endpoint {
            PriceEndpoint::BookTicker => {
                let ticker = self.client.book_ticker(&symbol)?;
                book_ticker_price(pair, &ticker, &self.name)
            }
            PriceEndpoint::AvgPrice => {
                let avg = self.client.avg_price(&symbol)?;
                let mid = parse_decimal("price", &avg.price)?;
                debug!("{symbol} {}-minute average: {mid}", avg.mins);
                Price::new(pair.symbol(), mid, &self.name).map_err(|e| e.to_string())
            }
            PriceEndpoint::LastPrice => {
                let last = self.client.last_price(&symbol)?;
                let mid = parse_decimal("price", &last.price)?;
                Price::new(pair.symbol(), mid, &self.name).map_err(|e| e.to_string())
            }
        }
    }
}

impl PriceSource for BinancePriceSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn fetch_mid_price(&self, pair: &Pair) -> Result<Price, BrokerError> {
        self.fetch(pair)
            .map_err(|reason| BrokerError::price_unavailable(&self.name, reason))
    }
}

/// Spot balances of the account owning the API key.
pub struct BinanceAccount {
    client: Arc<BinanceClient>,
}

impl BinanceAccount {
    pub fn new(client: Arc<BinanceClient>) -> Self {
        Self { client }
    }
}

impl AccountProvider for BinanceAccount {
    fn balances(&self, owner: &str, pair: &Pair) -> Result<Balances, BrokerError> {
        let info = self
            .client
            .account_info()
            .map_err(|e| BrokerError::AccountLoad(format!("{owner}: {e}")))?;
        if !info.can_trade {
            warn!("{owner}: account has trading disabled, orders will be rejected");
        }

        // Assets the account never held are absent from the response
        let total = |symbol: &str| {
            info.balances
                .iter()
                .find(|b| b.asset.eq_ignore_ascii_case(symbol))
                .map(|b| b.total())
                .transpose()
                .map(Option::unwrap_or_default)
                .map_err(|e| BrokerError::AccountLoad(format!("{owner}: {e}")))
        };

        let balances = Balances::new(total(&pair.asset.symbol)?, total(&pair.quote.symbol)?);
        debug!(
            "{owner} balances: {} {}, {} {}",
            balances.asset, pair.asset, balances.quote, pair.quote
        );
        Ok(balances)
    }
}

/// Places spot market orders.
pub struct BinanceExecutor {
    client: Arc<BinanceClient>,
}

impl BinanceExecutor {
    pub fn new(client: Arc<BinanceClient>) -> Self {
        Self { client }
    }
}

impl OrderExecutor for BinanceExecutor {
    fn submit(&self, order: &MarketOrder) -> Result<OrderHandle, BrokerError> {
        let symbol = binance_symbol_str(&order.pair_symbol);
        let side = match order.side {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        };
        let quantity = order.quantity.normalize().to_string();

        let resp = self
            .client
            .submit_market_order(&symbol, side, &quantity)
            .map_err(BrokerError::OrderSubmission)?;

        let executed_quantity = if resp.executed_qty.is_empty() {
            Default::default()
        } else {
            parse_decimal("executedQty", &resp.executed_qty)
                .map_err(BrokerError::OrderSubmission)?
        };

        debug!(
            "{symbol} order {} {}: executed {} for {} quote",
            resp.order_id, resp.status, resp.executed_qty, resp.cummulative_quote_qty
        );

        Ok(OrderHandle {
            id: OrderId(resp.order_id.to_string()),
            status: order_state(&resp.status),
            executed_quantity,
        })
    }
}

/// Map a Binance order status string onto [`OrderState`].
pub fn order_state(status: &str) -> OrderState {
    match status {
        "FILLED" => OrderState::Filled,
        "PARTIALLY_FILLED" => OrderState::PartiallyFilled,
        _ => OrderState::Submitted,
    }
}
