//! Collaborator traits and implementations for driftguard.
//!
//! The rebalancer never talks to a venue directly. It sees three narrow
//! contracts:
//!
//! - [`PriceSource`]: a named provider of mid-prices
//! - [`AccountProvider`]: balances for an owner on a pair
//! - [`OrderExecutor`]: accepts a market order
//!
//! Implementations:
//!
//! - **Mock / paper** ([`mock`]): in-memory venue that settles fills against
//!   its own balances
//! - **Binance** (feature `binance`): Binance spot REST API

pub mod error;
pub mod mock;
pub mod types;

#[cfg(feature = "binance")]
pub mod binance;

pub use error::BrokerError;
pub use types::*;

use driftguard::{Balances, MarketOrder, Pair, PortfolioSnapshot, Price};

/// A named provider of mid-prices.
pub trait PriceSource: Send + Sync {
    /// Provider name used in logs and to pick the authoritative source.
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    /// Current mid-price for `pair`. Fails with [`BrokerError::PriceUnavailable`].
    fn fetch_mid_price(&self, pair: &Pair) -> Result<Price, BrokerError>;
}

/// Loads what an owner holds on a pair.
pub trait AccountProvider: Send + Sync {
    /// Raw asset and quote balances. Fails with [`BrokerError::AccountLoad`].
    fn balances(&self, owner: &str, pair: &Pair) -> Result<Balances, BrokerError>;

    /// Balances valued at `price`.
    fn current_snapshot(
        &self,
        owner: &str,
        pair: &Pair,
        price: &Price,
    ) -> Result<PortfolioSnapshot, BrokerError> {
        let balances = self.balances(owner, pair)?;
        PortfolioSnapshot::value(balances, price, pair)
            .map_err(|e| BrokerError::AccountLoad(format!("cannot value {owner}: {e}")))
    }
}

/// Submits orders for execution.
pub trait OrderExecutor: Send + Sync {
    /// Submit one market order. Fails with [`BrokerError::OrderSubmission`].
    fn submit(&self, order: &MarketOrder) -> Result<OrderHandle, BrokerError>;
}
