//! Portfolio snapshots: balances valued at a price.

use std::fmt;

use rust_decimal::Decimal;

use crate::error::RebalanceError;
use crate::price::Price;
use crate::types::Pair;

/// Raw holdings as reported by an account provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Balances {
    /// Asset currency held (e.g. SOL).
    pub asset: Decimal,
    /// Quote currency held (e.g. USDC).
    pub quote: Decimal,
}

impl Balances {
    pub fn new(asset: Decimal, quote: Decimal) -> Self {
        Self { asset, quote }
    }
}

/// The portfolio at one instant, valued in quote currency.
///
/// All fields are non-negative. Built fresh every cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortfolioSnapshot {
    pub asset_balance: Decimal,
    pub quote_balance: Decimal,
    /// `asset_balance × mid_price`, rounded to quote precision.
    pub asset_value: Decimal,
    pub quote_value: Decimal,
}

impl PortfolioSnapshot {
    /// Value `balances` at `price` for `pair`.
    ///
    /// Fails with [`RebalanceError::DegenerateInput`] on negative balances or a
    /// value too large for a `Decimal`, and [`RebalanceError::InvalidPrice`]
    /// on a non-positive price.
    pub fn value(balances: Balances, price: &Price, pair: &Pair) -> Result<Self, RebalanceError> {
        if price.mid_price <= Decimal::ZERO {
            return Err(RebalanceError::InvalidPrice(price.mid_price));
        }
        if balances.asset.is_sign_negative() && !balances.asset.is_zero() {
            return Err(RebalanceError::degenerate(format!(
                "negative {} balance {}",
                pair.asset, balances.asset
            )));
        }
        if balances.quote.is_sign_negative() && !balances.quote.is_zero() {
            return Err(RebalanceError::degenerate(format!(
                "negative {} balance {}",
                pair.quote, balances.quote
            )));
        }

        let asset_balance = pair.asset.round(balances.asset);
        let quote_balance = pair.quote.round(balances.quote);
        let asset_value = asset_balance
            .checked_mul(price.mid_price)
            .map(|value| pair.quote.round(value))
            .ok_or_else(|| {
                RebalanceError::degenerate(format!(
                    "{} {} at {} overflows",
                    asset_balance, pair.asset, price.mid_price
                ))
            })?;
        // portfolio_value() relies on this sum fitting
        if asset_value.checked_add(quote_balance).is_none() {
            return Err(RebalanceError::degenerate(format!(
                "portfolio of {asset_value} + {quote_balance} {} overflows",
                pair.quote
            )));
        }

        Ok(Self {
            asset_balance,
            quote_balance,
            asset_value,
            quote_value: quote_balance,
        })
    }

    /// `asset_value + quote_value`.
    pub fn portfolio_value(&self) -> Decimal {
        self.asset_value + self.quote_value
    }
}

impl fmt::Display for PortfolioSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "asset {} (value {}) + quote {} = {}",
            self.asset_balance,
            self.asset_value,
            self.quote_value,
            self.portfolio_value()
        )
    }
}
