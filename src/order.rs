//! Market orders built from rebalance decisions.

use std::fmt;

use rust_decimal::Decimal;

use crate::decision::RebalanceDecision;
use crate::error::RebalanceError;
use crate::price::Price;
use crate::side::Side;
use crate::sizing::order_quantity;
use crate::types::Pair;

/// Order type. Rebalancing only ever sends market orders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OrderType {
    Market,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
        }
    }
}

/// A sized, precision-rounded order ready for an executor.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarketOrder {
    pub pair_symbol: String,
    pub side: Side,
    /// Asset quantity, truncated to asset precision.
    pub quantity: Decimal,
    /// Reference price, rounded to quote precision.
    pub price: Decimal,
    pub order_type: OrderType,
}

impl MarketOrder {
    /// Build the order for `decision` at `price`.
    ///
    /// Returns `Ok(None)` for [`RebalanceDecision::NoAction`] and when the
    /// quantity truncates to zero at the asset's precision.
    pub fn from_decision(
        decision: &RebalanceDecision,
        price: &Price,
        pair: &Pair,
    ) -> Result<Option<Self>, RebalanceError> {
        let Some(side) = decision.side() else {
            return Ok(None);
        };

        let raw = order_quantity(decision.quote_amount(), price)?;
        let quantity = pair.asset.truncate(raw);
        if quantity.is_zero() {
            return Ok(None);
        }

        Ok(Some(Self {
            pair_symbol: pair.symbol(),
            side,
            quantity,
            price: pair.quote.round(price.mid_price),
            order_type: OrderType::Market,
        }))
    }

    /// Approximate quote value of the order at its reference price.
    pub fn notional(&self) -> Decimal {
        self.quantity * self.price
    }
}

impl fmt::Display for MarketOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} @ ~{}",
            self.order_type, self.side, self.quantity, self.pair_symbol, self.price
        )
    }
}
