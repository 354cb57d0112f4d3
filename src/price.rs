//! Mid-price quotes tagged with their provider.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::RebalanceError;

/// A mid-price for a pair, observed by a named provider at a point in time.
///
/// `mid_price` is always strictly positive.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Price {
    pub pair_symbol: String,
    pub mid_price: Decimal,
    pub provider: String,
    pub observed_at: DateTime<Utc>,
}

impl Price {
    /// Build a price observed now.
    pub fn new(
        pair_symbol: impl Into<String>,
        mid_price: Decimal,
        provider: impl Into<String>,
    ) -> Result<Self, RebalanceError> {
        Self::observed(pair_symbol, mid_price, provider, Utc::now())
    }

    /// Build a price with an explicit observation time.
    pub fn observed(
        pair_symbol: impl Into<String>,
        mid_price: Decimal,
        provider: impl Into<String>,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, RebalanceError> {
        if mid_price <= Decimal::ZERO {
            return Err(RebalanceError::InvalidPrice(mid_price));
        }
        Ok(Self {
            pair_symbol: pair_symbol.into(),
            mid_price,
            provider: provider.into(),
            observed_at,
        })
    }

    /// Mid of a best bid / best ask pair.
    ///
    /// Both sides must be quoted and the book must not be crossed. An empty
    /// side comes back from venues as a zero price, which would otherwise
    /// halve the mid.
    pub fn from_bid_ask(
        pair_symbol: impl Into<String>,
        bid: Decimal,
        ask: Decimal,
        provider: impl Into<String>,
    ) -> Result<Self, RebalanceError> {
        if bid <= Decimal::ZERO {
            return Err(RebalanceError::InvalidPrice(bid));
        }
        if ask <= Decimal::ZERO {
            return Err(RebalanceError::InvalidPrice(ask));
        }
        if bid > ask {
            return Err(RebalanceError::degenerate(format!(
                "crossed book: bid {bid} above ask {ask}"
            )));
        }
        // stays within [bid, ask], so it cannot overflow
        let mid = bid + (ask - bid) / Decimal::TWO;
        Self::new(pair_symbol, mid, provider)
    }

    /// Signed deviation of this price from `reference`, in basis points.
    ///
    /// `None` when the ratio does not fit in a `Decimal`.
    pub fn divergence_bps(&self, reference: &Price) -> Option<Decimal> {
        self.mid_price
            .checked_sub(reference.mid_price)?
            .checked_div(reference.mid_price)?
            .checked_mul(Decimal::from(10_000))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} @ {} ({})",
            self.pair_symbol,
            self.mid_price,
            self.observed_at.format("%H:%M:%S"),
            self.provider
        )
    }
}
