//! Core types: Instrument, Pair

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};

/// A tradable currency or token with its native precision.
///
/// Looked up once at startup and never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instrument {
    pub symbol: String,
    /// Number of decimal places the instrument is denominated in.
    pub decimals: u32,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, decimals: u32) -> Self {
        Self {
            symbol: symbol.into(),
            decimals,
        }
    }

    /// Round a value to this instrument's precision (midpoint away from zero).
    pub fn round(&self, value: Decimal) -> Decimal {
        value.round_dp_with_strategy(self.decimals, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Round a value toward zero at this instrument's precision.
    ///
    /// Used for order quantities, which must never exceed the sized amount.
    pub fn truncate(&self, value: Decimal) -> Decimal {
        value.round_dp_with_strategy(self.decimals, RoundingStrategy::ToZero)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

/// An asset/quote trading pair, e.g. `SOL/USDC`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pair {
    /// The volatile instrument being accumulated or divested.
    pub asset: Instrument,
    /// The instrument amounts and portfolio value are denominated in.
    pub quote: Instrument,
}

impl Pair {
    pub fn new(asset: Instrument, quote: Instrument) -> Self {
        Self { asset, quote }
    }

    /// Build a pair from an `ASSET/QUOTE` symbol and the two precisions.
    ///
    /// Returns `None` if the symbol is not exactly two non-empty halves.
    pub fn parse_symbol(symbol: &str, asset_decimals: u32, quote_decimals: u32) -> Option<Self> {
        let (asset, quote) = symbol.split_once('/')?;
        let (asset, quote) = (asset.trim(), quote.trim());
        if asset.is_empty() || quote.is_empty() || quote.contains('/') {
            return None;
        }
        Some(Self::new(
            Instrument::new(asset, asset_decimals),
            Instrument::new(quote, quote_decimals),
        ))
    }

    /// `ASSET/QUOTE` rendering.
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.asset.symbol, self.quote.symbol)
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.asset.symbol, self.quote.symbol)
    }
}
