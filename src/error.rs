//! Errors raised by the pure decision path.

use rust_decimal::Decimal;

/// Errors that abort a single rebalance evaluation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RebalanceError {
    /// Portfolio or target value is zero/negative, so no percentage offset exists.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// A price quote that is not strictly positive.
    #[error("invalid price: {0} (must be > 0)")]
    InvalidPrice(Decimal),
}

impl RebalanceError {
    pub(crate) fn degenerate(msg: impl Into<String>) -> Self {
        RebalanceError::DegenerateInput(msg.into())
    }
}
