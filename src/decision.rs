//! Rebalance decision engine.
//!
//! Converts the asset and quote values of a portfolio into a trade action:
//!
//! ```text
//! portfolio_value   = asset_value + quote_value
//! target_value      = portfolio_value × target_fraction
//! offset            = asset_value − target_value
//! offset_percentage = |offset| / target_value
//!
//! offset > 0 and offset_percentage ≥ tolerance  →  Sell offset
//! offset < 0 and offset_percentage ≥ tolerance  →  Buy |offset|
//! otherwise                                     →  NoAction
//! ```
//!
//! Arithmetic is full-precision [`Decimal`]; nothing is rounded here. Rounding
//! to instrument precision happens when the order is built
//! (see [`MarketOrder::from_decision`](crate::MarketOrder::from_decision)).

use std::fmt;

use rust_decimal::Decimal;

use crate::error::RebalanceError;
use crate::side::Side;
use crate::snapshot::PortfolioSnapshot;

/// Target allocation and the band around it inside which nothing trades.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RebalancePolicy {
    /// Fraction of portfolio value to hold in the asset (0 < f < 1).
    pub target_fraction: Decimal,
    /// Minimum fractional deviation from target that triggers a trade (0 ≤ t < 1).
    pub tolerance: Decimal,
}

impl RebalancePolicy {
    /// 50/50 target.
    pub const DEFAULT_TARGET_FRACTION: Decimal = Decimal::from_parts(5, 0, 0, false, 1);
    /// 0.5% band.
    pub const DEFAULT_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

    /// Build a validated policy.
    pub fn new(target_fraction: Decimal, tolerance: Decimal) -> Result<Self, String> {
        if target_fraction <= Decimal::ZERO || target_fraction >= Decimal::ONE {
            return Err(format!(
                "target_fraction must be in (0, 1), got {target_fraction}"
            ));
        }
        if tolerance < Decimal::ZERO || tolerance >= Decimal::ONE {
            return Err(format!("tolerance must be in [0, 1), got {tolerance}"));
        }
        Ok(Self {
            target_fraction,
            tolerance,
        })
    }
}

impl Default for RebalancePolicy {
    fn default() -> Self {
        Self {
            target_fraction: Self::DEFAULT_TARGET_FRACTION,
            tolerance: Self::DEFAULT_TOLERANCE,
        }
    }
}

/// What to do this cycle. `quote_amount` is always non-negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RebalanceDecision {
    NoAction,
    /// Sell asset worth `quote_amount`.
    Sell { quote_amount: Decimal },
    /// Buy asset worth `quote_amount`.
    Buy { quote_amount: Decimal },
}

impl RebalanceDecision {
    /// Order side for an actionable decision.
    pub fn side(&self) -> Option<Side> {
        match self {
            RebalanceDecision::NoAction => None,
            RebalanceDecision::Sell { .. } => Some(Side::Sell),
            RebalanceDecision::Buy { .. } => Some(Side::Buy),
        }
    }

    /// Quote-denominated trade size (zero for `NoAction`).
    pub fn quote_amount(&self) -> Decimal {
        match self {
            RebalanceDecision::NoAction => Decimal::ZERO,
            RebalanceDecision::Sell { quote_amount } | RebalanceDecision::Buy { quote_amount } => {
                *quote_amount
            }
        }
    }

    pub fn is_action(&self) -> bool {
        !matches!(self, RebalanceDecision::NoAction)
    }
}

impl fmt::Display for RebalanceDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebalanceDecision::NoAction => write!(f, "WAIT"),
            RebalanceDecision::Sell { quote_amount } => write!(f, "SELL {quote_amount}"),
            RebalanceDecision::Buy { quote_amount } => write!(f, "BUY {quote_amount}"),
        }
    }
}

/// A decision together with the numbers that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Evaluation {
    pub portfolio_value: Decimal,
    pub target_value: Decimal,
    /// `asset_value − target_value`; positive means the asset is overweight.
    pub offset: Decimal,
    /// `|offset| / target_value`.
    pub offset_percentage: Decimal,
    pub decision: RebalanceDecision,
}

/// Evaluate `asset_value`/`quote_value` against `policy`.
///
/// # Errors
///
/// [`RebalanceError::DegenerateInput`] if either value is negative, the
/// portfolio value is not positive, the target value is zero, or any
/// intermediate value does not fit in a `Decimal`.
pub fn evaluate(
    asset_value: Decimal,
    quote_value: Decimal,
    policy: &RebalancePolicy,
) -> Result<Evaluation, RebalanceError> {
    if asset_value < Decimal::ZERO || quote_value < Decimal::ZERO {
        return Err(RebalanceError::degenerate(format!(
            "negative value (asset {asset_value}, quote {quote_value})"
        )));
    }

    let portfolio_value = asset_value
        .checked_add(quote_value)
        .ok_or_else(|| overflow("portfolio value", asset_value, quote_value))?;
    if portfolio_value <= Decimal::ZERO {
        return Err(RebalanceError::degenerate(format!(
            "portfolio value is {portfolio_value}"
        )));
    }

    let target_value = portfolio_value
        .checked_mul(policy.target_fraction)
        .ok_or_else(|| overflow("target value", portfolio_value, policy.target_fraction))?;
    if target_value.is_zero() {
        return Err(RebalanceError::degenerate("target value is 0"));
    }

    let offset = asset_value - target_value;
    let offset_percentage = offset
        .checked_div(target_value)
        .ok_or_else(|| overflow("offset percentage", offset, target_value))?
        .abs();

    let decision = if offset > Decimal::ZERO && offset_percentage >= policy.tolerance {
        RebalanceDecision::Sell {
            quote_amount: offset,
        }
    } else if offset < Decimal::ZERO && offset_percentage >= policy.tolerance {
        RebalanceDecision::Buy {
            quote_amount: offset.abs(),
        }
    } else {
        RebalanceDecision::NoAction
    };

    Ok(Evaluation {
        portfolio_value,
        target_value,
        offset,
        offset_percentage,
        decision,
    })
}

fn overflow(what: &str, lhs: Decimal, rhs: Decimal) -> RebalanceError {
    RebalanceError::degenerate(format!("{what} overflows ({lhs}, {rhs})"))
}

/// Decision only; see [`evaluate`].
pub fn decide(
    asset_value: Decimal,
    quote_value: Decimal,
    policy: &RebalancePolicy,
) -> Result<RebalanceDecision, RebalanceError> {
    evaluate(asset_value, quote_value, policy).map(|e| e.decision)
}

/// Evaluate a snapshot's values.
pub fn evaluate_snapshot(
    snapshot: &PortfolioSnapshot,
    policy: &RebalancePolicy,
) -> Result<Evaluation, RebalanceError> {
    evaluate(snapshot.asset_value, snapshot.quote_value, policy)
}
