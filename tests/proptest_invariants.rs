//! Property-based tests for the rebalance decision engine.
//!
//! These tests use proptest to verify that key invariants hold
//! across randomly generated portfolios.

use driftguard::{
    Balances, MarketOrder, Pair, PortfolioSnapshot, Price, RebalanceDecision, RebalanceError,
    RebalancePolicy, decide, evaluate,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Generate a non-negative value with two decimal places (0.00 ..= 1,000,000.00)
fn value_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Generate a tolerance in [0, 0.2] with four decimal places
fn tolerance_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=2_000i64).prop_map(|t| Decimal::new(t, 4))
}

/// Generate a target fraction in [0.01, 0.99]
fn fraction_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..=99i64).prop_map(|f| Decimal::new(f, 2))
}

fn policy(target_fraction: Decimal, tolerance: Decimal) -> RebalancePolicy {
    RebalancePolicy::new(target_fraction, tolerance).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    // ========================================================================
    // DECISION RULE
    // ========================================================================

    /// NoAction iff offset == 0 or offset_percentage < tolerance
    #[test]
    fn no_action_iff_inside_band(
        asset in value_strategy(),
        quote in value_strategy(),
        f in fraction_strategy(),
        t in tolerance_strategy(),
    ) {
        prop_assume!(asset + quote > Decimal::ZERO);
        let eval = evaluate(asset, quote, &policy(f, t)).unwrap();
        let inside = eval.offset.is_zero() || eval.offset_percentage < t;
        prop_assert_eq!(eval.decision == RebalanceDecision::NoAction, inside);
    }

    /// Amounts are non-negative and equal |offset| when acting
    #[test]
    fn amount_is_abs_offset(
        asset in value_strategy(),
        quote in value_strategy(),
        t in tolerance_strategy(),
    ) {
        prop_assume!(asset + quote > Decimal::ZERO);
        let eval = evaluate(asset, quote, &policy(Decimal::new(5, 1), t)).unwrap();
        prop_assert!(eval.decision.quote_amount() >= Decimal::ZERO);
        if eval.decision.is_action() {
            prop_assert_eq!(eval.decision.quote_amount(), eval.offset.abs());
        }
    }

    /// Sell only when overweight, Buy only when underweight
    #[test]
    fn side_follows_offset_sign(
        asset in value_strategy(),
        quote in value_strategy(),
        f in fraction_strategy(),
        t in tolerance_strategy(),
    ) {
        prop_assume!(asset + quote > Decimal::ZERO);
        let eval = evaluate(asset, quote, &policy(f, t)).unwrap();
        match eval.decision {
            RebalanceDecision::Sell { .. } => prop_assert!(eval.offset > Decimal::ZERO),
            RebalanceDecision::Buy { .. } => prop_assert!(eval.offset < Decimal::ZERO),
            RebalanceDecision::NoAction => {}
        }
    }

    // ========================================================================
    // SYMMETRY
    // ========================================================================

    /// At a 50/50 target, swapping asset and quote flips Sell <-> Buy with equal magnitude
    #[test]
    fn swap_flips_side(
        a in value_strategy(),
        q in value_strategy(),
        t in tolerance_strategy(),
    ) {
        prop_assume!(a + q > Decimal::ZERO);
        let p = RebalancePolicy { tolerance: t, ..RebalancePolicy::default() };
        let d1 = decide(a, q, &p).unwrap();
        let d2 = decide(q, a, &p).unwrap();

        prop_assert_eq!(d1.quote_amount(), d2.quote_amount());
        prop_assert_eq!(d1.is_action(), d2.is_action());
        if d1.is_action() {
            prop_assert_ne!(d1.side(), d2.side());
        }
    }

    // ========================================================================
    // DETERMINISM
    // ========================================================================

    #[test]
    fn deterministic(
        a in value_strategy(),
        q in value_strategy(),
        t in tolerance_strategy(),
    ) {
        let p = policy(Decimal::new(5, 1), t);
        prop_assert_eq!(evaluate(a, q, &p), evaluate(a, q, &p));
    }

    // ========================================================================
    // ORDER CONSTRUCTION
    // ========================================================================

    /// Truncated order never exceeds the sized quantity
    #[test]
    fn order_never_oversized(
        amount in (1i64..=10_000_000i64).prop_map(|c| Decimal::new(c, 2)),
        mid in (1i64..=100_000_000i64).prop_map(|c| Decimal::new(c, 4)),
    ) {
        let pair = Pair::parse_symbol("SOL/USDC", 3, 2).unwrap();
        let price = Price::new("SOL/USDC", mid, "book").unwrap();
        let decision = RebalanceDecision::Buy { quote_amount: amount };
        if let Some(order) = MarketOrder::from_decision(&decision, &price, &pair).unwrap() {
            prop_assert!(order.quantity > Decimal::ZERO);
            prop_assert!(order.quantity <= amount / mid);
            prop_assert!(order.quantity.scale() <= 3);
        }
    }

    /// Snapshot values are non-negative and sum to the portfolio value
    #[test]
    fn snapshot_sums(
        asset in (0i64..=1_000_000_000i64).prop_map(|v| Decimal::new(v, 3)),
        quote in value_strategy(),
        mid in (1i64..=100_000_000i64).prop_map(|c| Decimal::new(c, 4)),
    ) {
        let pair = Pair::parse_symbol("SOL/USDC", 3, 2).unwrap();
        let price = Price::new("SOL/USDC", mid, "book").unwrap();
        let snap = PortfolioSnapshot::value(Balances::new(asset, quote), &price, &pair).unwrap();
        prop_assert!(snap.asset_value >= Decimal::ZERO);
        prop_assert!(snap.quote_value >= Decimal::ZERO);
        prop_assert_eq!(snap.portfolio_value(), snap.asset_value + snap.quote_value);
    }
}

// ============================================================================
// Degenerate inputs
// ============================================================================

#[test]
fn zero_portfolio_value_is_degenerate() {
    let err = decide(Decimal::ZERO, Decimal::ZERO, &RebalancePolicy::default()).unwrap_err();
    assert!(matches!(err, RebalanceError::DegenerateInput(_)));
}

#[test]
fn zero_target_fraction_is_degenerate() {
    let p = RebalancePolicy {
        target_fraction: Decimal::ZERO,
        ..RebalancePolicy::default()
    };
    let err = decide(Decimal::from(10), Decimal::from(10), &p).unwrap_err();
    assert!(matches!(err, RebalanceError::DegenerateInput(_)));
}
