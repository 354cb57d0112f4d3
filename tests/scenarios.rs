//! Worked rebalance scenarios through the public API.

use driftguard::{
    Balances, MarketOrder, Pair, PortfolioSnapshot, Price, RebalanceDecision, RebalanceError,
    RebalancePolicy, Side, evaluate, evaluate_snapshot, order_quantity,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn sol_usdc() -> Pair {
    Pair::parse_symbol("SOL/USDC", 3, 6).unwrap()
}

// ============================================================================
// Decision scenarios at a 50/50 target, 0.5% tolerance
// ============================================================================

#[test]
fn overweight_600_400_sells_100() {
    let eval = evaluate(dec!(600), dec!(400), &RebalancePolicy::default()).unwrap();
    assert_eq!(eval.target_value, dec!(500));
    assert_eq!(eval.offset, dec!(100));
    assert_eq!(eval.offset_percentage, dec!(0.20));
    assert_eq!(
        eval.decision,
        RebalanceDecision::Sell {
            quote_amount: dec!(100)
        }
    );
}

#[test]
fn even_500_500_waits() {
    let eval = evaluate(dec!(500), dec!(500), &RebalancePolicy::default()).unwrap();
    assert!(eval.offset.is_zero());
    assert_eq!(eval.decision, RebalanceDecision::NoAction);
}

#[test]
fn drift_502_498_inside_band_waits() {
    let eval = evaluate(dec!(502), dec!(498), &RebalancePolicy::default()).unwrap();
    assert_eq!(eval.offset_percentage, dec!(0.004));
    assert_eq!(eval.decision, RebalanceDecision::NoAction);
}

#[test]
fn underweight_490_510_buys_10() {
    let eval = evaluate(dec!(490), dec!(510), &RebalancePolicy::default()).unwrap();
    assert_eq!(eval.offset, dec!(-10));
    assert_eq!(eval.offset_percentage, dec!(0.02));
    assert_eq!(
        eval.decision,
        RebalanceDecision::Buy {
            quote_amount: dec!(10)
        }
    );
}

// ============================================================================
// Order sizing
// ============================================================================

#[test]
fn sizing_100_at_50_is_2() {
    let price = Price::new("SOL/USDC", dec!(50), "book").unwrap();
    assert_eq!(order_quantity(dec!(100), &price).unwrap(), dec!(2.0));
}

#[test]
fn zero_price_never_constructs() {
    assert_eq!(
        Price::new("SOL/USDC", Decimal::ZERO, "book"),
        Err(RebalanceError::InvalidPrice(Decimal::ZERO))
    );
}

// ============================================================================
// End to end: balances → order
// ============================================================================

#[test]
fn balances_to_buy_order() {
    let pair = sol_usdc();
    let price = Price::new("SOL/USDC", dec!(140), "book").unwrap();
    // 3.5 SOL = 490 USDC vs 510 USDC
    let snap = PortfolioSnapshot::value(Balances::new(dec!(3.5), dec!(510)), &price, &pair).unwrap();
    let eval = evaluate_snapshot(&snap, &RebalancePolicy::default()).unwrap();
    let order = MarketOrder::from_decision(&eval.decision, &price, &pair)
        .unwrap()
        .unwrap();

    assert_eq!(order.side, Side::Buy);
    // 10 / 140 = 0.0714285..., truncated to 3 dp
    assert_eq!(order.quantity, dec!(0.071));
    assert_eq!(order.price, dec!(140));
}

#[test]
fn empty_account_is_degenerate() {
    let pair = sol_usdc();
    let price = Price::new("SOL/USDC", dec!(140), "book").unwrap();
    let snap = PortfolioSnapshot::value(Balances::default(), &price, &pair).unwrap();
    assert!(matches!(
        evaluate_snapshot(&snap, &RebalancePolicy::default()),
        Err(RebalanceError::DegenerateInput(_))
    ));
}
