//! # driftguard
//!
//! A deterministic decision engine for keeping a two-asset portfolio at a
//! target split.
//!
//! Given what a portfolio holds in an *asset* (e.g. SOL) and a *quote*
//! currency (e.g. USDC), valued at a mid-price, the engine decides whether to
//! sell asset, buy asset, or wait. Everything here is pure computation over
//! [`rust_decimal::Decimal`]; fetching prices, loading balances and placing
//! orders live in `driftguard-broker`, and the polling loop lives in
//! `driftguard-rebalancer`.
//!
//! ## Quick Start
//!
//! ```
//! use driftguard::{decide, RebalanceDecision, RebalancePolicy};
//! use rust_decimal::Decimal;
//!
//! // 50/50 target, 0.5% tolerance
//! let policy = RebalancePolicy::default();
//!
//! // 600 of asset vs 400 of quote: 20% overweight, sell the excess
//! let decision = decide(Decimal::from(600), Decimal::from(400), &policy).unwrap();
//! assert_eq!(decision, RebalanceDecision::Sell { quote_amount: Decimal::from(100) });
//!
//! // 502 vs 498 is only 0.4% off target: wait
//! let decision = decide(Decimal::from(502), Decimal::from(498), &policy).unwrap();
//! assert_eq!(decision, RebalanceDecision::NoAction);
//! ```
//!
//! ## From balances to an order
//!
//! ```
//! use driftguard::{
//!     evaluate_snapshot, Balances, MarketOrder, Pair, PortfolioSnapshot, Price,
//!     RebalancePolicy, Side,
//! };
//! use rust_decimal::Decimal;
//!
//! let pair = Pair::parse_symbol("SOL/USDC", 3, 2).unwrap();
//! let price = Price::new("SOL/USDC", Decimal::from(50), "book").unwrap();
//!
//! // 12 SOL @ 50 = 600 USDC of asset, 400 USDC of quote
//! let balances = Balances::new(Decimal::from(12), Decimal::from(400));
//! let snapshot = PortfolioSnapshot::value(balances, &price, &pair).unwrap();
//!
//! let eval = evaluate_snapshot(&snapshot, &RebalancePolicy::default()).unwrap();
//! let order = MarketOrder::from_decision(&eval.decision, &price, &pair)
//!     .unwrap()
//!     .unwrap();
//!
//! assert_eq!(order.side, Side::Sell);
//! assert_eq!(order.quantity, Decimal::from(2)); // 100 USDC / 50
//! ```
//!
//! ## Precision
//!
//! | Stage | Rounding |
//! |-------|----------|
//! | Snapshot balances | native precision of each instrument |
//! | Asset value | quote precision |
//! | Decision | none (full precision) |
//! | Order quantity | truncated to asset precision |
//! | Order price | quote precision |

pub mod decision;
mod error;
mod order;
mod price;
mod side;
pub mod sizing;
mod snapshot;
mod types;

// Re-export public API
pub use decision::{
    Evaluation, RebalanceDecision, RebalancePolicy, decide, evaluate, evaluate_snapshot,
};
pub use error::RebalanceError;
pub use order::{MarketOrder, OrderType};
pub use price::Price;
pub use side::Side;
pub use sizing::order_quantity;
pub use snapshot::{Balances, PortfolioSnapshot};
pub use types::{Instrument, Pair};
