//! Mock venue and price sources: in-memory collaborators with configurable behavior.
//!
//! Use these in integration tests to simulate venue responses without network
//! calls. `MockVenue` also backs the rebalancer's paper-trading mode: market
//! orders fill at their reference price and settle into the venue's balances.
//!
//! ```
//! use driftguard_broker::mock::{FillMode, MockVenue};
//! use driftguard_broker::AccountProvider;
//! use driftguard::{Balances, Pair};
//! use rust_decimal::Decimal;
//!
//! let venue = MockVenue::builder()
//!     .fill_mode(FillMode::ImmediateFull)
//!     .with_balances(Balances::new(Decimal::from(10), Decimal::from(1_000)))
//!     .build();
//!
//! let pair = Pair::parse_symbol("SOL/USDC", 3, 2).unwrap();
//! assert_eq!(venue.balances("paper", &pair).unwrap().asset, Decimal::from(10));
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use driftguard::{Balances, MarketOrder, Pair, Price, Side};
use log::info;
use rust_decimal::Decimal;

use crate::error::BrokerError;
use crate::types::*;
use crate::{AccountProvider, OrderExecutor, PriceSource};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// How the mock venue handles submitted orders.
#[derive(Clone, Debug)]
pub enum FillMode {
    /// Orders are immediately fully filled at their reference price.
    ImmediateFull,
    /// Orders are partially filled (the given fraction, e.g., 0.5 = 50%).
    ImmediatePartial(Decimal),
    /// All orders are rejected.
    Reject,
}

/// A recorded order submission for assertion in tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedOrder {
    pub pair_symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
}

/// Orders a venue remembers by default. Older ones are dropped first.
pub const DEFAULT_RECORDED_ORDERS: usize = 1_000;

/// Builder for `MockVenue`.
pub struct MockVenueBuilder {
    fill_mode: FillMode,
    balances: Balances,
    account_failures: usize,
    max_recorded: usize,
}

impl MockVenueBuilder {
    pub fn fill_mode(mut self, mode: FillMode) -> Self {
        self.fill_mode = mode;
        self
    }

    pub fn with_balances(mut self, balances: Balances) -> Self {
        self.balances = balances;
        self
    }

    /// Fail the next `n` balance loads with [`BrokerError::AccountLoad`].
    pub fn fail_account_loads(mut self, n: usize) -> Self {
        self.account_failures = n;
        self
    }

    /// Keep at most `n` recorded orders (default [`DEFAULT_RECORDED_ORDERS`]).
    pub fn max_recorded_orders(mut self, n: usize) -> Self {
        self.max_recorded = n;
        self
    }

    pub fn build(self) -> MockVenue {
        MockVenue {
            fill_mode: self.fill_mode,
            max_recorded: self.max_recorded,
            state: Mutex::new(VenueState {
                balances: self.balances,
                account_failures: self.account_failures,
                next_order_id: 1,
                submitted: VecDeque::new(),
            }),
        }
    }
}

struct VenueState {
    balances: Balances,
    account_failures: usize,
    next_order_id: u64,
    submitted: VecDeque<RecordedOrder>,
}

/// An in-memory venue that records submitted orders and settles fills.
pub struct MockVenue {
    fill_mode: FillMode,
    max_recorded: usize,
    state: Mutex<VenueState>,
}

impl MockVenue {
    pub fn builder() -> MockVenueBuilder {
        MockVenueBuilder {
            fill_mode: FillMode::ImmediateFull,
            balances: Balances::default(),
            account_failures: 0,
            max_recorded: DEFAULT_RECORDED_ORDERS,
        }
    }

    /// The most recent submitted orders, oldest first (for assertion in tests).
    pub fn submitted_orders(&self) -> Vec<RecordedOrder> {
        lock(&self.state).submitted.iter().cloned().collect()
    }

    /// Current balances, bypassing any scripted failures.
    pub fn current_balances(&self) -> Balances {
        lock(&self.state).balances
    }
}

impl AccountProvider for MockVenue {
    fn balances(&self, _owner: &str, _pair: &Pair) -> Result<Balances, BrokerError> {
        let mut state = lock(&self.state);
        if state.account_failures > 0 {
            state.account_failures -= 1;
            return Err(BrokerError::AccountLoad("mock: account unavailable".into()));
        }
        Ok(state.balances)
    }
}

impl OrderExecutor for MockVenue {
    fn submit(&self, order: &MarketOrder) -> Result<OrderHandle, BrokerError> {
        let mut state = lock(&self.state);

        // Record the order
        if self.max_recorded > 0 {
            if state.submitted.len() == self.max_recorded {
                state.submitted.pop_front();
            }
            state.submitted.push_back(RecordedOrder {
                pair_symbol: order.pair_symbol.clone(),
                side: order.side,
                quantity: order.quantity,
                price: order.price,
            });
        }

        let (filled, status) = match &self.fill_mode {
            FillMode::Reject => {
                return Err(BrokerError::OrderSubmission("mock: order rejected".into()));
            }
            FillMode::ImmediateFull => (order.quantity, OrderState::Filled),
            FillMode::ImmediatePartial(frac) => (order.quantity * *frac, OrderState::PartiallyFilled),
        };

        let cost = filled
            .checked_mul(order.price)
            .ok_or_else(|| BrokerError::OrderSubmission("mock: order value overflows".into()))?;
        let balances = &mut state.balances;
        match order.side {
            Side::Buy => {
                if cost > balances.quote {
                    return Err(BrokerError::OrderSubmission(format!(
                        "mock: insufficient quote balance ({} < {cost})",
                        balances.quote
                    )));
                }
                balances.asset = balances.asset.checked_add(filled).ok_or_else(|| {
                    BrokerError::OrderSubmission("mock: asset balance overflows".into())
                })?;
                balances.quote -= cost;
            }
            Side::Sell => {
                if filled > balances.asset {
                    return Err(BrokerError::OrderSubmission(format!(
                        "mock: insufficient asset balance ({} < {filled})",
                        balances.asset
                    )));
                }
                balances.quote = balances.quote.checked_add(cost).ok_or_else(|| {
                    BrokerError::OrderSubmission("mock: quote balance overflows".into())
                })?;
                balances.asset -= filled;
            }
        }

        let id = OrderId(format!("mock-{}", state.next_order_id));
        state.next_order_id += 1;
        info!("mock fill {id}: {} {filled} @ {}", order.side, order.price);

        Ok(OrderHandle {
            id,
            status,
            executed_quantity: filled,
        })
    }
}

/// A source that always quotes the same mid-price.
pub struct FixedPriceSource {
    name: String,
    kind: ProviderKind,
    mid_price: Decimal,
}

impl FixedPriceSource {
    pub fn new(name: impl Into<String>, kind: ProviderKind, mid_price: Decimal) -> Self {
        Self {
            name: name.into(),
            kind,
            mid_price,
        }
    }
}

impl PriceSource for FixedPriceSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn fetch_mid_price(&self, pair: &Pair) -> Result<Price, BrokerError> {
        Price::new(pair.symbol(), self.mid_price, &self.name)
            .map_err(|e| BrokerError::price_unavailable(&self.name, e))
    }
}

/// A source that replays a script of prices and failures, then repeats a fallback.
pub struct ScriptedPriceSource {
    name: String,
    kind: ProviderKind,
    script: Mutex<VecDeque<Result<Decimal, String>>>,
    fallback: Option<Decimal>,
}

impl ScriptedPriceSource {
    pub fn new(name: impl Into<String>, kind: ProviderKind) -> Self {
        Self {
            name: name.into(),
            kind,
            script: Mutex::new(VecDeque::new()),
            fallback: None,
        }
    }

    pub fn then_price(self, mid_price: Decimal) -> Self {
        lock(&self.script).push_back(Ok(mid_price));
        self
    }

    pub fn then_fail(self, reason: impl Into<String>) -> Self {
        lock(&self.script).push_back(Err(reason.into()));
        self
    }

    /// Price returned once the script is exhausted.
    pub fn otherwise(mut self, mid_price: Decimal) -> Self {
        self.fallback = Some(mid_price);
        self
    }
}

impl PriceSource for ScriptedPriceSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn fetch_mid_price(&self, pair: &Pair) -> Result<Price, BrokerError> {
        let next = lock(&self.script).pop_front();
        let mid = match (next, self.fallback) {
            (Some(Ok(mid)), _) => mid,
            (Some(Err(reason)), _) => return Err(BrokerError::price_unavailable(&self.name, reason)),
            (None, Some(mid)) => mid,
            (None, None) => {
                return Err(BrokerError::price_unavailable(&self.name, "script exhausted"));
            }
        };
        Price::new(pair.symbol(), mid, &self.name)
            .map_err(|e| BrokerError::price_unavailable(&self.name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftguard::OrderType;
    use rust_decimal_macros::dec;

    fn pair() -> Pair {
        Pair::parse_symbol("SOL/USDC", 3, 2).unwrap()
    }

    fn order(side: Side, quantity: Decimal, price: Decimal) -> MarketOrder {
        MarketOrder {
            pair_symbol: "SOL/USDC".into(),
            side,
            quantity,
            price,
            order_type: OrderType::Market,
        }
    }

    #[test]
    fn builder_basic() {
        let venue = MockVenue::builder()
            .with_balances(Balances::new(dec!(10), dec!(1000)))
            .build();
        let b = venue.balances("me", &pair()).unwrap();
        assert_eq!(b.asset, dec!(10));
        assert_eq!(b.quote, dec!(1000));
    }

    #[test]
    fn scripted_account_failures() {
        let venue = MockVenue::builder().fail_account_loads(1).build();
        assert!(matches!(
            venue.balances("me", &pair()),
            Err(BrokerError::AccountLoad(_))
        ));
        assert!(venue.balances("me", &pair()).is_ok());
    }

    #[test]
    fn full_fill_settles_balances() {
        let venue = MockVenue::builder()
            .with_balances(Balances::new(dec!(10), dec!(1000)))
            .build();

        let handle = venue.submit(&order(Side::Sell, dec!(2), dec!(50))).unwrap();
        assert_eq!(handle.status, OrderState::Filled);
        assert_eq!(handle.executed_quantity, dec!(2));
        assert_eq!(handle.id, OrderId("mock-1".into()));
        assert_eq!(venue.current_balances(), Balances::new(dec!(8), dec!(1100)));

        venue.submit(&order(Side::Buy, dec!(1), dec!(50))).unwrap();
        assert_eq!(venue.current_balances(), Balances::new(dec!(9), dec!(1050)));
        assert_eq!(venue.submitted_orders().len(), 2);
    }

    #[test]
    fn partial_fill() {
        let venue = MockVenue::builder()
            .fill_mode(FillMode::ImmediatePartial(dec!(0.5)))
            .with_balances(Balances::new(dec!(10), dec!(0)))
            .build();
        let handle = venue.submit(&order(Side::Sell, dec!(4), dec!(10))).unwrap();
        assert_eq!(handle.status, OrderState::PartiallyFilled);
        assert_eq!(handle.executed_quantity, dec!(2));
        assert_eq!(venue.current_balances(), Balances::new(dec!(8), dec!(20)));
    }

    #[test]
    fn reject_mode_still_records() {
        let venue = MockVenue::builder().fill_mode(FillMode::Reject).build();
        let err = venue.submit(&order(Side::Buy, dec!(1), dec!(1))).unwrap_err();
        assert!(matches!(err, BrokerError::OrderSubmission(_)));
        assert_eq!(venue.submitted_orders().len(), 1);
    }

    #[test]
    fn recorded_orders_are_capped() {
        let venue = MockVenue::builder()
            .fill_mode(FillMode::Reject)
            .max_recorded_orders(2)
            .build();
        for qty in [dec!(1), dec!(2), dec!(3)] {
            let _ = venue.submit(&order(Side::Buy, qty, dec!(1)));
        }
        let quantities: Vec<_> = venue.submitted_orders().iter().map(|o| o.quantity).collect();
        assert_eq!(quantities, vec![dec!(2), dec!(3)]);
    }

    #[test]
    fn recording_can_be_disabled() {
        let venue = MockVenue::builder()
            .with_balances(Balances::new(dec!(10), dec!(1000)))
            .max_recorded_orders(0)
            .build();
        venue.submit(&order(Side::Sell, dec!(1), dec!(50))).unwrap();
        assert!(venue.submitted_orders().is_empty());
        assert_eq!(venue.current_balances(), Balances::new(dec!(9), dec!(1050)));
    }

    #[test]
    fn default_cap() {
        let venue = MockVenue::builder().fill_mode(FillMode::Reject).build();
        for _ in 0..DEFAULT_RECORDED_ORDERS + 5 {
            let _ = venue.submit(&order(Side::Buy, dec!(1), dec!(1)));
        }
        assert_eq!(venue.submitted_orders().len(), DEFAULT_RECORDED_ORDERS);
    }

    #[test]
    fn insufficient_balance_rejected() {
        let venue = MockVenue::builder()
            .with_balances(Balances::new(dec!(1), dec!(10)))
            .build();
        assert!(venue.submit(&order(Side::Buy, dec!(1), dec!(50))).is_err());
        assert!(venue.submit(&order(Side::Sell, dec!(2), dec!(50))).is_err());
        assert_eq!(venue.current_balances(), Balances::new(dec!(1), dec!(10)));
    }

    #[test]
    fn fixed_source() {
        let src = FixedPriceSource::new("oracle", ProviderKind::PrimaryOracle, dec!(142.5));
        let price = src.fetch_mid_price(&pair()).unwrap();
        assert_eq!(price.mid_price, dec!(142.5));
        assert_eq!(price.provider, "oracle");
        assert_eq!(price.pair_symbol, "SOL/USDC");
    }

    #[test]
    fn fixed_source_zero_price_unavailable() {
        let src = FixedPriceSource::new("oracle", ProviderKind::PrimaryOracle, dec!(0));
        assert!(matches!(
            src.fetch_mid_price(&pair()),
            Err(BrokerError::PriceUnavailable { .. })
        ));
    }

    #[test]
    fn scripted_source_replays_then_falls_back() {
        let src = ScriptedPriceSource::new("book", ProviderKind::OrderBook)
            .then_fail("timeout")
            .then_price(dec!(100))
            .otherwise(dec!(101));

        assert!(src.fetch_mid_price(&pair()).is_err());
        assert_eq!(src.fetch_mid_price(&pair()).unwrap().mid_price, dec!(100));
        assert_eq!(src.fetch_mid_price(&pair()).unwrap().mid_price, dec!(101));
        assert_eq!(src.fetch_mid_price(&pair()).unwrap().mid_price, dec!(101));
    }

    #[test]
    fn scripted_source_exhausted() {
        let src = ScriptedPriceSource::new("book", ProviderKind::OrderBook);
        assert!(src.fetch_mid_price(&pair()).is_err());
    }
}
