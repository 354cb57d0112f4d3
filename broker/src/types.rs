//! Shared venue types: provider kinds, order handles.

use std::fmt;

use rust_decimal::Decimal;

/// Which family of price provider a source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    PrimaryOracle,
    SecondaryOracle,
    /// Mid-price derived from the venue's own bids and asks.
    OrderBook,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::PrimaryOracle => write!(f, "primary-oracle"),
            ProviderKind::SecondaryOracle => write!(f, "secondary-oracle"),
            ProviderKind::OrderBook => write!(f, "order-book"),
        }
    }
}

/// Opaque order ID returned by the executor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderId(pub String);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a submitted order, as far as the executor knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    Submitted,
    PartiallyFilled,
    Filled,
    /// Accepted locally but never sent to a venue.
    DryRun,
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderState::Submitted => write!(f, "SUBMITTED"),
            OrderState::PartiallyFilled => write!(f, "PARTIAL"),
            OrderState::Filled => write!(f, "FILLED"),
            OrderState::DryRun => write!(f, "DRY RUN"),
        }
    }
}

/// What an executor returns for an accepted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderHandle {
    pub id: OrderId,
    pub status: OrderState,
    /// Asset quantity executed so far.
    pub executed_quantity: Decimal,
}

impl fmt::Display for OrderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (executed {})",
            self.id, self.status, self.executed_quantity
        )
    }
}
