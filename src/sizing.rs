//! Quote amount → asset quantity.

use rust_decimal::Decimal;

use crate::error::RebalanceError;
use crate::price::Price;

/// Asset quantity worth `quote_amount` at `price`.
///
/// Not rounded; precision is applied when the order is built.
pub fn order_quantity(quote_amount: Decimal, price: &Price) -> Result<Decimal, RebalanceError> {
    if price.mid_price <= Decimal::ZERO {
        return Err(RebalanceError::InvalidPrice(price.mid_price));
    }
    quote_amount.checked_div(price.mid_price).ok_or_else(|| {
        RebalanceError::degenerate(format!(
            "{quote_amount} at {} overflows the order quantity",
            price.mid_price
        ))
    })
}
