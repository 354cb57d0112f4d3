//! Executor that logs orders instead of placing them.

use std::sync::atomic::{AtomicU64, Ordering};

use driftguard::MarketOrder;
use driftguard_broker::{BrokerError, OrderExecutor, OrderHandle, OrderId, OrderState};
use log::info;
use rust_decimal::Decimal;

/// Stands in for the venue executor under `--dry-run`.
#[derive(Default)]
pub struct DryRunExecutor {
    next_id: AtomicU64,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderExecutor for DryRunExecutor {
    fn submit(&self, order: &MarketOrder) -> Result<OrderHandle, BrokerError> {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        info!("[DRY RUN] would submit {order}");
        Ok(OrderHandle {
            id: OrderId(format!("dry-run-{n}")),
            status: OrderState::DryRun,
            executed_quantity: Decimal::ZERO,
        })
    }
}
