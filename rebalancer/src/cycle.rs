//! The rebalance loop: fetch prices, load balances, decide, submit, wait.
//!
//! One cycle runs end to end on the calling thread, except for price
//! fetches, which fan out over the rayon pool and are collected before
//! deciding.
//! A failed cycle is logged and audited; the loop carries on after the
//! normal wait. Only [`Shutdown`] or a cycle limit ends it.

use std::fmt;

use driftguard::{Evaluation, MarketOrder, Price, evaluate_snapshot};
use driftguard_broker::{BrokerError, OrderHandle, ProviderKind};
use log::{error, info, warn};
use rayon::prelude::*;
use rust_decimal::Decimal;

use crate::audit::{self, AuditLog};
use crate::context::RebalanceContext;
use crate::error::{Error, Result};
use crate::shutdown::Shutdown;

/// Where the loop is in its schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for the next cycle.
    Idle,
    /// A cycle is in progress.
    Evaluating,
}

/// One source's answer for a cycle.
#[derive(Debug)]
pub struct PriceReading {
    pub source: String,
    pub kind: ProviderKind,
    pub result: std::result::Result<Price, BrokerError>,
}

/// What a successful cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Inside the tolerance band.
    NoAction(Evaluation),
    /// A trade was due but rounds to less than one lot of the asset.
    BelowLotSize(Evaluation),
    Submitted {
        evaluation: Evaluation,
        order: MarketOrder,
        handle: OrderHandle,
    },
}

impl CycleOutcome {
    pub fn evaluation(&self) -> &Evaluation {
        match self {
            CycleOutcome::NoAction(e) | CycleOutcome::BelowLotSize(e) => e,
            CycleOutcome::Submitted { evaluation, .. } => evaluation,
        }
    }
}

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub cycles: u64,
    pub orders_submitted: u64,
    pub cycles_failed: u64,
}

impl fmt::Display for LoopSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cycles, {} orders submitted, {} failed",
            self.cycles, self.orders_submitted, self.cycles_failed
        )
    }
}

/// Query every source concurrently. Readings come back in registration order.
pub fn fetch_prices(ctx: &RebalanceContext) -> Vec<PriceReading> {
    ctx.sources
        .par_iter()
        .map(|source| PriceReading {
            source: source.name().to_string(),
            kind: source.kind(),
            result: source.fetch_mid_price(&ctx.pair),
        })
        .collect()
}

/// The authoritative source's price, after logging how the others compare.
///
/// Cross-checking only warns; it never blocks a trade.
pub fn authoritative_price(ctx: &RebalanceContext, readings: &[PriceReading]) -> Result<Price> {
    let reading = readings
        .iter()
        .find(|r| r.source == ctx.authoritative_source)
        .ok_or_else(|| Error::UnknownSource(ctx.authoritative_source.clone()))?;

    let price = match &reading.result {
        Ok(price) => price.clone(),
        Err(e) => return Err(Error::Broker(e.clone())),
    };

    for other in readings.iter().filter(|r| r.source != ctx.authoritative_source) {
        let Ok(other_price) = &other.result else {
            continue;
        };
        let Some(bps) = other_price.divergence_bps(&price).map(|d| d.round_dp(2)) else {
            warn!(
                "{} ({}) is n/a bps from {}",
                other.source, other_price.mid_price, ctx.authoritative_source
            );
            continue;
        };
        match ctx.max_divergence_bps {
            Some(max) if bps.abs() > max => warn!(
                "{} ({}) diverges {bps} bps from {} (limit {max})",
                other.source, other_price.mid_price, ctx.authoritative_source
            ),
            _ => info!(
                "{} ({}) is {bps} bps from {}",
                other.source, other_price.mid_price, ctx.authoritative_source
            ),
        }
    }

    Ok(price)
}

/// Drives cycles against a [`RebalanceContext`] and records them.
pub struct RebalanceLoop<'a> {
    ctx: &'a RebalanceContext,
    audit: &'a mut AuditLog,
    state: LoopState,
    summary: LoopSummary,
}

impl<'a> RebalanceLoop<'a> {
    pub fn new(ctx: &'a RebalanceContext, audit: &'a mut AuditLog) -> Self {
        Self {
            ctx,
            audit,
            state: LoopState::Idle,
            summary: LoopSummary::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn summary(&self) -> LoopSummary {
        self.summary
    }

    /// Run until cancelled, or until `max_cycles` cycles have completed.
    pub fn run(mut self, shutdown: &Shutdown, max_cycles: Option<u64>) -> LoopSummary {
        let ctx = self.ctx;
        self.record(|audit| audit::log_loop_started(audit, ctx));
        info!(
            "rebalancing {} for {} every {}s (target {}, tolerance {})",
            ctx.pair,
            ctx.owner,
            ctx.interval.as_secs(),
            ctx.policy.target_fraction,
            ctx.policy.tolerance
        );

        while !shutdown.is_cancelled() {
            self.step();

            if max_cycles.is_some_and(|max| self.summary.cycles >= max) {
                break;
            }
            if shutdown.wait_timeout(ctx.interval) {
                break;
            }
        }

        let summary = self.summary;
        self.record(|audit| audit::log_loop_stopped(audit, &summary));
        info!("loop stopped: {summary}");
        summary
    }

    /// Run one cycle, catching and recording its failure.
    pub fn step(&mut self) -> Option<CycleOutcome> {
        self.summary.cycles += 1;
        let cycle = self.summary.cycles;

        self.state = LoopState::Evaluating;
        let result = self.run_cycle(cycle);
        self.state = LoopState::Idle;

        match result {
            Ok(outcome) => {
                if matches!(outcome, CycleOutcome::Submitted { .. }) {
                    self.summary.orders_submitted += 1;
                }
                Some(outcome)
            }
            Err(e) => {
                error!("cycle {cycle} failed: {e}");
                self.summary.cycles_failed += 1;
                let message = e.to_string();
                self.record(|audit| audit::log_cycle_failed(audit, cycle, &message));
                None
            }
        }
    }

    fn run_cycle(&mut self, cycle: u64) -> Result<CycleOutcome> {
        let ctx = self.ctx;
        self.record(|audit| audit::log_cycle_started(audit, cycle));

        let readings = fetch_prices(ctx);
        for reading in &readings {
            match &reading.result {
                Ok(price) => info!("{} [{}]: {price}", reading.source, reading.kind),
                Err(e) if reading.source == ctx.authoritative_source => error!("{e}"),
                Err(e) => warn!("{e}"),
            }
        }

        let price = authoritative_price(ctx, &readings);
        self.record(|audit| audit::log_prices(audit, cycle, &readings, price.as_ref().ok()));
        let price = price?;

        let snapshot = ctx.account.current_snapshot(&ctx.owner, &ctx.pair, &price)?;
        info!("{}: {snapshot}", ctx.owner);
        self.record(|audit| audit::log_snapshot(audit, cycle, &snapshot, &price));

        let evaluation = evaluate_snapshot(&snapshot, &ctx.policy)?;
        info!(
            "portfolio {} {}, target {}, offset {} ({}%): {}",
            evaluation.portfolio_value,
            ctx.pair.quote,
            evaluation.target_value,
            evaluation.offset,
            (evaluation.offset_percentage * Decimal::ONE_HUNDRED).round_dp(3),
            evaluation.decision
        );
        self.record(|audit| audit::log_decision(audit, cycle, &evaluation));

        if !evaluation.decision.is_action() {
            return Ok(CycleOutcome::NoAction(evaluation));
        }

        let Some(order) = MarketOrder::from_decision(&evaluation.decision, &price, &ctx.pair)?
        else {
            let reason = format!(
                "{} is below one lot of {}",
                evaluation.decision, ctx.pair.asset
            );
            info!("skipping order: {reason}");
            self.record(|audit| audit::log_order_skipped(audit, cycle, &reason));
            return Ok(CycleOutcome::BelowLotSize(evaluation));
        };

        info!("submitting {order} (~{} {})", order.notional(), ctx.pair.quote);
        let handle = ctx.executor.submit(&order)?;
        info!("order {handle}");
        self.record(|audit| audit::log_order_submitted(audit, cycle, &order, &handle));

        Ok(CycleOutcome::Submitted {
            evaluation,
            order,
            handle,
        })
    }

    /// Write to the audit trail. A failed write is a warning, never a cycle failure.
    fn record(&mut self, write: impl FnOnce(&mut AuditLog) -> Result<()>) {
        if let Err(e) = write(&mut *self.audit) {
            warn!("audit write failed: {e}");
        }
    }
}
