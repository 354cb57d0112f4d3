//! JSONL audit trail logging.
//!
//! Each rebalancer run appends events to an audit.jsonl file,
//! one JSON object per line.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use driftguard::{Evaluation, MarketOrder, PortfolioSnapshot, Price};
use driftguard_broker::OrderHandle;
use serde::Serialize;

use crate::context::RebalanceContext;
use crate::cycle::{LoopSummary, PriceReading};
use crate::error::Result;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }
}

/// Convenience: log loop start with the settings it runs under.
pub fn log_loop_started(audit: &mut AuditLog, ctx: &RebalanceContext) -> Result<()> {
    audit.log(
        "loop_started",
        serde_json::json!({
            "pair": ctx.pair.symbol(),
            "owner": ctx.owner,
            "target_fraction": ctx.policy.target_fraction,
            "tolerance": ctx.policy.tolerance,
            "interval_secs": ctx.interval.as_secs(),
            "authoritative_source": ctx.authoritative_source,
            "sources": ctx.source_names(),
        }),
    )
}

pub fn log_cycle_started(audit: &mut AuditLog, cycle: u64) -> Result<()> {
    audit.log("cycle_started", serde_json::json!({ "cycle": cycle }))
}

/// Convenience: log every source's result, successful or not.
pub fn log_prices(
    audit: &mut AuditLog,
    cycle: u64,
    readings: &[PriceReading],
    authoritative: Option<&Price>,
) -> Result<()> {
    let price_data: Vec<_> = readings
        .iter()
        .map(|r| match &r.result {
            Ok(price) => serde_json::json!({
                "source": r.source,
                "kind": r.kind.to_string(),
                "mid_price": price.mid_price,
                "divergence_bps": authoritative
                    .and_then(|a| price.divergence_bps(a))
                    .map(|bps| bps.round_dp(2)),
            }),
            Err(e) => serde_json::json!({
                "source": r.source,
                "kind": r.kind.to_string(),
                "error": e.to_string(),
            }),
        })
        .collect();

    audit.log(
        "prices_fetched",
        serde_json::json!({ "cycle": cycle, "prices": price_data }),
    )
}

pub fn log_snapshot(
    audit: &mut AuditLog,
    cycle: u64,
    snapshot: &PortfolioSnapshot,
    price: &Price,
) -> Result<()> {
    audit.log(
        "snapshot",
        serde_json::json!({
            "cycle": cycle,
            "price": price.mid_price,
            "provider": price.provider,
            "asset_balance": snapshot.asset_balance,
            "quote_balance": snapshot.quote_balance,
            "asset_value": snapshot.asset_value,
            "quote_value": snapshot.quote_value,
        }),
    )
}

pub fn log_decision(audit: &mut AuditLog, cycle: u64, evaluation: &Evaluation) -> Result<()> {
    audit.log(
        "decision",
        serde_json::json!({
            "cycle": cycle,
            "portfolio_value": evaluation.portfolio_value,
            "target_value": evaluation.target_value,
            "offset": evaluation.offset,
            "offset_percentage": evaluation.offset_percentage,
            "decision": evaluation.decision.to_string(),
        }),
    )
}

pub fn log_order_submitted(
    audit: &mut AuditLog,
    cycle: u64,
    order: &MarketOrder,
    handle: &OrderHandle,
) -> Result<()> {
    audit.log(
        "order_submitted",
        serde_json::json!({
            "cycle": cycle,
            "pair": order.pair_symbol,
            "side": order.side.to_string(),
            "quantity": order.quantity,
            "price": order.price,
            "notional": order.notional(),
            "order_id": handle.id.to_string(),
            "status": handle.status.to_string(),
            "executed_quantity": handle.executed_quantity,
        }),
    )
}

/// Convenience: log a decision that produced no order.
pub fn log_order_skipped(audit: &mut AuditLog, cycle: u64, reason: &str) -> Result<()> {
    audit.log(
        "order_skipped",
        serde_json::json!({ "cycle": cycle, "reason": reason }),
    )
}

pub fn log_cycle_failed(audit: &mut AuditLog, cycle: u64, error: &str) -> Result<()> {
    audit.log(
        "cycle_failed",
        serde_json::json!({ "cycle": cycle, "error": error }),
    )
}

pub fn log_loop_stopped(audit: &mut AuditLog, summary: &LoopSummary) -> Result<()> {
    audit.log(
        "loop_stopped",
        serde_json::json!({
            "cycles": summary.cycles,
            "orders_submitted": summary.orders_submitted,
            "cycles_failed": summary.cycles_failed,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_log_writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_audit.jsonl");

        {
            let mut log = AuditLog::open(&path).unwrap();
            log.log_simple("test_event").unwrap();
            log_cycle_failed(&mut log, 3, "price unavailable").unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        // Each line should be valid JSON
        for line in &lines {
            let _: serde_json::Value = serde_json::from_str(line).unwrap();
        }

        assert!(lines[0].contains("\"event\":\"test_event\""));

        let failed: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(failed["event"], "cycle_failed");
        assert_eq!(failed["cycle"], 3);
        assert_eq!(failed["error"], "price unavailable");
    }

    #[test]
    fn audit_log_appends_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        AuditLog::open(&path).unwrap().log_simple("first").unwrap();
        AuditLog::open(&path).unwrap().log_simple("second").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn audit_log_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subdir").join("deep").join("audit.jsonl");

        let mut log = AuditLog::open(&path).unwrap();
        log.log_simple("test").unwrap();

        assert!(path.exists());
    }
}
