//! driftguard-rebalancer: keeps a two-asset portfolio at its target split.
//!
//! Every interval the loop fetches mid-prices from the configured sources,
//! loads the owner's balances, asks the decision engine whether the asset
//! side has drifted outside the tolerance band, and if so submits one market
//! order that brings it back. Every step lands in a JSONL audit trail.

pub mod audit;
pub mod config;
pub mod context;
pub mod cycle;
pub mod dry_run;
pub mod error;
pub mod shutdown;
