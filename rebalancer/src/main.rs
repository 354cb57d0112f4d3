//! CLI entry point for the driftguard rebalancer.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use driftguard::{MarketOrder, evaluate_snapshot};

use driftguard_rebalancer::audit::AuditLog;
use driftguard_rebalancer::config::Config;
use driftguard_rebalancer::context::RebalanceContext;
use driftguard_rebalancer::cycle::{self, LoopSummary, RebalanceLoop};
use driftguard_rebalancer::error::{Error, Result};
use driftguard_rebalancer::shutdown::Shutdown;

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Keep a two-asset portfolio at its target split")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebalance every interval until Ctrl-C
    Run {
        /// Log orders instead of submitting them
        #[arg(long)]
        dry_run: bool,

        /// Stop after this many cycles
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        cycles: Option<u64>,
    },

    /// Run a single cycle (for cron)
    Once {
        /// Log the order instead of submitting it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show every source's current price
    Prices,

    /// Show balances and the current decision without trading
    Status,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let (dry_run, max_cycles) = match &cli.command {
        Command::Run { dry_run, cycles } => (*dry_run, *cycles),
        Command::Once { dry_run } => (*dry_run, Some(1)),
        // Read-only commands never reach the executor
        Command::Prices | Command::Status => (true, None),
    };

    let ctx = match RebalanceContext::from_config(&config, dry_run) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Run { .. } => run(&config, &ctx, max_cycles).map(|_| 0),
        Command::Once { .. } => run(&config, &ctx, max_cycles).map(|s| s.cycles_failed),
        Command::Prices => show_prices(&ctx),
        Command::Status => show_status(&ctx),
    };

    // Exit 2 when a one-shot cycle or a price source failed
    match result {
        Ok(0) => {}
        Ok(_) => process::exit(2),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn run(config: &Config, ctx: &RebalanceContext, max_cycles: Option<u64>) -> Result<LoopSummary> {
    let mut audit = AuditLog::open(&config.audit_path())?;

    let shutdown = Shutdown::new().map_err(Error::Runtime)?;
    if let Err(e) = shutdown.cancel_on_ctrl_c() {
        log::warn!("Ctrl-C handler not installed: {e}");
    }

    let summary = RebalanceLoop::new(ctx, &mut audit).run(&shutdown, max_cycles);
    println!("{summary}");
    Ok(summary)
}

fn show_prices(ctx: &RebalanceContext) -> Result<u64> {
    let readings = cycle::fetch_prices(ctx);
    let mut failed = 0;

    println!("{:<16} {:<18} {:>14}", "Source", "Kind", "Mid");
    println!("{}", "-".repeat(50));
    for reading in &readings {
        let marker = if reading.source == ctx.authoritative_source {
            " *"
        } else {
            ""
        };
        match &reading.result {
            Ok(price) => println!(
                "{:<16} {:<18} {:>14}{marker}",
                reading.source,
                reading.kind.to_string(),
                price.mid_price.to_string()
            ),
            Err(e) => {
                failed += 1;
                println!(
                    "{:<16} {:<18} {:>14}{marker}  {e}",
                    reading.source,
                    reading.kind.to_string(),
                    "-"
                );
            }
        }
    }
    Ok(failed)
}

fn show_status(ctx: &RebalanceContext) -> Result<u64> {
    let readings = cycle::fetch_prices(ctx);
    let price = cycle::authoritative_price(ctx, &readings)?;
    let snapshot = ctx.account.current_snapshot(&ctx.owner, &ctx.pair, &price)?;
    let evaluation = evaluate_snapshot(&snapshot, &ctx.policy)?;

    println!("Pair:      {}", ctx.pair);
    println!("Price:     {price}");
    println!(
        "Holdings:  {} {} ({} {}), {} {}",
        snapshot.asset_balance,
        ctx.pair.asset,
        snapshot.asset_value,
        ctx.pair.quote,
        snapshot.quote_balance,
        ctx.pair.quote
    );
    println!("Portfolio: {} {}", evaluation.portfolio_value, ctx.pair.quote);
    println!(
        "Target:    {} {} in {} (tolerance {})",
        evaluation.target_value, ctx.pair.quote, ctx.pair.asset, ctx.policy.tolerance
    );
    println!("Offset:    {} ({})", evaluation.offset, evaluation.offset_percentage.round_dp(6));
    println!("Decision:  {}", evaluation.decision);

    match MarketOrder::from_decision(&evaluation.decision, &price, &ctx.pair)? {
        Some(order) => println!("Order:     {order}"),
        None if evaluation.decision.is_action() => println!("Order:     below one lot"),
        None => {}
    }
    Ok(0)
}
