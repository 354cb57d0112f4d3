//! Everything a rebalance cycle needs, assembled once at startup.

use std::sync::Arc;
use std::time::Duration;

use driftguard::{Balances, Pair, RebalancePolicy};
use driftguard_broker::binance::auth::Credentials;
use driftguard_broker::binance::client::{BinanceClient, Network};
use driftguard_broker::binance::{BinanceAccount, BinanceExecutor, BinancePriceSource, PriceEndpoint};
use driftguard_broker::mock::{FixedPriceSource, MockVenue};
use driftguard_broker::{AccountProvider, OrderExecutor, PriceSource, ProviderKind};
use log::info;
use rust_decimal::Decimal;

use crate::config::{Config, PriceSourceConfig, SourceProvider, VenueKind};
use crate::dry_run::DryRunExecutor;
use crate::error::{Error, Result};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Read-only state shared by every cycle.
pub struct RebalanceContext {
    pub pair: Pair,
    pub policy: RebalancePolicy,
    pub owner: String,
    /// Name of the source whose price drives decisions.
    pub authoritative_source: String,
    pub interval: Duration,
    pub max_divergence_bps: Option<Decimal>,
    pub sources: Vec<Box<dyn PriceSource>>,
    pub account: Arc<dyn AccountProvider>,
    pub executor: Arc<dyn OrderExecutor>,
}

impl RebalanceContext {
    /// Fails with [`Error::UnknownSource`] if no source is named `authoritative_source`.
    pub fn new(
        pair: Pair,
        policy: RebalancePolicy,
        owner: impl Into<String>,
        authoritative_source: impl Into<String>,
        sources: Vec<Box<dyn PriceSource>>,
        account: Arc<dyn AccountProvider>,
        executor: Arc<dyn OrderExecutor>,
    ) -> Result<Self> {
        let authoritative_source = authoritative_source.into();
        if !sources.iter().any(|s| s.name() == authoritative_source) {
            return Err(Error::UnknownSource(authoritative_source));
        }
        Ok(Self {
            pair,
            policy,
            owner: owner.into(),
            authoritative_source,
            interval: DEFAULT_INTERVAL,
            max_divergence_bps: None,
            sources,
            account,
            executor,
        })
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_divergence_bps(mut self, bps: Option<Decimal>) -> Self {
        self.max_divergence_bps = bps;
        self
    }

    /// Register the configured sources, account provider and executor.
    ///
    /// With `dry_run` the venue's executor is replaced by [`DryRunExecutor`];
    /// balances still come from the venue.
    pub fn from_config(config: &Config, dry_run: bool) -> Result<Self> {
        let pair = config.pair()?;
        let policy = config.policy()?;
        let network = Network::from(config.venue.network);

        let credentials = match (&config.venue.kind, &config.venue.credentials_file) {
            (VenueKind::Binance, Some(path)) => Some(Credentials::from_file(path)?),
            (VenueKind::Binance, None) => {
                return Err(Error::Config(
                    "venue 'binance' requires credentials_file".into(),
                ));
            }
            (VenueKind::Paper, _) => None,
        };

        let client = if config.venue.kind == VenueKind::Binance || config.uses_binance_prices() {
            Some(Arc::new(BinanceClient::new(network, credentials)?))
        } else {
            None
        };

        let sources = config
            .price_sources
            .iter()
            .map(|source| build_source(source, client.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let (account, executor): (Arc<dyn AccountProvider>, Arc<dyn OrderExecutor>) =
            match (config.venue.kind, &client) {
                (VenueKind::Paper, _) => {
                    let venue = Arc::new(
                        MockVenue::builder()
                            .with_balances(Balances::new(
                                config.paper.asset_balance,
                                config.paper.quote_balance,
                            ))
                            .max_recorded_orders(0)
                            .build(),
                    );
                    info!(
                        "paper venue: {} {}, {} {}",
                        config.paper.asset_balance, pair.asset, config.paper.quote_balance, pair.quote
                    );
                    let account: Arc<dyn AccountProvider> = venue.clone();
                    let executor: Arc<dyn OrderExecutor> = venue;
                    (account, executor)
                }
                (VenueKind::Binance, Some(client)) => {
                    client.ping()?;
                    info!("connected to Binance {network:?}");
                    let account: Arc<dyn AccountProvider> =
                        Arc::new(BinanceAccount::new(client.clone()));
                    let executor: Arc<dyn OrderExecutor> =
                        Arc::new(BinanceExecutor::new(client.clone()));
                    (account, executor)
                }
                (VenueKind::Binance, None) => {
                    return Err(Error::Config("Binance client was not created".into()));
                }
            };

        let executor: Arc<dyn OrderExecutor> = if dry_run {
            info!("dry run: orders will be logged, not submitted");
            Arc::new(DryRunExecutor::new())
        } else {
            executor
        };

        Ok(Self::new(
            pair,
            policy,
            &config.account.owner,
            &config.strategy.authoritative_source,
            sources,
            account,
            executor,
        )?
        .with_interval(config.interval())
        .with_max_divergence_bps(config.strategy.max_divergence_bps))
    }

    /// Names of the configured sources, in registration order.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }
}

fn build_source(
    config: &PriceSourceConfig,
    client: Option<&Arc<BinanceClient>>,
) -> Result<Box<dyn PriceSource>> {
    let kind = ProviderKind::from(config.kind);
    let endpoint = match config.provider {
        SourceProvider::Fixed => {
            let price = config.price.ok_or_else(|| {
                Error::Config(format!("fixed source '{}' needs a price", config.name))
            })?;
            return Ok(Box::new(FixedPriceSource::new(&config.name, kind, price)));
        }
        SourceProvider::BinanceBookTicker => PriceEndpoint::BookTicker,
        SourceProvider::BinanceAvgPrice => PriceEndpoint::AvgPrice,
        SourceProvider::BinanceLastPrice => PriceEndpoint::LastPrice,
    };
    let client = client
        .ok_or_else(|| Error::Config(format!("source '{}' needs a Binance client", config.name)))?;
    Ok(Box::new(BinancePriceSource::new(
        &config.name,
        kind,
        endpoint,
        client.clone(),
    )))
}
