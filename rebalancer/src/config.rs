//! TOML configuration loading and validation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use driftguard::{Pair, RebalancePolicy};
use driftguard_broker::ProviderKind;
use driftguard_broker::binance::client::Network;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Largest precision accepted for an instrument.
const MAX_DECIMALS: u32 = 18;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub market: MarketConfig,
    pub strategy: StrategyConfig,
    pub account: AccountConfig,
    pub venue: VenueConfig,
    #[serde(default)]
    pub paper: PaperConfig,
    pub price_sources: Vec<PriceSourceConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    /// `ASSET/QUOTE`, e.g. `SOL/USDC`.
    pub pair: String,
    pub asset_decimals: u32,
    pub quote_decimals: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    #[serde(default = "default_target_fraction")]
    pub target_fraction: Decimal,
    #[serde(default = "default_tolerance")]
    pub tolerance: Decimal,
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Name of the price source whose price drives decisions.
    pub authoritative_source: String,
    /// Warn when another source strays this far from the authoritative one.
    #[serde(default)]
    pub max_divergence_bps: Option<Decimal>,
}

fn default_target_fraction() -> Decimal {
    RebalancePolicy::DEFAULT_TARGET_FRACTION
}
fn default_tolerance() -> Decimal {
    RebalancePolicy::DEFAULT_TOLERANCE
}
fn default_interval() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub owner: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VenueConfig {
    pub kind: VenueKind,
    #[serde(default = "default_network")]
    pub network: NetworkKind,
    /// JSON file holding `api_key` and `secret_key`. Required for `binance`.
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,
}

fn default_network() -> NetworkKind {
    NetworkKind::Testnet
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueKind {
    /// In-memory venue seeded from `[paper]`.
    Paper,
    Binance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    Testnet,
    Mainnet,
}

impl From<NetworkKind> for Network {
    fn from(kind: NetworkKind) -> Self {
        match kind {
            NetworkKind::Testnet => Network::Testnet,
            NetworkKind::Mainnet => Network::Mainnet,
        }
    }
}

/// Starting balances for the paper venue.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaperConfig {
    #[serde(default)]
    pub asset_balance: Decimal,
    #[serde(default)]
    pub quote_balance: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceSourceConfig {
    pub name: String,
    pub kind: SourceKind,
    pub provider: SourceProvider,
    /// Mid-price quoted by a `fixed` provider.
    #[serde(default)]
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    PrimaryOracle,
    SecondaryOracle,
    OrderBook,
}

impl From<SourceKind> for ProviderKind {
    fn from(kind: SourceKind) -> Self {
        match kind {
            SourceKind::PrimaryOracle => ProviderKind::PrimaryOracle,
            SourceKind::SecondaryOracle => ProviderKind::SecondaryOracle,
            SourceKind::OrderBook => ProviderKind::OrderBook,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceProvider {
    BinanceBookTicker,
    BinanceAvgPrice,
    BinanceLastPrice,
    Fixed,
}

impl SourceProvider {
    pub fn is_binance(self) -> bool {
        !matches!(self, SourceProvider::Fixed)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&contents)
    }

    /// Parse and validate config from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        self.pair()?;
        self.policy()?;

        if self.strategy.interval_secs == 0 {
            return Err(Error::Config("interval_secs must be > 0".into()));
        }
        if let Some(bps) = self.strategy.max_divergence_bps {
            if bps <= Decimal::ZERO {
                return Err(Error::Config("max_divergence_bps must be > 0".into()));
            }
        }
        if self.account.owner.trim().is_empty() {
            return Err(Error::Config("account owner must not be empty".into()));
        }
        if self.paper.asset_balance < Decimal::ZERO || self.paper.quote_balance < Decimal::ZERO
        {
            return Err(Error::Config("paper balances must be >= 0".into()));
        }
        if self.venue.kind == VenueKind::Binance && self.venue.credentials_file.is_none() {
            return Err(Error::Config(
                "venue 'binance' requires credentials_file".into(),
            ));
        }

        if self.price_sources.is_empty() {
            return Err(Error::Config("at least one price source is required".into()));
        }
        let mut names = HashSet::new();
        for source in &self.price_sources {
            if source.name.is_empty() {
                return Err(Error::Config("price source name must not be empty".into()));
            }
            if !names.insert(source.name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate price source '{}'",
                    source.name
                )));
            }
            match (source.provider, source.price) {
                (SourceProvider::Fixed, None) => {
                    return Err(Error::Config(format!(
                        "fixed source '{}' needs a price",
                        source.name
                    )));
                }
                (SourceProvider::Fixed, Some(price)) if price <= Decimal::ZERO => {
                    return Err(Error::Config(format!(
                        "fixed source '{}' price must be > 0",
                        source.name
                    )));
                }
                _ => {}
            }
        }
        if !names.contains(self.strategy.authoritative_source.as_str()) {
            return Err(Error::UnknownSource(
                self.strategy.authoritative_source.clone(),
            ));
        }
        Ok(())
    }

    /// The configured trading pair.
    pub fn pair(&self) -> Result<Pair> {
        let market = &self.market;
        if market.asset_decimals > MAX_DECIMALS || market.quote_decimals > MAX_DECIMALS {
            return Err(Error::Config(format!(
                "instrument decimals must be <= {MAX_DECIMALS}"
            )));
        }
        Pair::parse_symbol(&market.pair, market.asset_decimals, market.quote_decimals)
            .ok_or_else(|| {
                Error::Config(format!(
                    "pair '{}' must look like ASSET/QUOTE",
                    market.pair
                ))
            })
    }

    /// Target split and tolerance band.
    pub fn policy(&self) -> Result<RebalancePolicy> {
        RebalancePolicy::new(self.strategy.target_fraction, self.strategy.tolerance)
            .map_err(Error::Config)
    }

    /// Pause between cycles.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.strategy.interval_secs)
    }

    /// Whether any configured source reads Binance market data.
    pub fn uses_binance_prices(&self) -> bool {
        self.price_sources.iter().any(|s| s.provider.is_binance())
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn example_toml() -> &'static str {
        r#"
[market]
pair = "SOL/USDC"
asset_decimals = 3
quote_decimals = 2

[strategy]
target_fraction = 0.5
tolerance = 0.005
interval_secs = 30
authoritative_source = "book"
max_divergence_bps = 100

[account]
owner = "main"

[venue]
kind = "paper"

[paper]
asset_balance = 12.0
quote_balance = 400.0

[[price_sources]]
name = "book"
kind = "order_book"
provider = "binance_book_ticker"

[[price_sources]]
name = "avg"
kind = "primary_oracle"
provider = "binance_avg_price"

[[price_sources]]
name = "pinned"
kind = "secondary_oracle"
provider = "fixed"
price = 50.0

[logging]
dir = "./logs"
audit_file = "audit.jsonl"
"#
    }

    fn example() -> Config {
        toml::from_str(example_toml()).unwrap()
    }

    #[test]
    fn parse_example_config() {
        let config = Config::parse(example_toml()).unwrap();
        assert_eq!(config.market.pair, "SOL/USDC");
        assert_eq!(config.strategy.tolerance, dec!(0.005));
        assert_eq!(config.strategy.max_divergence_bps, Some(dec!(100)));
        assert_eq!(config.venue.kind, VenueKind::Paper);
        assert_eq!(config.venue.network, NetworkKind::Testnet);
        assert_eq!(config.paper.asset_balance, dec!(12));
        assert_eq!(config.price_sources.len(), 3);
        assert_eq!(config.price_sources[1].kind, SourceKind::PrimaryOracle);
        assert_eq!(config.price_sources[2].price, Some(dec!(50)));
        assert!(config.uses_binance_prices());
    }

    #[test]
    fn strategy_defaults_apply() {
        let toml = r#"
[market]
pair = "SOL/USDC"
asset_decimals = 3
quote_decimals = 2

[strategy]
authoritative_source = "fixed"

[account]
owner = "main"

[venue]
kind = "paper"

[[price_sources]]
name = "fixed"
kind = "order_book"
provider = "fixed"
price = 50
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.strategy.target_fraction, dec!(0.5));
        assert_eq!(config.strategy.tolerance, dec!(0.005));
        assert_eq!(config.interval(), Duration::from_secs(30));
        assert_eq!(config.strategy.max_divergence_bps, None);
        assert_eq!(config.paper.quote_balance, Decimal::ZERO);
        assert_eq!(config.audit_path(), Path::new("./logs").join("audit.jsonl"));
        assert!(!config.uses_binance_prices());
    }

    #[test]
    fn pair_and_policy() {
        let config = example();
        let pair = config.pair().unwrap();
        assert_eq!(pair.asset.decimals, 3);
        assert_eq!(pair.quote.symbol, "USDC");
        assert_eq!(config.policy().unwrap(), RebalancePolicy::default());
    }

    #[test]
    fn validate_catches_bad_pair() {
        let mut config = example();
        config.market.pair = "SOLUSDC".into();
        assert!(config.validate().is_err());

        let mut config = example();
        config.market.quote_decimals = 40;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_bad_fractions() {
        let mut config = example();
        config.strategy.target_fraction = dec!(1);
        assert!(config.validate().is_err());

        let mut config = example();
        config.strategy.target_fraction = Decimal::ZERO;
        assert!(config.validate().is_err());

        let mut config = example();
        config.strategy.tolerance = dec!(-0.1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_zero_interval() {
        let mut config = example();
        config.strategy.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_unknown_authoritative_source() {
        let mut config = example();
        config.strategy.authoritative_source = "oracle".into();
        assert!(matches!(
            config.validate(),
            Err(Error::UnknownSource(name)) if name == "oracle"
        ));
    }

    #[test]
    fn validate_catches_duplicate_source() {
        let mut config = example();
        let dup = config.price_sources[0].clone();
        config.price_sources.push(dup);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_fixed_source_without_price() {
        let mut config = example();
        config.price_sources[2].price = None;
        assert!(config.validate().is_err());

        let mut config = example();
        config.price_sources[2].price = Some(Decimal::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_binance_needs_credentials() {
        let mut config = example();
        config.venue.kind = VenueKind::Binance;
        assert!(config.validate().is_err());

        config.venue.credentials_file = Some("id.json".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_catches_empty_owner() {
        let mut config = example();
        config.account.owner = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_unknown_provider() {
        let toml = example_toml().replace("binance_avg_price", "pyth");
        assert!(matches!(Config::parse(&toml), Err(Error::ConfigParse(_))));
    }

    #[test]
    fn shipped_example_is_valid() {
        let config = Config::parse(include_str!("../config.example.toml")).unwrap();
        assert_eq!(config.strategy.authoritative_source, "book");
        assert_eq!(config.price_sources.len(), 3);
    }

    #[test]
    fn load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, example_toml()).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.account.owner, "main");
    }
}
