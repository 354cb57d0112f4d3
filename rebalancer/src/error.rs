//! Error types for the rebalancer.

use std::path::PathBuf;

use driftguard::RebalanceError;
use driftguard_broker::BrokerError;

/// All errors that can occur during rebalancer operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("decision error: {0}")]
    Decision(#[from] RebalanceError),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("no price source named '{0}'")]
    UnknownSource(String),

    #[error("cannot start timer runtime: {0}")]
    Runtime(std::io::Error),

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
