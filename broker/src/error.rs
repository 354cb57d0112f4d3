//! Broker error types.

/// Errors that can occur talking to an external collaborator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BrokerError {
    #[error("price unavailable from {provider}: {reason}")]
    PriceUnavailable { provider: String, reason: String },

    #[error("account load error: {0}")]
    AccountLoad(String),

    #[error("order submission error: {0}")]
    OrderSubmission(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("connection error: {0}")]
    Connection(String),
}

impl BrokerError {
    pub fn price_unavailable(provider: impl Into<String>, reason: impl ToString) -> Self {
        BrokerError::PriceUnavailable {
            provider: provider.into(),
            reason: reason.to_string(),
        }
    }
}
