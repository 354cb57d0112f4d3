//! HMAC-SHA256 request signing and API credentials for Binance.

use std::fmt;
use std::path::Path;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::BrokerError;

type HmacSha256 = Hmac<Sha256>;

/// Sign a query string with HMAC-SHA256.
///
/// Returns the hex-encoded signature to append as `&signature=<sig>`.
pub fn sign(query_string: &str, secret_key: &str) -> String {
    // HMAC-SHA256 accepts keys of any length, so this never takes the error arm
    let mut mac = match HmacSha256::new_from_slice(secret_key.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(query_string.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// API key pair. The secret is wiped from memory on drop.
pub struct Credentials {
    pub api_key: String,
    secret_key: Zeroizing<String>,
}

#[derive(Deserialize)]
struct CredentialsFile {
    api_key: String,
    secret_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: Zeroizing::new(secret_key.into()),
        }
    }

    /// Load `{"api_key": "...", "secret_key": "..."}` from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, BrokerError> {
        let contents = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
            BrokerError::Auth(format!("failed to read {}: {e}", path.display()))
        })?);
        Self::from_json(&contents)
            .map_err(|e| BrokerError::Auth(format!("{}: {e}", path.display())))
    }

    /// Parse the credentials JSON document.
    pub fn from_json(json: &str) -> Result<Self, BrokerError> {
        let raw: CredentialsFile = serde_json::from_str(json)
            .map_err(|e| BrokerError::Auth(format!("invalid credentials: {e}")))?;
        if raw.api_key.is_empty() || raw.secret_key.is_empty() {
            return Err(BrokerError::Auth("api_key and secret_key must be set".into()));
        }
        Ok(Self::new(raw.api_key, raw.secret_key))
    }

    pub fn sign(&self, query_string: &str) -> String {
        sign(query_string, &self.secret_key)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}
