//! SDK configuration
//!
//! A [`Config`] comes from a JSON file or from environment variables
//! (`ETH_NODE_URL`, `WALLET_PRIVATE_KEY`, ...).

use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy::primitives::Address;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::address::parse_address;
use crate::client::RpcClient;
use crate::error::{Error, Result};
use crate::price::{CoinGeckoPriceFeed, DEFAULT_PRICE_FEED_URL};
use crate::wallet::Wallet;

pub const ENV_RPC_URL: &str = "ETH_NODE_URL";
pub const ENV_PRIVATE_KEY: &str = "WALLET_PRIVATE_KEY";
pub const ENV_BATCH_CONTRACT: &str = "BATCH_CONTRACT_ADDRESS";
pub const ENV_TOKEN: &str = "TOKEN_ADDRESS";
pub const ENV_PRICE_FEED_URL: &str = "PRICE_FEED_URL";
pub const ENV_RPC_USER: &str = "RPC_USER";
pub const ENV_RPC_PASSWORD: &str = "RPC_PASSWORD";

fn secs<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Duration, D::Error> {
    u64::deserialize(d).map(Duration::from_secs)
}

fn optional_secs<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<Duration>, D::Error> {
    Option::<u64>::deserialize(d).map(|s| s.map(Duration::from_secs))
}

/// Upper bounds for every suspension point of a batch flow. Values are
/// given in seconds in config files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Any single node or price feed request
    #[serde(deserialize_with = "secs")]
    pub rpc: Duration,
    /// Operator answer; expiry counts as a decline. An explicit `null` in a
    /// config file waits indefinitely.
    #[serde(deserialize_with = "optional_secs")]
    pub confirmation: Option<Duration>,
    /// Submission to finality, per transaction
    #[serde(deserialize_with = "secs")]
    pub finality: Duration,
    /// Delay between receipt polls
    #[serde(deserialize_with = "secs")]
    pub poll_interval: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            rpc: Duration::from_secs(30),
            confirmation: Some(Duration::from_secs(300)),
            finality: Duration::from_secs(300),
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Behavior knobs of the batch orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransferOptions {
    /// Blocks that must include a transaction before it counts as final
    pub confirmations: u64,
    /// Read the current allowance first and skip `approve` when it already
    /// covers the batch total
    pub skip_approval_if_sufficient: bool,
    pub timeouts: Timeouts,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            confirmations: 1,
            skip_approval_if_sufficient: true,
            timeouts: Timeouts::default(),
        }
    }
}

fn default_price_feed_url() -> String {
    DEFAULT_PRICE_FEED_URL.to_string()
}

fn default_coin_id() -> String {
    "ethereum".to_string()
}

fn default_fiat_currency() -> String {
    "usd".to_string()
}

/// Everything needed to construct a [`crate::transaction::BatchTransfer`]
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// JSON-RPC endpoint of the node
    pub rpc_url: String,
    #[serde(default)]
    pub rpc_user: Option<String>,
    #[serde(default)]
    pub rpc_password: Option<SecretString>,
    /// Hex private key of the funding account
    pub private_key: SecretString,
    /// Deployed batch/multi-send contract
    pub batch_contract: Address,
    /// Default ERC-20 token for token batches
    #[serde(default)]
    pub token: Option<Address>,
    #[serde(default = "default_price_feed_url")]
    pub price_feed_url: String,
    #[serde(default = "default_coin_id")]
    pub price_coin_id: String,
    #[serde(default = "default_fiat_currency")]
    pub fiat_currency: String,
    #[serde(default)]
    pub transfer: TransferOptions,
}

impl Config {
    /// Per-user config file location, e.g. `~/.config/flow-batcher/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("flow-batcher").join("config.json"))
    }

    /// Read a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read the configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            non_empty(key).ok_or_else(|| Error::Config(format!("{} is not set", key)))
        };
        let address = |key: &str, raw: String| {
            parse_address(&raw).map_err(|e| Error::Config(format!("{}: {}", key, e)))
        };

        let batch_contract = address(ENV_BATCH_CONTRACT, required(ENV_BATCH_CONTRACT)?)?;
        let token = non_empty(ENV_TOKEN)
            .map(|raw| address(ENV_TOKEN, raw))
            .transpose()?;

        let config = Config {
            rpc_url: required(ENV_RPC_URL)?,
            rpc_user: non_empty(ENV_RPC_USER),
            rpc_password: non_empty(ENV_RPC_PASSWORD).map(SecretString::new),
            private_key: SecretString::new(required(ENV_PRIVATE_KEY)?),
            batch_contract,
            token,
            price_feed_url: non_empty(ENV_PRICE_FEED_URL).unwrap_or_else(default_price_feed_url),
            price_coin_id: default_coin_id(),
            fiat_currency: default_fiat_currency(),
            transfer: TransferOptions::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Explicit file, else the per-user file if present, else the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(default) if default.is_file() => Self::from_file(default),
            _ => Self::from_env(),
        }
    }

    /// Reject configurations that cannot possibly work
    pub fn validate(&self) -> Result<()> {
        let url = self.rpc_url.trim();
        if url.is_empty() {
            return Err(Error::Config("RPC URL is empty".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!("RPC URL {} must be http(s)", url)));
        }
        if self.private_key.expose_secret().trim().is_empty() {
            return Err(Error::Config("Private key is empty".to_string()));
        }
        if self.batch_contract == Address::ZERO {
            return Err(Error::Config("Batch contract address is the zero address".to_string()));
        }
        if self.token == Some(Address::ZERO) {
            return Err(Error::Config("Token address is the zero address".to_string()));
        }
        if self.transfer.confirmations == 0 {
            return Err(Error::Config("Confirmations must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn rpc_client(&self) -> RpcClient {
        match (&self.rpc_user, &self.rpc_password) {
            (Some(user), Some(password)) => RpcClient::with_auth(
                self.rpc_url.clone(),
                user.clone(),
                password.expose_secret().clone(),
            ),
            _ => RpcClient::new(self.rpc_url.clone()),
        }
    }

    pub fn wallet(&self) -> Result<Wallet> {
        Wallet::from_private_key(&self.private_key)
    }

    pub fn price_feed(&self) -> CoinGeckoPriceFeed {
        CoinGeckoPriceFeed::new(
            self.price_feed_url.clone(),
            self.price_coin_id.clone(),
            self.fiat_currency.clone(),
        )
    }
}
