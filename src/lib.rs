//! # Flow Batcher SDK
//!
//! A Rust SDK for paying many recipients in a single EVM transaction through
//! a deployed batch (multi-send) contract.
//!
//! This SDK provides:
//! - Native coin batches, where the transaction value is the batch total
//! - ERC-20 batches, with the allowance raised to the batch total first
//! - Gas estimation with a native-coin and fiat cost breakdown
//! - An operator confirmation gate between estimation and submission
//!
//! ## Flow
//!
//! Every batch goes through validating, approving (tokens only), estimating,
//! awaiting confirmation, submitting and awaiting finality. A declined prompt
//! ends the flow as cancelled with nothing submitted after the approval.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use flow_batcher_sdk::config::Config;
//! use flow_batcher_sdk::confirm::StdinConfirmation;
//! use flow_batcher_sdk::transaction::BatchTransfer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let transfer = BatchTransfer::from_config(&config, Arc::new(StdinConfirmation::stdio()))?;
//!
//! let outcome = transfer
//!     .batch_transfer_native(
//!         &["0x93297d48A40446dc84a388BB94F3A1247CB74870"],
//!         &["0.1"],
//!     )
//!     .await?;
//! println!("{:?}", outcome.state());
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod amount;
pub mod chain;
pub mod client;
pub mod config;
pub mod confirm;
pub mod contract;
pub mod error;
pub mod fees;
pub mod price;
pub mod rpc;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use error::{Error, Result, ValidationError};

/// Re-export commonly used types
pub use types::*;

pub use alloy::primitives::{Address, TxHash, U256};
pub use chain::{ChainClient, EvmChainClient};
pub use config::{Config, Timeouts, TransferOptions};
pub use confirm::{Confirmation, ScriptedConfirmation, StdinConfirmation};
pub use fees::GasEstimator;
pub use price::{CoinGeckoPriceFeed, PriceFeed};
pub use transaction::BatchTransfer;
