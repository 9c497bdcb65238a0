use std::time::Duration;

use alloy::primitives::TxHash;
use thiserror::Error;

/// Local input errors. These are always raised before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("recipients and amounts must not be empty")]
    EmptyInput,

    #[error("recipients and amounts differ in length: {recipients} recipients, {amounts} amounts")]
    LengthMismatch { recipients: usize, amounts: usize },

    #[error("recipient {index} has an invalid address: {address}")]
    InvalidAddress { index: usize, address: String },

    #[error("amount {index} is invalid ({amount}): {reason}")]
    InvalidAmount {
        index: usize,
        amount: String,
        reason: String,
    },
}

/// Error types for the Flow Batcher SDK
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Token approval failed: {0}")]
    ApprovalFailed(#[source] Box<Error>),

    #[error("Gas estimation failed: {0}")]
    EstimationFailed(#[source] Box<Error>),

    #[error("Batch submission failed: {0}")]
    SubmissionFailed(#[source] Box<Error>),

    #[error("Transaction {tx_hash} not final after {waited:?}")]
    FinalityTimeout { tx_hash: TxHash, waited: Duration },

    #[error("Transaction {tx_hash} reverted")]
    Reverted { tx_hash: TxHash },

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Signer error: {0}")]
    Signer(String),

    #[error("Price feed error: {0}")]
    PriceFeed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl Error {
    pub(crate) fn approval(err: Error) -> Self {
        Error::ApprovalFailed(Box::new(err))
    }

    pub(crate) fn estimation(err: Error) -> Self {
        Error::EstimationFailed(Box::new(err))
    }

    pub(crate) fn submission(err: Error) -> Self {
        Error::SubmissionFailed(Box::new(err))
    }

    /// Whether the error was raised locally before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, Error>;
