//! Common types and data structures for the Flow Batcher SDK

use alloy::primitives::{Address, TxHash, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::address::parse_recipients;
use crate::error::ValidationError;

/// What a batch moves: the chain's native coin or a single ERC-20 token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Asset {
    Native,
    Token(Address),
}

impl Asset {
    /// Token identifier passed to the batch contract; the zero address
    /// selects native mode.
    pub fn contract_id(&self) -> Address {
        match self {
            Asset::Native => Address::ZERO,
            Asset::Token(token) => *token,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }
}

/// A validated batch of (recipient, amount) pairs.
///
/// Amounts stay as the caller's decimal strings until the token precision
/// is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    recipients: Vec<Address>,
    amounts: Vec<String>,
    asset: Asset,
}

impl TransferRequest {
    /// Build a request, running every local validation check.
    pub fn new<R, A>(
        recipients: &[R],
        amounts: &[A],
        asset: Asset,
    ) -> std::result::Result<Self, ValidationError>
    where
        R: AsRef<str>,
        A: AsRef<str>,
    {
        let recipients = parse_recipients(recipients, amounts)?;
        Ok(Self {
            recipients,
            amounts: amounts.iter().map(|a| a.as_ref().trim().to_string()).collect(),
            asset,
        })
    }

    pub fn recipients(&self) -> &[Address] {
        &self.recipients
    }

    pub fn amounts(&self) -> &[String] {
        &self.amounts
    }

    pub fn asset(&self) -> Asset {
        self.asset
    }

    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }
}

/// Gas cost of a prepared batch call, computed fresh for every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GasEstimate {
    /// Gas units the node expects the call to consume
    pub gas_units: u64,
    /// Fee rate in wei per gas unit
    pub gas_price_wei: u128,
    /// Value attached to the call (the batch total in native mode)
    pub value: U256,
    /// `gas_units * gas_price_wei`
    pub cost_wei: U256,
    /// Cost in whole native coin
    pub cost_native: Decimal,
    /// Cost in fiat, `None` when the price feed could not be reached
    pub cost_fiat: Option<Decimal>,
    /// Fiat currency code the quote refers to
    pub fiat_currency: String,
}

/// Subset of a transaction receipt the SDK acts on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
    pub success: bool,
}

/// Orchestrator states, in the order a successful flow visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferState {
    Validating,
    Approving,
    Estimating,
    AwaitingConfirmation,
    Submitting,
    AwaitingFinality,
    Completed,
    Cancelled,
    Failed,
}

impl TransferState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Validating => "validating",
            TransferState::Approving => "approving",
            TransferState::Estimating => "estimating",
            TransferState::AwaitingConfirmation => "awaiting_confirmation",
            TransferState::Submitting => "submitting",
            TransferState::AwaitingFinality => "awaiting_finality",
            TransferState::Completed => "completed",
            TransferState::Cancelled => "cancelled",
            TransferState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Completed | TransferState::Cancelled | TransferState::Failed
        )
    }
}

/// Result of a batch flow that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOutcome {
    /// Batch reached finality
    Completed {
        estimate: GasEstimate,
        approval: Option<TxReceipt>,
        receipt: TxReceipt,
    },
    /// Operator declined; nothing was submitted after the approval step
    Cancelled {
        estimate: GasEstimate,
        approval: Option<TxReceipt>,
    },
}

impl TransferOutcome {
    pub fn state(&self) -> TransferState {
        match self {
            TransferOutcome::Completed { .. } => TransferState::Completed,
            TransferOutcome::Cancelled { .. } => TransferState::Cancelled,
        }
    }

    pub fn estimate(&self) -> &GasEstimate {
        match self {
            TransferOutcome::Completed { estimate, .. }
            | TransferOutcome::Cancelled { estimate, .. } => estimate,
        }
    }

    pub fn receipt(&self) -> Option<&TxReceipt> {
        match self {
            TransferOutcome::Completed { receipt, .. } => Some(receipt),
            TransferOutcome::Cancelled { .. } => None,
        }
    }
}

/// Utility functions for wei amounts
pub mod utils {
    use alloy::primitives::utils::format_units;
    use alloy::primitives::U256;

    use crate::amount::{from_minor_units, NATIVE_DECIMALS};

    /// Format a wei amount as ether, e.g. "0.0021 ETH"
    pub fn format_ether(wei: U256) -> String {
        format!("{} ETH", from_minor_units(wei, NATIVE_DECIMALS))
    }

    /// Format a gas price as gwei with up to 9 decimal places
    pub fn format_gwei(wei: u128) -> String {
        let gwei = format_units(U256::from(wei), "gwei").unwrap_or_else(|_| wei.to_string());
        let gwei = if gwei.contains('.') {
            gwei.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            gwei
        };
        format!("{} gwei", gwei)
    }

    /// Format a token amount with its precision and symbol
    pub fn format_token(value: U256, decimals: u8, symbol: &str) -> String {
        format!("{} {}", from_minor_units(value, decimals), symbol)
    }
}
