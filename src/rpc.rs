//! JSON-RPC wire types for Ethereum nodes

use alloy::primitives::{TxHash, U64};
use serde::{Deserialize, Serialize};

use crate::types::TxReceipt;

/// RPC request structure
#[derive(Debug, Serialize)]
pub(crate) struct RpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: serde_json::Value,
}

/// RPC response structure
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub(crate) struct RpcResponse<T> {
    pub jsonrpc: String,
    pub id: u64,
    pub result: Option<T>,
    pub error: Option<RpcError>,
}

/// RPC error structure
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub(crate) struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Receipt fields from `eth_getTransactionReceipt`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptResponse {
    pub transaction_hash: TxHash,
    pub block_number: Option<U64>,
    pub gas_used: U64,
    /// Post-Byzantium status: 1 success, 0 revert
    pub status: Option<U64>,
}

impl ReceiptResponse {
    /// Convert to a [`TxReceipt`], or `None` while the receipt is still pending.
    pub fn into_receipt(self) -> Option<TxReceipt> {
        let block_number = self.block_number?.to::<u64>();
        Some(TxReceipt {
            tx_hash: self.transaction_hash,
            block_number,
            gas_used: self.gas_used.to::<u64>(),
            success: self.status.map(|s| s == U64::from(1u8)).unwrap_or(true),
        })
    }
}
