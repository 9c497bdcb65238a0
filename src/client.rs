//! JSON-RPC client for Ethereum-compatible nodes
use alloy::primitives::{Address, Bytes, TxHash, U128, U64};
use alloy::rpc::types::TransactionRequest;
use rand::random;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

use crate::error::{Error, Result};
use crate::rpc::{ReceiptResponse, RpcRequest, RpcResponse};

/// RPC client for connecting to an Ethereum JSON-RPC endpoint.
///
/// Only the handful of `eth_*` methods a batch transfer needs are exposed
/// as typed helpers; anything else goes through [`RpcClient::call`].
#[derive(Clone)]
pub struct RpcClient {
    endpoint: String,
    http: reqwest::Client,
    auth: Option<String>,
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("endpoint", &self.endpoint)
            .field("auth", &self.auth.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl RpcClient {
    /// Create a new RPC client without authentication.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::new(),
            auth: None,
        }
    }

    /// Create a new RPC client with HTTP basic authentication.
    ///
    /// Self-hosted nodes behind a reverse proxy commonly require this.
    pub fn with_auth(endpoint: impl Into<String>, username: String, password: String) -> Self {
        use base64::Engine;
        let mut client = Self::new(endpoint);
        let credentials = format!("{}:{}", username, password);
        client.auth = Some(base64::engine::general_purpose::STANDARD.encode(credentials));
        client
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send<T, P>(&self, method: &str, params: P) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        P: Serialize,
    {
        let params = serde_json::to_value(params)?;
        let request = RpcRequest {
            jsonrpc: "2.0".to_string(),
            // stay inside the 2^53 safe integer range of JS-based nodes
            id: random::<u64>() >> 11,
            method: method.to_string(),
            params,
        };
        trace!(method, "sending rpc request");

        let mut req = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .header("Content-Type", "application/json");

        if let Some(ref auth) = self.auth {
            req = req.header("Authorization", format!("Basic {}", auth));
        }

        let response = req.send().await?;

        if !response.status().is_success() {
            return Err(Error::Rpc(format!(
                "RPC request {} failed with status: {}",
                method,
                response.status()
            )));
        }

        let rpc_response: RpcResponse<T> = response.json().await?;

        if let Some(error) = rpc_response.error {
            return Err(Error::Rpc(format!(
                "RPC error {}: {}",
                error.code, error.message
            )));
        }

        Ok(rpc_response.result)
    }

    /// Call a JSON-RPC method and deserialize the result into the requested type.
    ///
    /// A `null` result is an error; use [`RpcClient::call_optional`] for
    /// methods where `null` is a valid answer.
    pub async fn call<T, P>(&self, method: &str, params: P) -> Result<T>
    where
        T: DeserializeOwned,
        P: Serialize,
    {
        self.send(method, params)
            .await?
            .ok_or_else(|| Error::Rpc(format!("RPC response to {} missing result", method)))
    }

    /// Call a JSON-RPC method whose result may legitimately be `null`.
    pub async fn call_optional<T, P>(&self, method: &str, params: P) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        P: Serialize,
    {
        self.send(method, params).await
    }

    pub async fn chain_id(&self) -> Result<u64> {
        let id: U64 = self.call("eth_chainId", serde_json::json!([])).await?;
        Ok(id.to::<u64>())
    }

    pub async fn block_number(&self) -> Result<u64> {
        let number: U64 = self.call("eth_blockNumber", serde_json::json!([])).await?;
        Ok(number.to::<u64>())
    }

    /// Current legacy gas price in wei.
    pub async fn gas_price(&self) -> Result<u128> {
        let price: U128 = self.call("eth_gasPrice", serde_json::json!([])).await?;
        Ok(price.to::<u128>())
    }

    pub async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64> {
        let gas: U64 = self.call("eth_estimateGas", serde_json::json!([tx])).await?;
        Ok(gas.to::<u64>())
    }

    /// Execute a read-only call against the latest block.
    pub async fn eth_call(&self, tx: &TransactionRequest) -> Result<Bytes> {
        self.call("eth_call", serde_json::json!([tx, "latest"]))
            .await
    }

    /// Nonce for the next transaction from `address`, counting pending ones.
    pub async fn transaction_count(&self, address: Address) -> Result<u64> {
        let nonce: U64 = self
            .call(
                "eth_getTransactionCount",
                serde_json::json!([address, "pending"]),
            )
            .await?;
        Ok(nonce.to::<u64>())
    }

    pub async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash> {
        let hex_raw = format!("0x{}", hex::encode(raw));
        self.call("eth_sendRawTransaction", serde_json::json!([hex_raw]))
            .await
    }

    /// Receipt for `hash`, `None` while the transaction is unmined.
    pub async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<ReceiptResponse>> {
        self.call_optional("eth_getTransactionReceipt", serde_json::json!([hash]))
            .await
    }
}
