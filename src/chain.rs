//! Chain client capability consumed by the estimator and the orchestrator

use std::future::Future;
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::debug;

use crate::client::RpcClient;
use crate::contract::{allowance_request, decimals_request, decode_uint};
use crate::error::{Error, Result};
use crate::types::TxReceipt;
use crate::wallet::Wallet;

/// Everything the SDK needs from a node plus a signing identity.
///
/// State-mutating calls (`send_transaction`) are only ever issued by the
/// orchestrator, one at a time.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Address that signs and pays for submitted transactions
    fn sender(&self) -> Address;

    /// `decimals()` of an ERC-20 token
    async fn token_decimals(&self, token: Address) -> Result<u8>;

    /// `allowance(owner, spender)` of an ERC-20 token
    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256>;

    /// Gas units the node expects `tx` to consume
    async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64>;

    /// Current fee rate in wei per gas unit
    async fn gas_price(&self) -> Result<u128>;

    /// Sign and broadcast `tx`, filling only the fields the caller left empty
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash>;

    /// Receipt for `hash`, `None` while unmined
    async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<TxReceipt>>;

    async fn block_number(&self) -> Result<u64>;
}

/// Run a collaborator call with an upper bound on its latency.
pub(crate) async fn bounded<T, F>(operation: &'static str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| Error::Timeout {
            operation,
            after: limit,
        })?
}

/// [`ChainClient`] backed by a JSON-RPC node and a local [`Wallet`].
#[derive(Clone, Debug)]
pub struct EvmChainClient {
    rpc: RpcClient,
    wallet: Wallet,
}

impl EvmChainClient {
    pub fn new(rpc: RpcClient, wallet: Wallet) -> Self {
        Self { rpc, wallet }
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// Populate nonce, chain id, gas limit and gas price where missing.
    async fn fill(&self, tx: TransactionRequest) -> Result<TransactionRequest> {
        let mut tx = tx.with_from(self.wallet.address());
        if tx.gas.is_none() {
            let gas = self.rpc.estimate_gas(&tx).await?;
            tx = tx.with_gas_limit(gas);
        }
        if tx.gas_price.is_none() && tx.max_fee_per_gas.is_none() {
            let price = self.rpc.gas_price().await?;
            tx = tx.with_gas_price(price);
        }
        if tx.nonce.is_none() {
            let nonce = self.rpc.transaction_count(self.wallet.address()).await?;
            tx = tx.with_nonce(nonce);
        }
        if tx.chain_id.is_none() {
            let chain_id = self.rpc.chain_id().await?;
            tx = tx.with_chain_id(chain_id);
        }
        Ok(tx)
    }
}

#[async_trait]
impl ChainClient for EvmChainClient {
    fn sender(&self) -> Address {
        self.wallet.address()
    }

    async fn token_decimals(&self, token: Address) -> Result<u8> {
        let data = self.rpc.eth_call(&decimals_request(token)).await?;
        let decimals = decode_uint(&data)?;
        if decimals > U256::from(u8::MAX) {
            return Err(Error::Rpc(format!(
                "Token {} reported out of range decimals {}",
                token, decimals
            )));
        }
        Ok(decimals.to::<u8>())
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        let data = self
            .rpc
            .eth_call(&allowance_request(token, owner, spender))
            .await?;
        decode_uint(&data)
    }

    async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64> {
        self.rpc.estimate_gas(&tx).await
    }

    async fn gas_price(&self) -> Result<u128> {
        self.rpc.gas_price().await
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash> {
        let tx = self.fill(tx).await?;
        debug!(nonce = ?tx.nonce, gas = ?tx.gas, "signing transaction");
        let raw = self.wallet.sign(tx).await?;
        self.rpc.send_raw_transaction(&raw).await
    }

    async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<TxReceipt>> {
        let receipt = self.rpc.transaction_receipt(hash).await?;
        Ok(receipt.and_then(|r| r.into_receipt()))
    }

    async fn block_number(&self) -> Result<u64> {
        self.rpc.block_number().await
    }
}
