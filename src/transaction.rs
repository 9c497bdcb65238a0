//! Batch transfer orchestration
//!
//! [`BatchTransfer`] drives one batch through
//! validating → (approving) → estimating → awaiting confirmation →
//! submitting → awaiting finality → completed, or into cancelled/failed.
//!
//! The transaction that is estimated is the transaction that is shown to the
//! operator and the transaction that is submitted. Only the gas limit and fee
//! rate are pinned onto it, and both are the estimate's own values.

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::amount::NATIVE_DECIMALS;
use crate::chain::{bounded, ChainClient, EvmChainClient};
use crate::config::{Config, TransferOptions};
use crate::confirm::Confirmation;
use crate::contract::{approve_request, BatchCall};
use crate::error::{Error, Result};
use crate::fees::GasEstimator;
use crate::price::PriceFeed;
use crate::types::utils::{format_ether, format_gwei, format_token};
use crate::types::{Asset, GasEstimate, TransferOutcome, TransferRequest, TransferState, TxReceipt};

/// Current state of one flow, logged on every transition.
struct Progress {
    flow: &'static str,
    state: TransferState,
}

impl Progress {
    fn start(flow: &'static str) -> Self {
        info!(flow, state = TransferState::Validating.as_str(), "batch transfer started");
        Self {
            flow,
            state: TransferState::Validating,
        }
    }

    fn enter(&mut self, next: TransferState) {
        info!(
            flow = self.flow,
            from = self.state.as_str(),
            to = next.as_str(),
            "batch transfer state changed"
        );
        self.state = next;
    }
}

/// Orchestrates native and ERC-20 batch transfers through the batch contract.
///
/// Flows started on the same instance (or its clones) run one at a time.
#[derive(Clone)]
pub struct BatchTransfer {
    chain: Arc<dyn ChainClient>,
    estimator: GasEstimator,
    confirmation: Arc<dyn Confirmation>,
    batch_contract: Address,
    token: Option<Address>,
    options: TransferOptions,
    flow_lock: Arc<Mutex<()>>,
}

impl BatchTransfer {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        price_feed: Arc<dyn PriceFeed>,
        confirmation: Arc<dyn Confirmation>,
        batch_contract: Address,
        options: TransferOptions,
    ) -> Self {
        let estimator = GasEstimator::new(
            chain.clone(),
            price_feed,
            batch_contract,
            options.timeouts.rpc,
        );
        Self {
            chain,
            estimator,
            confirmation,
            batch_contract,
            token: None,
            options,
            flow_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Wire up a JSON-RPC chain client, signer and price feed from `config`.
    pub fn from_config(config: &Config, confirmation: Arc<dyn Confirmation>) -> Result<Self> {
        config.validate()?;
        let chain = EvmChainClient::new(config.rpc_client(), config.wallet()?);
        let transfer = Self::new(
            Arc::new(chain),
            Arc::new(config.price_feed()),
            confirmation,
            config.batch_contract,
            config.transfer.clone(),
        );
        Ok(match config.token {
            Some(token) => transfer.with_token(token),
            None => transfer,
        })
    }

    /// Default token used by [`BatchTransfer::batch_transfer_token`]
    pub fn with_token(mut self, token: Address) -> Self {
        self.token = Some(token);
        self
    }

    pub fn estimator(&self) -> &GasEstimator {
        &self.estimator
    }

    pub fn batch_contract(&self) -> Address {
        self.batch_contract
    }

    /// ERC-20 batch: approve the total for the batch contract, estimate,
    /// confirm, submit and wait for finality.
    ///
    /// `token` overrides the configured default token.
    pub async fn batch_transfer_token<R, A>(
        &self,
        recipients: &[R],
        amounts: &[A],
        token: Option<Address>,
    ) -> Result<TransferOutcome>
    where
        R: AsRef<str>,
        A: AsRef<str>,
    {
        let token = token.or(self.token).ok_or_else(|| {
            Error::Config("No token address given and none configured".to_string())
        })?;
        self.run("token", recipients, amounts, Asset::Token(token)).await
    }

    /// Native batch: the transaction carries the batch total as its value.
    pub async fn batch_transfer_native<R, A>(
        &self,
        recipients: &[R],
        amounts: &[A],
    ) -> Result<TransferOutcome>
    where
        R: AsRef<str>,
        A: AsRef<str>,
    {
        self.run("native", recipients, amounts, Asset::Native).await
    }

    /// Estimate a batch without approving, prompting or submitting anything.
    pub async fn estimate<R, A>(
        &self,
        recipients: &[R],
        amounts: &[A],
        asset: Asset,
    ) -> Result<GasEstimate>
    where
        R: AsRef<str>,
        A: AsRef<str>,
    {
        let request = TransferRequest::new(recipients, amounts, asset)?;
        self.estimator.estimate_transfer(&request).await
    }

    async fn run<R, A>(
        &self,
        flow: &'static str,
        recipients: &[R],
        amounts: &[A],
        asset: Asset,
    ) -> Result<TransferOutcome>
    where
        R: AsRef<str>,
        A: AsRef<str>,
    {
        let _flow = self.flow_lock.lock().await;
        let mut progress = Progress::start(flow);

        let result = match TransferRequest::new(recipients, amounts, asset) {
            Ok(request) => self.execute(&request, &mut progress).await,
            Err(e) => Err(e.into()),
        };

        match &result {
            Ok(outcome) => progress.enter(outcome.state()),
            Err(e) => {
                error!(flow, state = progress.state.as_str(), error = %e, "batch transfer failed");
                progress.enter(TransferState::Failed);
            }
        }
        result
    }

    async fn execute(
        &self,
        request: &TransferRequest,
        progress: &mut Progress,
    ) -> Result<TransferOutcome> {
        let rpc_timeout = self.options.timeouts.rpc;

        let (call, decimals, approval) = match request.asset() {
            Asset::Native => {
                let call = self.estimator.prepare_with_decimals(request, NATIVE_DECIMALS)?;
                (call, NATIVE_DECIMALS, None)
            }
            Asset::Token(token) => {
                progress.enter(TransferState::Approving);
                let decimals = bounded(
                    "token decimals lookup",
                    rpc_timeout,
                    self.chain.token_decimals(token),
                )
                .await
                .map_err(Error::approval)?;
                let call = self.estimator.prepare_with_decimals(request, decimals)?;
                let approval = self
                    .approve(token, call.total())
                    .await
                    .map_err(Error::approval)?;
                (call, decimals, approval)
            }
        };

        progress.enter(TransferState::Estimating);
        let estimate = self.estimator.estimate(&self.estimator.request_for(&call)).await?;
        let tx = self
            .estimator
            .request_for(&call)
            .with_gas_limit(estimate.gas_units)
            .with_gas_price(estimate.gas_price_wei);

        progress.enter(TransferState::AwaitingConfirmation);
        let prompt = confirmation_prompt(progress.flow, &call, decimals, &estimate);
        if !self.confirm(&prompt).await? {
            info!(flow = progress.flow, "batch transfer declined by operator");
            return Ok(TransferOutcome::Cancelled { estimate, approval });
        }

        progress.enter(TransferState::Submitting);
        let tx_hash = self.submit("batch submission", tx).await.map_err(Error::submission)?;
        info!(%tx_hash, recipients = call.recipients().len(), "batch transaction submitted");

        progress.enter(TransferState::AwaitingFinality);
        let receipt = self.wait_for_finality(tx_hash).await.map_err(|e| match e {
            Error::FinalityTimeout { .. } => e,
            other => Error::submission(other),
        })?;
        info!(
            %tx_hash,
            block = receipt.block_number,
            gas_used = receipt.gas_used,
            "batch transaction final"
        );

        Ok(TransferOutcome::Completed {
            estimate,
            approval,
            receipt,
        })
    }

    /// Raise the batch contract's allowance to `total`, waiting for the
    /// approval to be final. Returns `None` when no approval was needed.
    async fn approve(&self, token: Address, total: U256) -> Result<Option<TxReceipt>> {
        let owner = self.chain.sender();

        if self.options.skip_approval_if_sufficient {
            let current = bounded(
                "allowance lookup",
                self.options.timeouts.rpc,
                self.chain.allowance(token, owner, self.batch_contract),
            )
            .await?;
            if current >= total {
                info!(%token, %current, %total, "allowance already covers batch, skipping approval");
                return Ok(None);
            }
        }

        let tx = approve_request(token, self.batch_contract, total, owner);
        let tx_hash = self.submit("approval submission", tx).await?;
        info!(%token, %tx_hash, %total, "approval submitted");

        let receipt = self.wait_for_finality(tx_hash).await?;
        info!(%tx_hash, block = receipt.block_number, "approval final");
        Ok(Some(receipt))
    }

    async fn submit(&self, operation: &'static str, tx: TransactionRequest) -> Result<TxHash> {
        bounded(operation, self.options.timeouts.rpc, self.chain.send_transaction(tx)).await
    }

    /// Expired confirmation windows count as a decline.
    async fn confirm(&self, prompt: &str) -> Result<bool> {
        match self.options.timeouts.confirmation {
            Some(limit) => match tokio::time::timeout(limit, self.confirmation.confirm(prompt)).await {
                Ok(answer) => answer,
                Err(_) => {
                    warn!(after = ?limit, "no operator answer, treating as decline");
                    Ok(false)
                }
            },
            None => self.confirmation.confirm(prompt).await,
        }
    }

    async fn wait_for_finality(&self, tx_hash: TxHash) -> Result<TxReceipt> {
        let limit = self.options.timeouts.finality;
        let started = Instant::now();
        tokio::time::timeout(limit, self.poll_receipt(tx_hash))
            .await
            .map_err(|_| Error::FinalityTimeout {
                tx_hash,
                waited: started.elapsed(),
            })?
    }

    async fn poll_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt> {
        let rpc_timeout = self.options.timeouts.rpc;
        loop {
            let receipt = bounded(
                "receipt lookup",
                rpc_timeout,
                self.chain.transaction_receipt(tx_hash),
            )
            .await?;

            if let Some(receipt) = receipt {
                if !receipt.success {
                    return Err(Error::Reverted { tx_hash });
                }
                if self.options.confirmations <= 1 {
                    return Ok(receipt);
                }
                let head = bounded("block number lookup", rpc_timeout, self.chain.block_number()).await?;
                let depth = (head + 1).saturating_sub(receipt.block_number);
                if depth >= self.options.confirmations {
                    return Ok(receipt);
                }
                debug!(%tx_hash, depth, required = self.options.confirmations, "waiting for confirmations");
            }

            tokio::time::sleep(self.poll_interval()).await;
        }
    }

    fn poll_interval(&self) -> Duration {
        self.options.timeouts.poll_interval.max(Duration::from_millis(1))
    }
}

fn confirmation_prompt(flow: &str, call: &BatchCall, decimals: u8, estimate: &GasEstimate) -> String {
    let total = match call.asset() {
        Asset::Native => format_ether(call.total()),
        Asset::Token(token) => format_token(call.total(), decimals, &token.to_checksum(None)),
    };
    let fiat = estimate
        .cost_fiat
        .map(|c| format!("{} {}", c.round_dp(2), estimate.fiat_currency.to_uppercase()))
        .unwrap_or_else(|| "unavailable".to_string());

    format!(
        "Gas fee estimate for {flow} batch transfer\n\
         \x20 Recipients:     {}\n\
         \x20 Total:          {}\n\
         \x20 Estimated gas:  {}\n\
         \x20 Gas price:      {}\n\
         \x20 Estimated cost: {}\n\
         \x20 Fiat cost:      {}\n\
         Proceed with {flow} batch transfer? (yes/no): ",
        call.recipients().len(),
        total,
        estimate.gas_units,
        format_gwei(estimate.gas_price_wei),
        format_ether(estimate.cost_wei),
        fiat,
    )
}
