//! Gas estimation for batch transfer calls
//!
//! An estimate is always computed fresh: the gas units come from the node's
//! `eth_estimateGas` for the exact call that will later be signed, the fee
//! rate from `eth_gasPrice`, and the fiat cost from the price feed.
//!
//! The fiat leg is best effort. When the price feed fails or times out the
//! estimate still succeeds with `cost_fiat: None`.
//!
//! cost_wei = gas_units × gas_price_wei

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use alloy::rpc::types::TransactionRequest;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::amount::{checked_total, from_minor_units, scale_amounts, NATIVE_DECIMALS};
use crate::chain::{bounded, ChainClient};
use crate::contract::BatchCall;
use crate::error::{Error, Result};
use crate::price::PriceFeed;
use crate::types::{Asset, GasEstimate, TransferRequest};

/// Computes [`GasEstimate`]s against a chain client and a price feed
#[derive(Clone)]
pub struct GasEstimator {
    chain: Arc<dyn ChainClient>,
    price_feed: Arc<dyn PriceFeed>,
    batch_contract: Address,
    rpc_timeout: Duration,
}

impl GasEstimator {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        price_feed: Arc<dyn PriceFeed>,
        batch_contract: Address,
        rpc_timeout: Duration,
    ) -> Self {
        Self {
            chain,
            price_feed,
            batch_contract,
            rpc_timeout,
        }
    }

    /// Decimal precision of the asset: fixed for native, queried for tokens.
    pub async fn decimals(&self, asset: Asset) -> Result<u8> {
        match asset {
            Asset::Native => Ok(NATIVE_DECIMALS),
            Asset::Token(token) => {
                bounded(
                    "token decimals lookup",
                    self.rpc_timeout,
                    self.chain.token_decimals(token),
                )
                .await
            }
        }
    }

    /// Scale the request's amounts and build the `batchTransfer` arguments.
    pub async fn prepare(&self, request: &TransferRequest) -> Result<BatchCall> {
        let decimals = self.decimals(request.asset()).await?;
        self.prepare_with_decimals(request, decimals)
    }

    pub(crate) fn prepare_with_decimals(
        &self,
        request: &TransferRequest,
        decimals: u8,
    ) -> Result<BatchCall> {
        let amounts = scale_amounts(request.amounts(), decimals)?;
        checked_total(&amounts, request.amounts())?;
        BatchCall::new(request.recipients().to_vec(), amounts, request.asset())
            .map_err(|e| Error::InvalidParameter(e.to_string()))
    }

    /// Unsigned transaction for `call`, sent from the chain client's account.
    pub fn request_for(&self, call: &BatchCall) -> TransactionRequest {
        call.to_request(self.batch_contract, self.chain.sender())
    }

    /// Estimate a batch described by caller input.
    ///
    /// Looks up the token precision, scales the amounts and estimates the
    /// resulting call. Validation failures are returned as is; every network
    /// failure is wrapped in `EstimationFailed`.
    pub async fn estimate_transfer(&self, request: &TransferRequest) -> Result<GasEstimate> {
        let call = match self.prepare(request).await {
            Ok(call) => call,
            Err(e) if e.is_validation() => return Err(e),
            Err(e) => return Err(Error::estimation(e)),
        };
        self.estimate(&self.request_for(&call)).await
    }

    /// Estimate an already prepared transaction.
    ///
    /// Gas units, fee rate and fiat quote are fetched concurrently. Never
    /// retries.
    pub async fn estimate(&self, tx: &TransactionRequest) -> Result<GasEstimate> {
        let (gas_units, gas_price, quote) = tokio::join!(
            bounded("gas estimate", self.rpc_timeout, self.chain.estimate_gas(tx.clone())),
            bounded("fee rate lookup", self.rpc_timeout, self.chain.gas_price()),
            bounded("price lookup", self.rpc_timeout, self.price_feed.native_price()),
        );
        let gas_units = gas_units.map_err(Error::estimation)?;
        let gas_price_wei = gas_price.map_err(Error::estimation)?;

        let cost_wei = U256::from(gas_units) * U256::from(gas_price_wei);
        let cost_native = Decimal::from_str(&from_minor_units(cost_wei, NATIVE_DECIMALS))
            .map_err(|e| Error::estimation(Error::InvalidParameter(format!("Cost {} wei: {}", cost_wei, e))))?;

        let cost_fiat = match quote {
            Ok(price) => cost_native.checked_mul(price),
            Err(e) => {
                warn!(error = %e, "price feed unavailable, fiat cost omitted");
                None
            }
        };

        let estimate = GasEstimate {
            gas_units,
            gas_price_wei,
            value: tx.value.unwrap_or_default(),
            cost_wei,
            cost_native,
            cost_fiat,
            fiat_currency: self.price_feed.currency(),
        };
        info!(
            gas_units,
            gas_price_wei,
            cost_native = %estimate.cost_native,
            cost_fiat = ?estimate.cost_fiat,
            "gas estimate computed"
        );
        Ok(estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainClient;
    use crate::price::MockPriceFeed;

    const ALICE: &str = "0x93297d48A40446dc84a388BB94F3A1247CB74870";
    const BOB: &str = "0x50da5C365a08169A9101C1969492540dA937071F";

    fn chain(gas: u64, price: u128) -> MockChainClient {
        let mut chain = MockChainClient::new();
        chain.expect_sender().return_const(Address::repeat_byte(0xaa));
        chain.expect_estimate_gas().returning(move |_| Ok(gas));
        chain.expect_gas_price().returning(move || Ok(price));
        chain
    }

    fn price_feed(price: Option<i64>) -> MockPriceFeed {
        let mut feed = MockPriceFeed::new();
        feed.expect_currency().return_const("usd".to_string());
        feed.expect_native_price().returning(move || {
            price
                .map(Decimal::from)
                .ok_or_else(|| Error::PriceFeed("rate limited".to_string()))
        });
        feed
    }

    fn estimator(chain: MockChainClient, feed: MockPriceFeed) -> GasEstimator {
        GasEstimator::new(
            Arc::new(chain),
            Arc::new(feed),
            Address::repeat_byte(0xbb),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_estimate_costs() {
        let est = estimator(chain(50_000, 20_000_000_000), price_feed(Some(2000)));
        let request = TransferRequest::new(&[ALICE, BOB], &["0.1", "0.2"], Asset::Native).unwrap();

        let estimate = est.estimate_transfer(&request).await.unwrap();
        assert_eq!(estimate.gas_units, 50_000);
        assert_eq!(estimate.cost_wei, U256::from(1_000_000_000_000_000u64));
        assert_eq!(estimate.cost_native, Decimal::from_str("0.001").unwrap());
        assert_eq!(estimate.cost_fiat, Some(Decimal::from(2)));
        assert_eq!(estimate.value, U256::from(300_000_000_000_000_000u64));
        assert_eq!(estimate.fiat_currency, "usd");
    }

    #[tokio::test]
    async fn test_price_feed_failure_is_not_fatal() {
        let est = estimator(chain(21_000, 1_000_000_000), price_feed(None));
        let request = TransferRequest::new(&[ALICE], &["1"], Asset::Native).unwrap();

        let estimate = est.estimate_transfer(&request).await.unwrap();
        assert_eq!(estimate.cost_fiat, None);
        assert_eq!(estimate.cost_native, Decimal::from_str("0.000021").unwrap());
    }

    #[tokio::test]
    async fn test_gas_estimate_failure() {
        let mut chain = MockChainClient::new();
        chain.expect_sender().return_const(Address::repeat_byte(0xaa));
        chain
            .expect_estimate_gas()
            .returning(|_| Err(Error::Rpc("execution reverted".to_string())));
        chain.expect_gas_price().returning(|| Ok(1));
        let est = estimator(chain, price_feed(Some(2000)));
        let request = TransferRequest::new(&[ALICE], &["1"], Asset::Native).unwrap();

        let err = est.estimate_transfer(&request).await.unwrap_err();
        assert!(matches!(err, Error::EstimationFailed(inner) if matches!(*inner, Error::Rpc(_))));
    }

    struct StalledPriceFeed;

    #[async_trait::async_trait]
    impl PriceFeed for StalledPriceFeed {
        fn currency(&self) -> String {
            "usd".to_string()
        }

        async fn native_price(&self) -> Result<Decimal> {
            std::future::pending::<Result<Decimal>>().await
        }
    }

    /// Node that answers everything except `eth_estimateGas`
    struct StalledEstimateChain;

    #[async_trait::async_trait]
    impl ChainClient for StalledEstimateChain {
        fn sender(&self) -> Address {
            Address::repeat_byte(0xaa)
        }

        async fn token_decimals(&self, _token: Address) -> Result<u8> {
            Ok(18)
        }

        async fn allowance(&self, _token: Address, _owner: Address, _spender: Address) -> Result<U256> {
            Ok(U256::ZERO)
        }

        async fn estimate_gas(&self, _tx: TransactionRequest) -> Result<u64> {
            std::future::pending::<Result<u64>>().await
        }

        async fn gas_price(&self) -> Result<u128> {
            Ok(1)
        }

        async fn send_transaction(&self, _tx: TransactionRequest) -> Result<alloy::primitives::TxHash> {
            Err(Error::Rpc("read-only".to_string()))
        }

        async fn transaction_receipt(
            &self,
            _hash: alloy::primitives::TxHash,
        ) -> Result<Option<crate::types::TxReceipt>> {
            Ok(None)
        }

        async fn block_number(&self) -> Result<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_stalled_price_feed_only_drops_fiat() {
        let est = GasEstimator::new(
            Arc::new(chain(21_000, 1_000_000_000)),
            Arc::new(StalledPriceFeed),
            Address::repeat_byte(0xbb),
            Duration::from_millis(50),
        );
        let request = TransferRequest::new(&[ALICE], &["1"], Asset::Native).unwrap();

        let estimate = est.estimate_transfer(&request).await.unwrap();
        assert_eq!(estimate.cost_fiat, None);
        assert_eq!(estimate.gas_units, 21_000);
        assert_eq!(estimate.cost_native, Decimal::from_str("0.000021").unwrap());
    }

    #[tokio::test]
    async fn test_stalled_gas_estimate_times_out() {
        let est = GasEstimator::new(
            Arc::new(StalledEstimateChain),
            Arc::new(price_feed(Some(2000))),
            Address::repeat_byte(0xbb),
            Duration::from_millis(50),
        );
        let request = TransferRequest::new(&[ALICE], &["1"], Asset::Native).unwrap();

        let err = est.estimate_transfer(&request).await.unwrap_err();
        assert!(matches!(
            err,
            Error::EstimationFailed(inner)
                if matches!(*inner, Error::Timeout { operation: "gas estimate", .. })
        ));
    }

    #[tokio::test]
    async fn test_token_estimate_uses_token_decimals() {
        let token = Address::repeat_byte(0x77);
        let mut chain = chain(80_000, 1);
        chain
            .expect_token_decimals()
            .withf(move |t| *t == token)
            .times(1)
            .returning(|_| Ok(6));
        let est = estimator(chain, price_feed(Some(1)));
        let request = TransferRequest::new(&[ALICE, BOB], &["1.5", "2"], Asset::Token(token)).unwrap();

        let call = est.prepare(&request).await.unwrap();
        assert_eq!(call.total(), U256::from(3_500_000u64));
        assert_eq!(call.value(), U256::ZERO);

        let estimate = est.estimate(&est.request_for(&call)).await.unwrap();
        assert_eq!(estimate.value, U256::ZERO);
    }

    #[tokio::test]
    async fn test_decimals_failure_is_estimation_failure() {
        let mut chain = MockChainClient::new();
        chain
            .expect_token_decimals()
            .returning(|_| Err(Error::Rpc("no code at address".to_string())));
        let est = estimator(chain, price_feed(Some(1)));
        let request =
            TransferRequest::new(&[ALICE], &["1"], Asset::Token(Address::repeat_byte(0x77))).unwrap();

        let err = est.estimate_transfer(&request).await.unwrap_err();
        assert!(matches!(err, Error::EstimationFailed(_)));
    }
}
