//! Signing identity

use std::fmt;

use alloy::network::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::Address;
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{Error, Result};

/// Local signing key for the account that funds and submits batches
#[derive(Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
}

impl Wallet {
    /// Load a wallet from a hex private key, with or without `0x` prefix
    pub fn from_private_key(key: &SecretString) -> Result<Self> {
        let key = key.expose_secret().trim();
        if key.is_empty() {
            return Err(Error::Signer("Private key is empty".to_string()));
        }
        let signer: PrivateKeySigner = key
            .parse()
            .map_err(|_| Error::Signer("Failed to parse private key".to_string()))?;
        Ok(Self { signer })
    }

    pub fn from_signer(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Sign a fully populated request into a raw EIP-2718 envelope.
    pub async fn sign(&self, tx: TransactionRequest) -> Result<Vec<u8>> {
        let wallet = EthereumWallet::from(self.signer.clone());
        let envelope = tx
            .build(&wallet)
            .await
            .map_err(|e| Error::Signer(e.to_string()))?;
        Ok(envelope.encoded_2718())
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
