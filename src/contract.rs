//! ABI bindings for the token and batch contracts, and the call envelopes built from them

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::amount::{sum, AmountError};
use crate::error::{Error, Result};
use crate::types::Asset;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IERC20 {
        function decimals() external view returns (uint8);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        // not called by the SDK; kept so the binding matches the token ABI
        function transfer(address to, uint256 amount) external returns (bool);
    }

    #[derive(Debug, PartialEq, Eq)]
    interface IBatchTransfer {
        function batchTransfer(address[] recipients, uint256[] amounts, address token) external payable;
    }
}

/// Scaled arguments of one `batchTransfer` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCall {
    recipients: Vec<Address>,
    amounts: Vec<U256>,
    asset: Asset,
    total: U256,
}

impl BatchCall {
    pub fn new(
        recipients: Vec<Address>,
        amounts: Vec<U256>,
        asset: Asset,
    ) -> std::result::Result<Self, AmountError> {
        let total = sum(&amounts)?;
        Ok(Self {
            recipients,
            amounts,
            asset,
            total,
        })
    }

    pub fn recipients(&self) -> &[Address] {
        &self.recipients
    }

    pub fn amounts(&self) -> &[U256] {
        &self.amounts
    }

    pub fn asset(&self) -> Asset {
        self.asset
    }

    /// Sum of all amounts in minor units
    pub fn total(&self) -> U256 {
        self.total
    }

    /// Value attached to the transaction: the total in native mode, zero otherwise
    pub fn value(&self) -> U256 {
        if self.asset.is_native() {
            self.total
        } else {
            U256::ZERO
        }
    }

    pub fn calldata(&self) -> Bytes {
        IBatchTransfer::batchTransferCall {
            recipients: self.recipients.clone(),
            amounts: self.amounts.clone(),
            token: self.asset.contract_id(),
        }
        .abi_encode()
        .into()
    }

    /// Unsigned transaction calling `batchTransfer` on `contract`.
    pub fn to_request(&self, contract: Address, from: Address) -> TransactionRequest {
        let tx = TransactionRequest::default()
            .with_from(from)
            .with_to(contract)
            .with_input(self.calldata());
        if self.asset.is_native() {
            tx.with_value(self.total)
        } else {
            tx
        }
    }
}

/// Unsigned `approve(spender, amount)` on `token`.
pub fn approve_request(token: Address, spender: Address, amount: U256, from: Address) -> TransactionRequest {
    let data = IERC20::approveCall { spender, amount }.abi_encode();
    TransactionRequest::default()
        .with_from(from)
        .with_to(token)
        .with_input(data)
}

pub(crate) fn decimals_request(token: Address) -> TransactionRequest {
    TransactionRequest::default()
        .with_to(token)
        .with_input(IERC20::decimalsCall {}.abi_encode())
}

pub(crate) fn allowance_request(token: Address, owner: Address, spender: Address) -> TransactionRequest {
    TransactionRequest::default()
        .with_to(token)
        .with_input(IERC20::allowanceCall { owner, spender }.abi_encode())
}

/// Decode a single static `uint` return word.
pub(crate) fn decode_uint(data: &[u8]) -> Result<U256> {
    if data.len() < 32 {
        return Err(Error::Rpc(format!(
            "Contract returned {} bytes, expected a 32 byte word",
            data.len()
        )));
    }
    Ok(U256::from_be_slice(&data[..32]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::TxKind;

    #[test]
    fn test_erc20_selectors() {
        assert_eq!(IERC20::transferCall::SELECTOR, [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(IERC20::approveCall::SELECTOR, [0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(IERC20::decimalsCall::SELECTOR, [0x31, 0x3c, 0xe5, 0x67]);
    }

    #[test]
    fn test_native_call_attaches_total() {
        let recipients = vec![Address::repeat_byte(1), Address::repeat_byte(2)];
        let amounts = vec![U256::from(100u64), U256::from(200u64)];
        let call = BatchCall::new(recipients.clone(), amounts.clone(), Asset::Native).unwrap();

        let contract = Address::repeat_byte(0xbb);
        let tx = call.to_request(contract, Address::repeat_byte(0xaa));
        assert_eq!(tx.value, Some(U256::from(300u64)));
        assert_eq!(tx.to, Some(TxKind::Call(contract)));

        let input = tx.input.input().unwrap();
        let decoded = IBatchTransfer::batchTransferCall::abi_decode(input).unwrap();
        assert_eq!(decoded.recipients, recipients);
        assert_eq!(decoded.amounts, amounts);
        assert_eq!(decoded.token, Address::ZERO);
    }

    #[test]
    fn test_token_call_has_no_value() {
        let token = Address::repeat_byte(0x77);
        let call = BatchCall::new(
            vec![Address::repeat_byte(1)],
            vec![U256::from(5u64)],
            Asset::Token(token),
        )
        .unwrap();
        assert_eq!(call.value(), U256::ZERO);

        let tx = call.to_request(Address::repeat_byte(0xbb), Address::repeat_byte(0xaa));
        assert_eq!(tx.value, None);
        let decoded = IBatchTransfer::batchTransferCall::abi_decode(tx.input.input().unwrap()).unwrap();
        assert_eq!(decoded.token, token);
    }

    #[test]
    fn test_approve_request_encoding() {
        let spender = Address::repeat_byte(0xbb);
        let tx = approve_request(Address::repeat_byte(0x77), spender, U256::from(15u64), Address::ZERO);
        let decoded = IERC20::approveCall::abi_decode(tx.input.input().unwrap()).unwrap();
        assert_eq!(decoded.spender, spender);
        assert_eq!(decoded.amount, U256::from(15u64));
    }

    #[test]
    fn test_decode_uint() {
        let mut word = [0u8; 32];
        word[31] = 18;
        assert_eq!(decode_uint(&word).unwrap(), U256::from(18u8));
        assert!(decode_uint(&[0u8; 4]).is_err());
    }
}
