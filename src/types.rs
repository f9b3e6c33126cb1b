//! Transaction values shared by the execution phases

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use serde::{Deserialize, Serialize};

/// A `{to, data, value}` call as returned by the quote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

/// One ERC-20 approval drawn from the quote
pub type ApprovalStep = TransactionCall;

impl TransactionCall {
    /// Request sent from `from`, with optional gas overrides
    pub fn to_request(&self, from: Option<Address>, gas: Option<&GasParams>) -> TransactionRequest {
        let mut tx = TransactionRequest::default()
            .to(self.to)
            .input(self.data.clone().into())
            .value(self.value);
        if let Some(from) = from {
            tx = tx.from(from);
        }
        if let Some(gas) = gas {
            tx.gas = Some(gas.gas_limit);
            tx.max_fee_per_gas = Some(gas.max_fee_per_gas);
            tx.max_priority_fee_per_gas = Some(gas.max_priority_fee_per_gas);
        }
        tx
    }
}

/// Gas limit (already buffered) and EIP-1559 fees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GasParams {
    pub gas_limit: u64,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

/// Unsigned transaction produced by the solve step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransaction {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub chain_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<GasParams>,
}

impl PendingTransaction {
    pub fn new(call: TransactionCall, chain_id: u64) -> Self {
        Self {
            to: call.to,
            data: call.data,
            value: call.value,
            chain_id,
            gas: None,
        }
    }

    pub fn call(&self) -> TransactionCall {
        TransactionCall {
            to: self.to,
            data: self.data.clone(),
            value: self.value,
        }
    }

    /// Request for submission; gas fields are left to the provider when unset
    pub fn to_request(&self, from: Address) -> TransactionRequest {
        let mut tx = self.call().to_request(Some(from), self.gas.as_ref());
        tx.chain_id = Some(self.chain_id);
        tx
    }
}

/// Signatures over the permit2 and bridge payloads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signatures {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permit2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge: Option<String>,
}

impl Signatures {
    pub fn is_empty(&self) -> bool {
        self.permit2.is_none() && self.bridge.is_none()
    }
}

/// Confirmed approval transactions
pub type ApprovalHashes = Vec<TxHash>;
