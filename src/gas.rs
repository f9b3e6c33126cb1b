//! Best-effort gas estimation
//!
//! The gas estimate and the EIP-1559 fee read are issued together. Any failure
//! yields `None` and the transaction goes out with the provider's own gas and
//! fee filling instead; estimation never fails a run.

use crate::types::GasParams;
use crate::wallet::ChainClient;
use alloy::hex;
use alloy::rpc::types::TransactionRequest;

/// Safety margin applied to the raw estimate (6/5 = 1.2x)
const GAS_BUFFER_NUMERATOR: u128 = 6;
const GAS_BUFFER_DENOMINATOR: u128 = 5;

/// Scale a raw gas estimate by 1.2x, truncating
pub fn apply_gas_buffer(raw: u64) -> u64 {
    let buffered = u128::from(raw) * GAS_BUFFER_NUMERATOR / GAS_BUFFER_DENOMINATOR;
    u64::try_from(buffered).unwrap_or(u64::MAX)
}

/// Estimate gas limit and fees for `tx`
pub async fn estimate(client: &dyn ChainClient, tx: &TransactionRequest) -> Option<GasParams> {
    let (gas, fees) = tokio::join!(client.estimate_gas(tx.clone()), client.estimate_fees());

    match (gas, fees) {
        (Ok(raw), Ok(fees)) => {
            let params = GasParams {
                gas_limit: apply_gas_buffer(raw),
                max_fee_per_gas: fees.max_fee_per_gas,
                max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
            };
            tracing::debug!(
                chain_id = client.chain_id(),
                raw_gas = raw,
                gas_limit = params.gas_limit,
                max_fee_per_gas = params.max_fee_per_gas,
                "Gas estimated"
            );
            Some(params)
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(
                chain_id = client.chain_id(),
                reason = %revert_reason(&e.to_string()),
                "Gas estimation failed, using provider defaults"
            );
            None
        }
    }
}

/// Pull a readable revert reason out of an RPC error message
fn revert_reason(error: &str) -> String {
    if !error.contains("execution reverted") {
        return error.to_string();
    }

    if let Some(start) = error.find("revert: ") {
        let reason = &error[start + 8..];
        return match reason.find('"') {
            Some(end) => reason[..end].to_string(),
            None => reason.to_string(),
        };
    }

    if let Some(start) = error.find("0x") {
        let data = &error[start..];
        let end = data[2..]
            .find(|c: char| !c.is_ascii_hexdigit())
            .map(|i| i + 2)
            .unwrap_or(data.len());
        let data = &data[..end];
        // Error(string): selector, offset word, length word, then the bytes
        if data.starts_with("0x08c379a0") && data.len() > 138 {
            if let Ok(decoded) = hex::decode(&data[138..]) {
                let filtered: Vec<u8> = decoded.into_iter().filter(|&b| b != 0).collect();
                if let Ok(s) = String::from_utf8(filtered) {
                    return s;
                }
            }
        }
        return format!("Reverted with data: {}", data);
    }

    "execution reverted".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeChainClient;
    use alloy::primitives::{address, U256};

    fn request() -> TransactionRequest {
        TransactionRequest::default()
            .to(address!("3fc91a3afd70395cd496c647d5a6cc9d4b2b7fad"))
            .value(U256::ZERO)
    }

    #[test]
    fn test_apply_gas_buffer() {
        assert_eq!(apply_gas_buffer(100_000), 120_000);
        assert_eq!(apply_gas_buffer(21_000), 25_200);
        assert_eq!(apply_gas_buffer(7), 8);
        assert_eq!(apply_gas_buffer(0), 0);
        assert_eq!(apply_gas_buffer(u64::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn test_estimate_buffers_gas() {
        let client = FakeChainClient::new(8453).with_gas(100_000);
        let params = estimate(&client, &request()).await.unwrap();

        assert_eq!(params.gas_limit, 120_000);
        assert_eq!(params.max_fee_per_gas, 2_000_000_000);
        assert_eq!(params.max_priority_fee_per_gas, 1_000_000);
    }

    #[tokio::test]
    async fn test_estimate_degrades_on_failure() {
        let client = FakeChainClient::new(1).failing_gas("execution reverted: revert: STF\"");
        assert!(estimate(&client, &request()).await.is_none());

        let client = FakeChainClient::new(1).failing_fees("timeout");
        assert!(estimate(&client, &request()).await.is_none());
    }

    #[test]
    fn test_revert_reason() {
        assert_eq!(
            revert_reason("execution reverted: revert: Insufficient balance\""),
            "Insufficient balance"
        );
        assert_eq!(revert_reason("execution reverted"), "execution reverted");
        assert_eq!(revert_reason("connection refused"), "connection refused");
        assert_eq!(
            revert_reason("execution reverted, data: 0xdeadbeef"),
            "Reverted with data: 0xdeadbeef"
        );
    }
}
