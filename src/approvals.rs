//! Sequential ERC-20 approvals
//!
//! Each approval is estimated, submitted and mined before the next one goes
//! out, and all of them are mined before the main transaction is signed: the
//! main transaction may spend the allowance they grant.

use crate::error::ExecutionError;
use crate::gas;
use crate::types::{ApprovalHashes, ApprovalStep};
use crate::wallet::{ChainClient, SecureWallet};

/// Runs approval transactions under the local wallet
pub struct ApprovalRunner<'a> {
    wallet: &'a SecureWallet,
    client: &'a dyn ChainClient,
}

impl<'a> ApprovalRunner<'a> {
    pub fn new(wallet: &'a SecureWallet, client: &'a dyn ChainClient) -> Self {
        Self { wallet, client }
    }

    /// Submit and confirm `approvals` in order
    ///
    /// Stops at the first failure; approvals mined before it stay on chain and
    /// are listed in the error.
    pub async fn run(
        &self,
        approvals: &[ApprovalStep],
    ) -> std::result::Result<ApprovalHashes, ExecutionError> {
        let mut confirmed = ApprovalHashes::with_capacity(approvals.len());

        for (index, step) in approvals.iter().enumerate() {
            let fail = |message: String, confirmed: &ApprovalHashes| {
                tracing::error!(step = index, error = %message, "Approval failed");
                ExecutionError::ApprovalFailure {
                    index,
                    message,
                    confirmed: confirmed.clone(),
                }
            };

            let request = step.to_request(Some(self.wallet.address()), None);
            let gas = gas::estimate(self.client, &request).await;
            let request = step.to_request(Some(self.wallet.address()), gas.as_ref());

            let tx_hash = self
                .wallet
                .send_transaction(self.client, request)
                .await
                .map_err(|e| fail(e.to_string(), &confirmed))?;

            tracing::info!(step = index, token = %step.to, tx_hash = %tx_hash, "Approval submitted");

            self.client
                .wait_for_receipt(tx_hash)
                .await
                .map_err(|e| fail(e.to_string(), &confirmed))?;

            tracing::info!(step = index, tx_hash = %tx_hash, "Approval confirmed");
            confirmed.push(tx_hash);
        }

        Ok(confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{approval, FakeChainClient, RecordedCall, TEST_KEY};
    use alloy::primitives::TxHash;

    #[tokio::test]
    async fn test_runs_in_order_and_waits_for_each() {
        let wallet = SecureWallet::from_hex(TEST_KEY).unwrap();
        let client = FakeChainClient::new(1).with_gas(50_000);
        let steps = [approval(1), approval(2), approval(3)];

        let hashes = ApprovalRunner::new(&wallet, &client).run(&steps).await.unwrap();
        assert_eq!(hashes.len(), 3);

        let order: Vec<RecordedCall> = client
            .calls()
            .into_iter()
            .filter(|c| matches!(c, RecordedCall::Send { .. } | RecordedCall::Wait(_)))
            .collect();
        assert_eq!(
            order,
            vec![
                RecordedCall::Send { to: steps[0].to, gas: Some(60_000) },
                RecordedCall::Wait(TxHash::with_last_byte(1)),
                RecordedCall::Send { to: steps[1].to, gas: Some(60_000) },
                RecordedCall::Wait(TxHash::with_last_byte(2)),
                RecordedCall::Send { to: steps[2].to, gas: Some(60_000) },
                RecordedCall::Wait(TxHash::with_last_byte(3)),
            ]
        );
    }

    #[tokio::test]
    async fn test_confirmation_failure_stops_the_run() {
        let wallet = SecureWallet::from_hex(TEST_KEY).unwrap();
        let client = FakeChainClient::new(1).failing_receipt_at(2);
        let steps = [approval(1), approval(2), approval(3)];

        let err = ApprovalRunner::new(&wallet, &client).run(&steps).await.unwrap_err();
        match err {
            ExecutionError::ApprovalFailure {
                index, confirmed, ..
            } => {
                assert_eq!(index, 1);
                assert_eq!(confirmed, vec![TxHash::with_last_byte(1)]);
            }
            other => panic!("unexpected error: {other}"),
        }
        // The third approval is never submitted
        assert_eq!(client.sent_to(), vec![steps[0].to, steps[1].to]);
    }

    #[tokio::test]
    async fn test_submission_failure_and_missing_gas() {
        let wallet = SecureWallet::from_hex(TEST_KEY).unwrap();
        let client = FakeChainClient::new(1)
            .failing_gas("rpc down")
            .failing_send_at(1);
        let steps = [approval(1), approval(2)];

        let err = ApprovalRunner::new(&wallet, &client).run(&steps).await.unwrap_err();
        assert_eq!(err.kind(), "ApprovalFailure");
        assert!(client.sent_to().is_empty());
    }

    #[tokio::test]
    async fn test_empty_list_is_a_no_op() {
        let wallet = SecureWallet::from_hex(TEST_KEY).unwrap();
        let client = FakeChainClient::new(1);
        let hashes = ApprovalRunner::new(&wallet, &client).run(&[]).await.unwrap();
        assert!(hashes.is_empty());
        assert!(client.calls().is_empty());
    }
}
