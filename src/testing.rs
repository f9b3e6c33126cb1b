//! In-memory fakes for the network seams

use crate::api::{QuoteRequest, QuoteResponse, QuoteService, SolveRequest, UpstreamError};
use crate::chains::ChainDescriptor;
use crate::types::ApprovalStep;
use crate::wallet::{ChainClient, ChainConnector, FeeEstimate, SecureWallet};
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// Well-known dev key (DO NOT use in production!)
pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Approval to a token at `0x00..0n`
pub fn approval(n: u8) -> ApprovalStep {
    ApprovalStep {
        to: Address::with_last_byte(n),
        data: Bytes::from_static(&[0x09, 0x5e, 0xa7, 0xb3]),
        value: U256::ZERO,
    }
}

/// Wire form of [`approval`]
pub fn approval_json(n: u8) -> Value {
    json!({
        "to": Address::with_last_byte(n).to_string(),
        "data": "0x095ea7b3",
        "value": {"type": "BigNumber", "hex": "0x00"}
    })
}

/// A solve response with a wrapped value
pub fn solved_tx() -> Value {
    json!({
        "to": "0x3fC91A3afd70395Cd496C647d5a6CC9D4B2b7FAD",
        "data": "0x3593564c",
        "value": {"type": "BigNumber", "hex": "0x2386f26fc10000"}
    })
}

/// A PermitSingle payload on `chain_id`
pub fn permit2_payload(chain_id: u64) -> Value {
    json!({
        "domain": {
            "name": "Permit2",
            "chainId": chain_id,
            "verifyingContract": "0x000000000022D473030F116dDEE9F6B43aC78BA3"
        },
        "types": {
            "PermitSingle": [
                {"name": "details", "type": "PermitDetails"},
                {"name": "spender", "type": "address"},
                {"name": "sigDeadline", "type": "uint256"}
            ],
            "PermitDetails": [
                {"name": "token", "type": "address"},
                {"name": "amount", "type": "uint160"},
                {"name": "expiration", "type": "uint48"},
                {"name": "nonce", "type": "uint48"}
            ]
        },
        "values": {
            "details": {
                "token": "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
                "amount": {"type": "BigNumber", "hex": "0x05f5e100"},
                "expiration": "1735689600",
                "nonce": "0"
            },
            "spender": "0x3fC91A3afd70395Cd496C647d5a6CC9D4B2b7FAD",
            "sigDeadline": {"type": "BigNumber", "hex": "0x6774b380"}
        }
    })
}

/// A bridge order payload on `chain_id`; the primary type is implied
pub fn bridge_payload(chain_id: u64) -> Value {
    json!({
        "domain": {"name": "Bridge", "version": "1", "chainId": chain_id},
        "types": {
            "EIP712Domain": [
                {"name": "name", "type": "string"},
                {"name": "version", "type": "string"},
                {"name": "chainId", "type": "uint256"}
            ],
            "Order": [
                {"name": "recipient", "type": "address"},
                {"name": "amount", "type": "uint256"},
                {"name": "deadline", "type": "uint32"}
            ]
        },
        "message": {
            "recipient": "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
            "amount": {"_hex": "0x0de0b6b3a7640000", "_isBigNumber": true},
            "deadline": "1735689600"
        }
    })
}

/// Ordered log shared between fakes
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        if let Ok(mut entries) = self.0.lock() {
            entries.push(entry.into());
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    EstimateGas,
    EstimateFees,
    Send { to: Address, gas: Option<u64> },
    Wait(TxHash),
}

/// Scripted chain; accepted sends get hashes `0x00..01`, `0x00..02`, ...
pub struct FakeChainClient {
    chain_id: u64,
    gas: std::result::Result<u64, String>,
    fees: std::result::Result<FeeEstimate, String>,
    fail_send_at: Option<usize>,
    fail_receipt_at: Option<usize>,
    send_attempts: AtomicUsize,
    accepted: AtomicUsize,
    waits: AtomicUsize,
    calls: Mutex<Vec<RecordedCall>>,
    journal: Journal,
}

impl FakeChainClient {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            gas: Ok(21_000),
            fees: Ok(FeeEstimate {
                max_fee_per_gas: 2_000_000_000,
                max_priority_fee_per_gas: 1_000_000,
            }),
            fail_send_at: None,
            fail_receipt_at: None,
            send_attempts: AtomicUsize::new(0),
            accepted: AtomicUsize::new(0),
            waits: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
            journal: Journal::default(),
        }
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = Ok(gas);
        self
    }

    pub fn failing_gas(mut self, message: &str) -> Self {
        self.gas = Err(message.to_string());
        self
    }

    pub fn failing_fees(mut self, message: &str) -> Self {
        self.fees = Err(message.to_string());
        self
    }

    /// Reject the `n`th submission (1-based)
    pub fn failing_send_at(mut self, n: usize) -> Self {
        self.fail_send_at = Some(n);
        self
    }

    /// Revert the `n`th awaited receipt (1-based)
    pub fn failing_receipt_at(mut self, n: usize) -> Self {
        self.fail_receipt_at = Some(n);
        self
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Destinations of accepted submissions, in order
    pub fn sent_to(&self) -> Vec<Address> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCall::Send { to, .. } => Some(to),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: RecordedCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl ChainClient for FakeChainClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn estimate_gas(&self, _tx: TransactionRequest) -> Result<u64> {
        self.record(RecordedCall::EstimateGas);
        self.gas.clone().map_err(Error::Rpc)
    }

    async fn estimate_fees(&self) -> Result<FeeEstimate> {
        self.record(RecordedCall::EstimateFees);
        self.fees.clone().map_err(Error::Rpc)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash> {
        let attempt = self.send_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_send_at == Some(attempt) {
            return Err(Error::Rpc("nonce too low".to_string()));
        }

        let to = tx.to.and_then(|kind| kind.to().copied()).unwrap_or_default();
        self.record(RecordedCall::Send { to, gas: tx.gas });
        self.journal.push(format!("send:{}", to));

        let n = self.accepted.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TxHash::with_last_byte(n as u8))
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<()> {
        let n = self.waits.fetch_add(1, Ordering::SeqCst) + 1;
        self.record(RecordedCall::Wait(tx_hash));
        self.journal.push(format!("wait:{}", tx_hash));
        if self.fail_receipt_at == Some(n) {
            return Err(Error::Rpc(format!("Transaction {} reverted", tx_hash)));
        }
        Ok(())
    }
}

/// Hands out one shared [`FakeChainClient`] and counts connections
pub struct FakeConnector {
    client: Arc<FakeChainClient>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(client: Arc<FakeChainClient>) -> Self {
        Self {
            client,
            connects: AtomicUsize::new(0),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl ChainConnector for FakeConnector {
    fn connect(
        &self,
        _chain: &ChainDescriptor,
        _wallet: Option<&SecureWallet>,
    ) -> Result<Arc<dyn ChainClient>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let client: Arc<dyn ChainClient> = self.client.clone();
        Ok(client)
    }
}

/// Quote service answering every solve with the same response
pub struct FakeQuoteService {
    solve_response: std::result::Result<Value, UpstreamError>,
    solves: Mutex<Vec<SolveRequest>>,
    journal: Journal,
}

impl FakeQuoteService {
    pub fn new(solve_response: Value) -> Self {
        Self {
            solve_response: Ok(solve_response),
            solves: Mutex::new(Vec::new()),
            journal: Journal::default(),
        }
    }

    pub fn failing(error: UpstreamError) -> Self {
        Self {
            solve_response: Err(error),
            solves: Mutex::new(Vec::new()),
            journal: Journal::default(),
        }
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    pub fn solves(&self) -> Vec<SolveRequest> {
        self.solves.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl QuoteService for FakeQuoteService {
    async fn get_quote(
        &self,
        request: &QuoteRequest,
    ) -> std::result::Result<QuoteResponse, UpstreamError> {
        serde_json::from_value(json!({"quoteId": format!("quote-{}", request.chain_id)}))
            .map_err(|e| UpstreamError::invalid_response(e.to_string()))
    }

    async fn solve(&self, request: &SolveRequest) -> std::result::Result<Value, UpstreamError> {
        if let Ok(mut solves) = self.solves.lock() {
            solves.push(request.clone());
        }
        self.journal.push(format!("solve:{}", request.quote_id));
        self.solve_response.clone()
    }
}
