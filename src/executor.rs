//! Quote execution orchestrator
//!
//! One run moves through mode selection, chain resolution, the optional
//! approval phase, signing, solve and the optional broadcast. The signing
//! mode is chosen once on entry and threaded through every later phase.
//! Every outcome, failures included, comes back as an [`ExecutionResult`].

use crate::api::{QuoteResponse, QuoteService, SolveRequest, UpstreamError};
use crate::approvals::ApprovalRunner;
use crate::audit::AuditLog;
use crate::chains::{ChainDescriptor, ChainRegistry, DEFAULT_CHAIN_ID};
use crate::error::ExecutionError;
use crate::gas;
use crate::normalize::{
    normalize_bridge_payload, normalize_for_signing, normalize_permit2_payload,
    parse_transaction_call, parse_u256, SigningPayload,
};
use crate::types::{ApprovalHashes, ApprovalStep, PendingTransaction, Signatures};
use crate::wallet::{ChainClient, ChainConnector, SecureWallet};
use alloy::hex;
use alloy::primitives::TxHash;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

type ExecResult<T> = std::result::Result<T, ExecutionError>;

/// How payload signatures and the transaction itself get authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SigningMode {
    /// The configured key signs payloads, sends approvals and broadcasts
    SelfContained,
    /// Payload signatures come from the caller
    ExternalSignatures,
    /// Nothing is signed locally; the caller gets the unsigned transaction
    PrepareOnly,
}

impl SigningMode {
    /// Pick the mode for a run
    ///
    /// Caller-supplied signatures always win over the configured key. With
    /// neither, only a non-broadcasting run can proceed.
    pub fn select(has_key: bool, has_external: bool, broadcast: bool) -> ExecResult<Self> {
        match (has_key, has_external, broadcast) {
            (_, true, _) => Ok(SigningMode::ExternalSignatures),
            (true, false, _) => Ok(SigningMode::SelfContained),
            (false, false, false) => Ok(SigningMode::PrepareOnly),
            (false, false, true) => Err(ExecutionError::NoSigningMethod),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SigningMode::SelfContained => "self-contained",
            SigningMode::ExternalSignatures => "external-signatures",
            SigningMode::PrepareOnly => "prepare-only",
        }
    }
}

impl fmt::Display for SigningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_broadcast() -> bool {
    true
}

/// Input of one orchestration run
///
/// Unknown fields are rejected, so a private key can never ride along with a
/// request; the only key the orchestrator uses is the one it was built with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExecuteRequest {
    pub quote_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permit2_payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permit2_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_signature: Option<String>,
    /// Raw approval transactions from the quote
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub approvals: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_chain_id: Option<u64>,
    #[serde(default = "default_broadcast")]
    pub broadcast: bool,
}

impl ExecuteRequest {
    pub fn new(quote_id: impl Into<String>) -> Self {
        Self {
            quote_id: quote_id.into(),
            permit2_payload: None,
            bridge_payload: None,
            permit2_signature: None,
            bridge_signature: None,
            approvals: Vec::new(),
            source_chain_id: None,
            broadcast: true,
        }
    }

    /// Request carrying everything a quote asks to be signed and approved
    pub fn from_quote(quote: &QuoteResponse) -> Self {
        Self {
            permit2_payload: quote.permit2_payload().cloned(),
            bridge_payload: quote.bridge_payload().cloned(),
            approvals: quote.approvals.clone(),
            ..Self::new(quote.quote_id.clone())
        }
    }

    /// Caller-supplied signatures; empty strings count as absent
    fn external_signatures(&self) -> Signatures {
        let present = |s: &Option<String>| s.as_ref().filter(|s| !s.trim().is_empty()).cloned();
        Signatures {
            permit2: present(&self.permit2_signature),
            bridge: present(&self.bridge_signature),
        }
    }
}

/// Outcome of one orchestration run
///
/// `tx_hash` is set only when the run succeeded and broadcast the
/// transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    /// `None` only when no mode could be selected
    pub mode: Option<SigningMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Signatures::is_empty")]
    pub signatures: Signatures,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<PendingTransaction>,
    /// Confirmed approvals, also reported when a later one failed
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub approval_hashes: ApprovalHashes,
}

/// What a run has produced so far
#[derive(Default)]
struct RunState {
    mode: Option<SigningMode>,
    chain_id: Option<u64>,
    signatures: Signatures,
    approval_hashes: ApprovalHashes,
    transaction: Option<PendingTransaction>,
    tx_hash: Option<TxHash>,
    explorer_url: Option<String>,
}

impl RunState {
    fn finish(self, outcome: ExecResult<()>) -> ExecutionResult {
        let (error, error_kind) = match &outcome {
            Ok(()) => (None, None),
            Err(e) => (Some(e.to_string()), Some(e.kind())),
        };
        ExecutionResult {
            success: outcome.is_ok(),
            mode: self.mode,
            chain_id: self.chain_id,
            tx_hash: self.tx_hash,
            explorer_url: self.explorer_url,
            error,
            error_kind,
            signatures: self.signatures,
            transaction: self.transaction,
            approval_hashes: self.approval_hashes,
        }
    }
}

/// Payloads and approvals parsed before any network I/O
#[derive(Default)]
struct Prepared {
    permit2: Option<SigningPayload>,
    bridge: Option<SigningPayload>,
    approvals: Vec<ApprovalStep>,
}

/// Drives quotes from signatures to a submitted (or prepared) transaction
pub struct ExecutionOrchestrator {
    registry: Arc<ChainRegistry>,
    quotes: Arc<dyn QuoteService>,
    connector: Arc<dyn ChainConnector>,
    wallet: Option<Arc<SecureWallet>>,
    default_chain_id: u64,
    audit: Option<AuditLog>,
}

impl ExecutionOrchestrator {
    pub fn new(
        registry: Arc<ChainRegistry>,
        quotes: Arc<dyn QuoteService>,
        connector: Arc<dyn ChainConnector>,
    ) -> Self {
        Self {
            registry,
            quotes,
            connector,
            wallet: None,
            default_chain_id: DEFAULT_CHAIN_ID,
            audit: None,
        }
    }

    /// Key used for self-contained signing and for broadcasting
    pub fn with_wallet(mut self, wallet: Arc<SecureWallet>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    /// Chain used when neither the permit2 domain nor the request names one
    pub fn with_default_chain(mut self, chain_id: u64) -> Self {
        self.default_chain_id = chain_id;
        self
    }

    pub fn with_audit_log(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Execute a quote; never fails, failures are reported in the result
    pub async fn execute(&self, request: ExecuteRequest) -> ExecutionResult {
        let started = Instant::now();
        let mut state = RunState::default();
        let outcome = self.run(&request, &mut state).await;
        let result = state.finish(outcome);

        match &result.error {
            None => info!(
                quote_id = %request.quote_id,
                mode = ?result.mode.map(|m| m.as_str()),
                chain_id = ?result.chain_id,
                tx_hash = ?result.tx_hash,
                "Execution finished"
            ),
            Some(err) => error!(
                quote_id = %request.quote_id,
                mode = ?result.mode.map(|m| m.as_str()),
                chain_id = ?result.chain_id,
                kind = ?result.error_kind,
                error = %err,
                "Execution failed"
            ),
        }

        if let Some(audit) = &self.audit {
            audit.record(&request.quote_id, &result, started.elapsed()).await;
        }
        result
    }

    async fn run(&self, request: &ExecuteRequest, state: &mut RunState) -> ExecResult<()> {
        let external = request.external_signatures();

        // Mode selection
        let mode = SigningMode::select(self.wallet.is_some(), !external.is_empty(), request.broadcast)?;
        state.mode = Some(mode);
        info!(quote_id = %request.quote_id, mode = %mode, broadcast = request.broadcast, "Executing quote");

        // Chain resolution
        let chain_id = request
            .permit2_payload
            .as_ref()
            .and_then(payload_chain_id)
            .or(request.source_chain_id)
            .unwrap_or(self.default_chain_id);
        state.chain_id = Some(chain_id);
        let chain = self
            .registry
            .resolve(chain_id)
            .map_err(|_| ExecutionError::UnsupportedChain(chain_id))?;
        debug!(chain_id, chain = chain.name, rpc_url = %chain.rpc_url, "Chain resolved");

        let prepared = match mode {
            SigningMode::SelfContained => prepare(request)?,
            _ => {
                if !request.approvals.is_empty() {
                    debug!(
                        count = request.approvals.len(),
                        "Skipping approvals, the caller submits them in this mode"
                    );
                }
                Prepared::default()
            }
        };

        // Approval phase
        let mut client: Option<Arc<dyn ChainClient>> = None;
        if mode == SigningMode::SelfContained && !prepared.approvals.is_empty() {
            let wallet = self.wallet()?;
            let approval_client = self.connect(chain, wallet).map_err(|e| {
                ExecutionError::ApprovalFailure {
                    index: 0,
                    message: e.to_string(),
                    confirmed: Vec::new(),
                }
            })?;

            info!(count = prepared.approvals.len(), "Running approvals");
            match ApprovalRunner::new(wallet, approval_client.as_ref())
                .run(&prepared.approvals)
                .await
            {
                Ok(hashes) => state.approval_hashes = hashes,
                Err(e) => {
                    if let ExecutionError::ApprovalFailure { confirmed, .. } = &e {
                        state.approval_hashes = confirmed.clone();
                    }
                    return Err(e);
                }
            }
            client = Some(approval_client);
        }

        // Signing phase
        match mode {
            SigningMode::SelfContained => {
                let wallet = self.wallet()?;
                state.signatures = Signatures {
                    permit2: prepared
                        .permit2
                        .as_ref()
                        .map(|p| sign(wallet, p, "permit2"))
                        .transpose()?,
                    bridge: prepared
                        .bridge
                        .as_ref()
                        .map(|p| sign(wallet, p, "bridge"))
                        .transpose()?,
                };
            }
            SigningMode::ExternalSignatures => {
                state.signatures = external;
                if request.broadcast && self.wallet.is_none() {
                    return Err(ExecutionError::BroadcastRequiresKey);
                }
            }
            SigningMode::PrepareOnly => state.signatures = external,
        }

        // Solve phase
        let solve = SolveRequest {
            quote_id: request.quote_id.clone(),
            permit2_signature: state.signatures.permit2.clone(),
            bridge_signature: state.signatures.bridge.clone(),
        };
        let raw = self.quotes.solve(&solve).await?;
        let call = parse_transaction_call(&raw).map_err(|e| {
            ExecutionError::UpstreamFailure(UpstreamError::invalid_response(format!(
                "solve returned an unusable transaction: {}",
                e
            )))
        })?;
        let mut pending = PendingTransaction::new(call, chain.chain_id);
        info!(quote_id = %request.quote_id, to = %pending.to, value = %pending.value, "Transaction prepared");

        if !request.broadcast {
            state.transaction = Some(pending);
            return Ok(());
        }

        // Broadcast phase
        let wallet = self.wallet()?;
        let client = match client {
            Some(client) => client,
            None => self
                .connect(chain, wallet)
                .map_err(|e| ExecutionError::BroadcastFailure(e.to_string()))?,
        };

        pending.gas = gas::estimate(client.as_ref(), &pending.to_request(wallet.address())).await;
        if pending.gas.is_none() {
            warn!(chain_id, "Broadcasting without explicit gas parameters");
        }
        state.transaction = Some(pending.clone());

        let tx_hash = wallet
            .send_transaction(client.as_ref(), pending.to_request(wallet.address()))
            .await
            .map_err(|e| ExecutionError::BroadcastFailure(e.to_string()))?;

        state.explorer_url = Some(self.registry.explorer_url(chain_id, &tx_hash.to_string()));
        state.tx_hash = Some(tx_hash);
        Ok(())
    }

    /// The configured key; only reachable in modes that selected it
    fn wallet(&self) -> ExecResult<&SecureWallet> {
        self.wallet
            .as_deref()
            .ok_or(ExecutionError::BroadcastRequiresKey)
    }

    fn connect(
        &self,
        chain: &ChainDescriptor,
        wallet: &SecureWallet,
    ) -> crate::Result<Arc<dyn ChainClient>> {
        self.connector.connect(chain, Some(wallet))
    }
}

/// Parse payloads and approvals for self-contained signing
///
/// Runs before the approval phase so a malformed payload never leaves
/// approvals on chain for a transaction that cannot be signed.
fn prepare(request: &ExecuteRequest) -> ExecResult<Prepared> {
    let signing = |e: crate::Error| ExecutionError::SigningFailure(e.to_string());

    let permit2 = request
        .permit2_payload
        .as_ref()
        .map(normalize_permit2_payload)
        .transpose()
        .map_err(signing)?;
    let bridge = request
        .bridge_payload
        .as_ref()
        .map(normalize_bridge_payload)
        .transpose()
        .map_err(signing)?;
    let approvals = request
        .approvals
        .iter()
        .map(parse_transaction_call)
        .collect::<crate::Result<Vec<_>>>()
        .map_err(|e| ExecutionError::InvalidRequest(format!("Invalid approval: {}", e)))?;

    Ok(Prepared {
        permit2,
        bridge,
        approvals,
    })
}

fn sign(wallet: &SecureWallet, payload: &SigningPayload, which: &str) -> ExecResult<String> {
    let signature = wallet
        .sign_typed_data(payload)
        .map_err(|e| ExecutionError::SigningFailure(format!("{} payload: {}", which, e)))?;
    debug!(payload = which, primary_type = %payload.primary_type, "Payload signed");
    Ok(hex::encode_prefixed(signature.as_bytes()))
}

/// Chain id in the domain of a permit2 payload, if numeric
fn payload_chain_id(payload: &Value) -> Option<u64> {
    let normalized = normalize_for_signing(payload);
    normalized
        .get("domain")?
        .get("chainId")
        .and_then(parse_u256)
        .and_then(|id| u64::try_from(id).ok())
}
