//! Error types for the intent executor

use crate::api::UpstreamError;
use alloy::primitives::TxHash;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Quote service error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported chain: {0}")]
    UnsupportedChain(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Terminal failures of one orchestration run.
///
/// Display strings lead with the failure name so callers can match on the
/// text of `ExecutionResult::error` as well as on `error_kind`.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error(
        "NoSigningMethod: broadcast requested but no PRIVATE_KEY is configured and no \
         signatures were supplied; configure a key, pass signatures, or disable broadcast"
    )]
    NoSigningMethod,

    #[error("UnsupportedChain: chain id {0} is not supported")]
    UnsupportedChain(u64),

    #[error(
        "BroadcastRequiresKey: supplied signatures authorize the permit2/bridge payloads only, \
         not submission of the transaction itself; configure PRIVATE_KEY or disable broadcast"
    )]
    BroadcastRequiresKey,

    #[error("ApprovalFailure: approval {index} failed: {message}")]
    ApprovalFailure {
        index: usize,
        message: String,
        confirmed: Vec<TxHash>,
    },

    #[error("SigningFailure: {0}")]
    SigningFailure(String),

    #[error("UpstreamFailure: {0}")]
    UpstreamFailure(#[from] UpstreamError),

    #[error("BroadcastFailure: {0}")]
    BroadcastFailure(String),

    #[error("InvalidRequest: {0}")]
    InvalidRequest(String),
}

impl ExecutionError {
    /// Stable name of the failure class
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionError::NoSigningMethod => "NoSigningMethod",
            ExecutionError::UnsupportedChain(_) => "UnsupportedChain",
            ExecutionError::BroadcastRequiresKey => "BroadcastRequiresKey",
            ExecutionError::ApprovalFailure { .. } => "ApprovalFailure",
            ExecutionError::SigningFailure(_) => "SigningFailure",
            ExecutionError::UpstreamFailure(_) => "UpstreamFailure",
            ExecutionError::BroadcastFailure(_) => "BroadcastFailure",
            ExecutionError::InvalidRequest(_) => "InvalidRequest",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_leads_with_kind() {
        let errors = [
            ExecutionError::NoSigningMethod,
            ExecutionError::UnsupportedChain(999_999_999),
            ExecutionError::BroadcastRequiresKey,
            ExecutionError::SigningFailure("bad payload".to_string()),
            ExecutionError::BroadcastFailure("nonce too low".to_string()),
        ];
        for err in errors {
            assert!(err.to_string().starts_with(err.kind()), "{err}");
        }
    }
}
