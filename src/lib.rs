//! Intent Executor
//!
//! Executes quotes from a remote intent-trading service:
//! - Normalizes the service's EIP-712 payloads and transaction triples
//! - Runs ERC-20 approvals in order, each mined before the next
//! - Signs permit2/bridge payloads with a local key, or accepts signatures
//!   produced elsewhere
//! - Exchanges signatures for an unsigned transaction and optionally
//!   broadcasts it
//!
//! # Security Model
//!
//! - The private key is read once from process configuration
//! - It is never accepted per request, serialized or logged
//! - Payload signatures and transaction authorization are separate needs;
//!   caller signatures never stand in for the broadcasting key

pub mod api;
pub mod approvals;
pub mod audit;
pub mod chains;
pub mod config;
pub mod executor;
pub mod gas;
pub mod normalize;
pub mod types;
pub mod wallet;

mod error;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use api::{HttpQuoteClient, QuoteRequest, QuoteResponse, QuoteService, UpstreamError};
pub use audit::AuditLog;
pub use chains::{ChainDescriptor, ChainRegistry};
pub use config::{Config, RpcConfig, Secrets};
pub use error::{Error, ExecutionError, Result};
pub use executor::{ExecuteRequest, ExecutionOrchestrator, ExecutionResult, SigningMode};
pub use wallet::{HttpConnector, SecureWallet};
