//! Secure wallet management
//!
//! This module handles private key storage, payload signing and the RPC
//! client used to submit transactions. The private key NEVER leaves this
//! module.

mod client;
mod signer;

pub use client::{AlloyChainClient, ChainClient, ChainConnector, FeeEstimate, HttpConnector};
pub use signer::SecureWallet;
