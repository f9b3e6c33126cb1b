//! RPC endpoint overrides
//!
//! Overrides are keyed by chain id and take priority over the curated public
//! endpoints in the chain table:
//! 1. `RPC_URL_<CHAIN_ID>` env vars (e.g. `RPC_URL_8453`) - highest priority
//! 2. Named per-chain env vars (`ETH_RPC_URL`, `ARBITRUM_RPC_URL`, ...)
//! 3. `rpc_overrides` from the config file
//!
//! Chains with no override fall back to the public endpoint, then to a
//! multi-chain gateway (see [`crate::chains::ChainRegistry`]).
//!
//! # Examples
//!
//! ```bash
//! export RPC_URL_1="https://eth-mainnet.g.alchemy.com/v2/YOUR_KEY"
//! export RPC_URL_42161="https://arb-mainnet.g.alchemy.com/v2/YOUR_KEY"
//! ```

use crate::chains::chains;
use std::collections::HashMap;

/// Prefix for chain-id keyed overrides
pub const RPC_URL_PREFIX: &str = "RPC_URL_";

/// Named per-chain env vars
const NAMED_RPC_VARS: &[(&str, u64)] = &[
    ("ETH_RPC_URL", chains::ETHEREUM),
    ("ARBITRUM_RPC_URL", chains::ARBITRUM),
    ("OPTIMISM_RPC_URL", chains::OPTIMISM),
    ("BASE_RPC_URL", chains::BASE),
    ("POLYGON_RPC_URL", chains::POLYGON),
];

/// RPC overrides for multiple chains
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcConfig {
    /// RPC URLs indexed by chain ID
    urls: HashMap<u64, String>,
}

impl RpcConfig {
    /// Read overrides from the process environment
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Read overrides from an iterator of `(name, value)` pairs
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut keyed = HashMap::new();
        let mut named = HashMap::new();

        for (name, value) in vars {
            if value.trim().is_empty() {
                continue;
            }
            if let Some(id) = name.strip_prefix(RPC_URL_PREFIX) {
                match id.parse::<u64>() {
                    Ok(chain_id) => {
                        tracing::debug!(chain_id, "Using {} override", name);
                        keyed.insert(chain_id, value);
                    }
                    Err(_) => tracing::warn!(var = %name, "Ignoring RPC override with non-numeric chain id"),
                }
            } else if let Some((_, chain_id)) = NAMED_RPC_VARS.iter().find(|(n, _)| *n == name) {
                tracing::debug!(chain_id, "Using {} override", name);
                named.insert(*chain_id, value);
            }
        }

        // Chain-id keyed vars win over the named ones
        named.extend(keyed);
        Self { urls: named }
    }

    /// Create with explicit RPC URLs
    pub fn with_urls(urls: HashMap<u64, String>) -> Self {
        Self { urls }
    }

    /// Add overrides that do not already exist
    pub fn merge_defaults(mut self, defaults: &HashMap<u64, String>) -> Self {
        for (chain_id, url) in defaults {
            self.urls.entry(*chain_id).or_insert_with(|| url.clone());
        }
        self
    }

    /// Override URL for a chain, if one was configured
    pub fn get(&self, chain_id: u64) -> Option<&str> {
        self.urls.get(&chain_id).map(|s| s.as_str())
    }
}
