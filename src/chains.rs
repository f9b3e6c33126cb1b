//! Chain registry
//!
//! Static network table for every chain the executor can sign for, combined
//! once at startup with the RPC overrides from [`RpcConfig`]. The registry is
//! read-only after construction and is shared behind an `Arc`.

use crate::config::RpcConfig;
use crate::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Chain ID constants
pub mod chains {
    pub const ETHEREUM: u64 = 1;
    pub const OPTIMISM: u64 = 10;
    pub const BSC: u64 = 56;
    pub const GNOSIS: u64 = 100;
    pub const UNICHAIN: u64 = 130;
    pub const POLYGON: u64 = 137;
    pub const SONIC: u64 = 146;
    pub const ZKSYNC: u64 = 324;
    pub const MANTLE: u64 = 5000;
    pub const BASE: u64 = 8453;
    pub const ARBITRUM: u64 = 42161;
    pub const AVALANCHE: u64 = 43114;
    pub const LINEA: u64 = 59144;
    pub const BLAST: u64 = 81457;
    pub const SCROLL: u64 = 534352;
}

/// Chains the executor advertises as supported.
pub const SUPPORTED_CHAIN_IDS: &[u64] = &[
    chains::ETHEREUM,
    chains::OPTIMISM,
    chains::BSC,
    chains::GNOSIS,
    chains::UNICHAIN,
    chains::POLYGON,
    chains::SONIC,
    chains::ZKSYNC,
    chains::MANTLE,
    chains::BASE,
    chains::ARBITRUM,
    chains::AVALANCHE,
    chains::LINEA,
    chains::BLAST,
    chains::SCROLL,
];

/// Chain used when neither the permit2 domain nor the caller names one.
pub const DEFAULT_CHAIN_ID: u64 = chains::ETHEREUM;

/// Multi-chain RPC gateway, keyed by chain id.
const RPC_GATEWAY_TEMPLATE: &str = "https://{chain_id}.rpc.thirdweb.com";

/// Multi-chain explorer used for chains without a curated explorer.
const FALLBACK_EXPLORER: &str = "https://blockscan.com";

/// Native currency metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NativeCurrency {
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
}

impl NativeCurrency {
    const fn new(name: &'static str, symbol: &'static str) -> Self {
        Self {
            name,
            symbol,
            decimals: 18,
        }
    }

    const fn ether() -> Self {
        Self::new("Ether", "ETH")
    }
}

/// One row of the static chain table
struct ChainEntry {
    chain_id: u64,
    name: &'static str,
    /// Curated public endpoint (rate limited); `None` defers to the gateway
    public_rpc: Option<&'static str>,
    explorer: &'static str,
    native: NativeCurrency,
}

const CHAIN_TABLE: &[ChainEntry] = &[
    ChainEntry {
        chain_id: chains::ETHEREUM,
        name: "Ethereum",
        public_rpc: Some("https://eth.llamarpc.com"),
        explorer: "https://etherscan.io",
        native: NativeCurrency::ether(),
    },
    ChainEntry {
        chain_id: chains::OPTIMISM,
        name: "Optimism",
        public_rpc: Some("https://mainnet.optimism.io"),
        explorer: "https://optimistic.etherscan.io",
        native: NativeCurrency::ether(),
    },
    ChainEntry {
        chain_id: chains::BSC,
        name: "BNB Smart Chain",
        public_rpc: Some("https://bsc-dataseed.bnbchain.org"),
        explorer: "https://bscscan.com",
        native: NativeCurrency::new("BNB", "BNB"),
    },
    ChainEntry {
        chain_id: chains::GNOSIS,
        name: "Gnosis",
        public_rpc: Some("https://rpc.gnosischain.com"),
        explorer: "https://gnosisscan.io",
        native: NativeCurrency::new("xDAI", "XDAI"),
    },
    ChainEntry {
        chain_id: chains::UNICHAIN,
        name: "Unichain",
        public_rpc: Some("https://mainnet.unichain.org"),
        explorer: "https://uniscan.xyz",
        native: NativeCurrency::ether(),
    },
    ChainEntry {
        chain_id: chains::POLYGON,
        name: "Polygon",
        public_rpc: Some("https://polygon-rpc.com"),
        explorer: "https://polygonscan.com",
        native: NativeCurrency::new("POL", "POL"),
    },
    ChainEntry {
        chain_id: chains::SONIC,
        name: "Sonic",
        public_rpc: Some("https://rpc.soniclabs.com"),
        explorer: "https://sonicscan.org",
        native: NativeCurrency::new("Sonic", "S"),
    },
    ChainEntry {
        chain_id: chains::ZKSYNC,
        name: "zkSync Era",
        public_rpc: Some("https://mainnet.era.zksync.io"),
        explorer: "https://explorer.zksync.io",
        native: NativeCurrency::ether(),
    },
    ChainEntry {
        chain_id: chains::MANTLE,
        name: "Mantle",
        public_rpc: None,
        explorer: "https://mantlescan.xyz",
        native: NativeCurrency::new("Mantle", "MNT"),
    },
    ChainEntry {
        chain_id: chains::BASE,
        name: "Base",
        public_rpc: Some("https://mainnet.base.org"),
        explorer: "https://basescan.org",
        native: NativeCurrency::ether(),
    },
    ChainEntry {
        chain_id: chains::ARBITRUM,
        name: "Arbitrum One",
        public_rpc: Some("https://arb1.arbitrum.io/rpc"),
        explorer: "https://arbiscan.io",
        native: NativeCurrency::ether(),
    },
    ChainEntry {
        chain_id: chains::AVALANCHE,
        name: "Avalanche C-Chain",
        public_rpc: Some("https://api.avax.network/ext/bc/C/rpc"),
        explorer: "https://snowtrace.io",
        native: NativeCurrency::new("Avalanche", "AVAX"),
    },
    ChainEntry {
        chain_id: chains::LINEA,
        name: "Linea",
        public_rpc: Some("https://rpc.linea.build"),
        explorer: "https://lineascan.build",
        native: NativeCurrency::ether(),
    },
    ChainEntry {
        chain_id: chains::BLAST,
        name: "Blast",
        public_rpc: None,
        explorer: "https://blastscan.io",
        native: NativeCurrency::ether(),
    },
    ChainEntry {
        chain_id: chains::SCROLL,
        name: "Scroll",
        public_rpc: Some("https://rpc.scroll.io"),
        explorer: "https://scrollscan.com",
        native: NativeCurrency::ether(),
    },
];

/// Resolved network parameters for one chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainDescriptor {
    pub chain_id: u64,
    pub name: &'static str,
    /// RPC endpoint after applying overrides
    pub rpc_url: String,
    /// Block explorer base URL (no trailing slash)
    pub explorer_url: String,
    pub native_currency: NativeCurrency,
}

impl ChainDescriptor {
    /// Explorer link for a transaction on this chain
    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url, tx_hash)
    }
}

/// Immutable chain id → descriptor lookup
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: BTreeMap<u64, ChainDescriptor>,
    rpc: RpcConfig,
}

impl ChainRegistry {
    /// Build the registry from the static table plus RPC overrides
    pub fn new(rpc: RpcConfig) -> Self {
        let chains = CHAIN_TABLE
            .iter()
            .map(|entry| {
                let descriptor = ChainDescriptor {
                    chain_id: entry.chain_id,
                    name: entry.name,
                    rpc_url: resolve_rpc_url(&rpc, entry.chain_id, entry.public_rpc),
                    explorer_url: entry.explorer.to_string(),
                    native_currency: entry.native,
                };
                (entry.chain_id, descriptor)
            })
            .collect();

        Self { chains, rpc }
    }

    /// Look up a supported chain
    pub fn resolve(&self, chain_id: u64) -> Result<&ChainDescriptor> {
        self.chains
            .get(&chain_id)
            .ok_or(Error::UnsupportedChain(chain_id))
    }

    /// RPC URL for any chain id, supported or not
    ///
    /// Override, then curated public endpoint, then the gateway template.
    pub fn rpc_url(&self, chain_id: u64) -> String {
        match self.chains.get(&chain_id) {
            Some(descriptor) => descriptor.rpc_url.clone(),
            None => resolve_rpc_url(&self.rpc, chain_id, None),
        }
    }

    /// Explorer link for a transaction, falling back to a multi-chain explorer
    pub fn explorer_url(&self, chain_id: u64, tx_hash: &str) -> String {
        match self.chains.get(&chain_id) {
            Some(descriptor) => descriptor.tx_url(tx_hash),
            None => format!("{}/tx/{}", FALLBACK_EXPLORER, tx_hash),
        }
    }

    /// All descriptors, ordered by chain id
    pub fn iter(&self) -> impl Iterator<Item = &ChainDescriptor> {
        self.chains.values()
    }
}

fn resolve_rpc_url(rpc: &RpcConfig, chain_id: u64, public_rpc: Option<&str>) -> String {
    if let Some(url) = rpc.get(chain_id) {
        return url.to_string();
    }
    if let Some(url) = public_rpc {
        return url.to_string();
    }
    tracing::debug!(chain_id, "No curated RPC, using gateway");
    RPC_GATEWAY_TEMPLATE.replace("{chain_id}", &chain_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashMap};

    fn registry() -> ChainRegistry {
        ChainRegistry::new(RpcConfig::with_urls(HashMap::new()))
    }

    #[test]
    fn test_registry_matches_advertised_chains() {
        let advertised: BTreeSet<u64> = SUPPORTED_CHAIN_IDS.iter().copied().collect();
        let registered: BTreeSet<u64> = registry().iter().map(|c| c.chain_id).collect();
        assert_eq!(advertised, registered);
        assert_eq!(advertised.len(), SUPPORTED_CHAIN_IDS.len(), "duplicate chain id");
        assert!(advertised.contains(&DEFAULT_CHAIN_ID));
    }

    #[test]
    fn test_every_supported_chain_resolves() {
        let registry = registry();
        for &chain_id in SUPPORTED_CHAIN_IDS {
            let descriptor = registry.resolve(chain_id).unwrap();
            assert_eq!(descriptor.chain_id, chain_id);
            assert!(!descriptor.rpc_url.is_empty());
            assert!(!descriptor.explorer_url.is_empty());
            assert!(!registry.explorer_url(chain_id, "0xabc").is_empty());
        }
    }

    #[test]
    fn test_unsupported_chain() {
        let err = registry().resolve(999_999_999).unwrap_err();
        assert!(matches!(err, Error::UnsupportedChain(999_999_999)));
    }

    #[test]
    fn test_override_beats_public_rpc() {
        let mut urls = HashMap::new();
        urls.insert(chains::BASE, "https://base.custom".to_string());
        let registry = ChainRegistry::new(RpcConfig::with_urls(urls));

        assert_eq!(registry.rpc_url(chains::BASE), "https://base.custom");
        assert_eq!(registry.rpc_url(chains::ARBITRUM), "https://arb1.arbitrum.io/rpc");
    }

    #[test]
    fn test_gateway_fallback() {
        let registry = registry();
        assert_eq!(
            registry.rpc_url(chains::MANTLE),
            "https://5000.rpc.thirdweb.com"
        );
        assert_eq!(registry.rpc_url(777), "https://777.rpc.thirdweb.com");
    }

    #[test]
    fn test_explorer_urls() {
        let registry = registry();
        assert_eq!(
            registry.explorer_url(chains::BASE, "0x01"),
            "https://basescan.org/tx/0x01"
        );
        assert_eq!(
            registry.explorer_url(777, "0x01"),
            "https://blockscan.com/tx/0x01"
        );
    }
}
