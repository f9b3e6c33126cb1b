//! Configuration for the intent executor

pub mod rpc;

use crate::chains::DEFAULT_CHAIN_ID;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// Re-export RPC config
pub use rpc::RpcConfig;

/// Private key for self-contained signing
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

/// Quote service base URL override
pub const QUOTE_API_URL_ENV: &str = "QUOTE_API_URL";

/// Quote service API key
pub const QUOTE_API_KEY_ENV: &str = "QUOTE_API_KEY";

/// Remote quoting service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL, without trailing slash
    pub base_url: String,
    /// Request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8787/v1".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Quote service settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Chain used when neither the permit2 domain nor the caller names one
    #[serde(default = "default_chain_id")]
    pub default_chain_id: u64,
    /// Per-chain RPC overrides; `RPC_URL_<CHAIN_ID>` env vars take priority
    #[serde(default)]
    pub rpc_overrides: HashMap<u64, String>,
    /// Path to the execution audit log (JSONL)
    #[serde(default)]
    pub audit_log_path: Option<String>,
}

fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            default_chain_id: DEFAULT_CHAIN_ID,
            rpc_overrides: HashMap::new(),
            audit_log_path: None,
        }
    }
}

impl Config {
    /// Apply environment overrides that live in the config file too
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(QUOTE_API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = url.trim_end_matches('/').to_string();
            }
        }
        self
    }

    /// RPC overrides from the environment, backed by the file's `rpc_overrides`
    pub fn rpc_config(&self) -> RpcConfig {
        RpcConfig::from_env().merge_defaults(&self.rpc_overrides)
    }
}

/// Secrets read once from the environment at startup
///
/// Neither value is serialized or printed.
#[derive(Default)]
pub struct Secrets {
    pub private_key: Option<SecretString>,
    pub api_key: Option<SecretString>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            private_key: read_secret(PRIVATE_KEY_ENV),
            api_key: read_secret(QUOTE_API_KEY_ENV),
        }
    }
}

fn read_secret(var_name: &str) -> Option<SecretString> {
    std::env::var(var_name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(|v| SecretString::from(v.trim().to_string()))
}
