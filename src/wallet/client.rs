//! Chain RPC access
//!
//! `ChainClient` is the only path to the network for gas reads, submission and
//! receipt polling. The alloy-backed client attaches the wallet to the
//! provider so `send_transaction` fills nonce/chain id and signs locally.

use crate::chains::ChainDescriptor;
use crate::wallet::SecureWallet;
use crate::{Error, Result};
use alloy::primitives::TxHash;
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use std::sync::Arc;

/// EIP-1559 fee parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

/// RPC operations used while executing a quote
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain_id(&self) -> u64;

    async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64>;

    async fn estimate_fees(&self) -> Result<FeeEstimate>;

    /// Sign and submit; returns as soon as the node accepts the transaction
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash>;

    /// Block until the transaction is mined; a reverted receipt is an error
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<()>;
}

/// Builds a [`ChainClient`] for a resolved chain
pub trait ChainConnector: Send + Sync {
    fn connect(
        &self,
        chain: &ChainDescriptor,
        wallet: Option<&SecureWallet>,
    ) -> Result<Arc<dyn ChainClient>>;
}

/// Connector for JSON-RPC over HTTP
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

impl ChainConnector for HttpConnector {
    fn connect(
        &self,
        chain: &ChainDescriptor,
        wallet: Option<&SecureWallet>,
    ) -> Result<Arc<dyn ChainClient>> {
        let client = AlloyChainClient::new(&chain.rpc_url, chain.chain_id, wallet)?;
        Ok(Arc::new(client))
    }
}

/// `ChainClient` over an alloy HTTP provider
pub struct AlloyChainClient {
    provider: DynProvider,
    chain_id: u64,
}

impl AlloyChainClient {
    pub fn new(rpc_url: &str, chain_id: u64, wallet: Option<&SecureWallet>) -> Result<Self> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e| Error::Config(format!("Invalid RPC URL for chain {}: {}", chain_id, e)))?;

        let provider = match wallet {
            Some(wallet) => ProviderBuilder::new()
                .wallet(wallet.wallet().clone())
                .connect_http(url)
                .erased(),
            None => ProviderBuilder::new().connect_http(url).erased(),
        };

        Ok(Self { provider, chain_id })
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64> {
        self.provider
            .estimate_gas(tx)
            .await
            .map_err(|e| Error::Rpc(format!("Gas estimation failed: {}", e)))
    }

    async fn estimate_fees(&self) -> Result<FeeEstimate> {
        let fees = self
            .provider
            .estimate_eip1559_fees()
            .await
            .map_err(|e| Error::Rpc(format!("Fee estimation failed: {}", e)))?;

        Ok(FeeEstimate {
            max_fee_per_gas: fees.max_fee_per_gas,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
        })
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash> {
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| Error::Rpc(format!("Failed to send transaction: {}", e)))?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<()> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
            .get_receipt()
            .await
            .map_err(|e| Error::Rpc(format!("Failed to confirm {}: {}", tx_hash, e)))?;

        if !receipt.status() {
            return Err(Error::Rpc(format!("Transaction {} reverted", tx_hash)));
        }
        Ok(())
    }
}
