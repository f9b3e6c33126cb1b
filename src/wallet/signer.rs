//! Secure wallet implementation
//!
//! SECURITY: This is the ONLY place where private keys exist.
//! - Keys come from process configuration only, never from a request
//! - Keys are held in alloy's PrivateKeySigner which handles crypto securely
//! - Keys are never serialized and never logged

use crate::normalize::SigningPayload;
use crate::wallet::ChainClient;
use crate::{Error, Result};
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, TxHash, B256};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::{Signature, SignerSync};
use secrecy::{ExposeSecret, SecretString};

/// Secure wallet that protects private keys
///
/// Used for two independent jobs: EIP-712 payload signatures and
/// authorization of transaction submission.
pub struct SecureWallet {
    /// The signer
    signer: PrivateKeySigner,
    /// Public address (safe to expose)
    address: Address,
    /// Ethereum wallet for alloy integration
    wallet: EthereumWallet,
}

impl SecureWallet {
    /// Create a wallet from a secret loaded at startup
    pub fn from_secret(key: &SecretString) -> Result<Self> {
        Self::from_hex(key.expose_secret())
    }

    /// Create a wallet from a hex-encoded private key, with or without `0x`
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let key_hex = key_hex.trim();
        let prefixed = if key_hex.starts_with("0x") || key_hex.starts_with("0X") {
            key_hex.to_string()
        } else {
            format!("0x{}", key_hex)
        };

        // The parse error never echoes the key
        let signer: PrivateKeySigner = prefixed
            .parse()
            .map_err(|_| Error::Wallet("Invalid private key".to_string()))?;

        let address = signer.address();
        let wallet = EthereumWallet::from(signer.clone());

        Ok(Self {
            signer,
            address,
            wallet,
        })
    }

    /// Get the public address (safe to share)
    pub fn address(&self) -> Address {
        self.address
    }

    /// Get a reference to the EthereumWallet for use with alloy providers
    pub fn wallet(&self) -> &EthereumWallet {
        &self.wallet
    }

    /// Sign a 32-byte digest
    pub fn sign_hash(&self, hash: &B256) -> Result<Signature> {
        self.signer
            .sign_hash_sync(hash)
            .map_err(|e| Error::Wallet(format!("Signing failed: {}", e)))
    }

    /// Sign a normalized EIP-712 payload
    pub fn sign_typed_data(&self, payload: &SigningPayload) -> Result<Signature> {
        let typed = payload.to_typed_data()?;
        let hash = typed.eip712_signing_hash().map_err(|e| {
            Error::Wallet(format!(
                "Cannot hash typed data for {}: {}",
                payload.primary_type, e
            ))
        })?;
        self.sign_hash(&hash)
    }

    /// Submit a transaction from this wallet; does not wait for inclusion
    pub async fn send_transaction(
        &self,
        client: &dyn ChainClient,
        tx: TransactionRequest,
    ) -> Result<TxHash> {
        client.send_transaction(tx.from(self.address)).await
    }
}

// Implement Debug manually to avoid exposing the signer
impl std::fmt::Debug for SecureWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureWallet")
            .field("address", &self.address)
            .field("signer", &"[REDACTED]")
            .finish()
    }
}
