//! Local Ethereum wallet backed by alloy's private-key signer.

use alloy::primitives::B256;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;

use super::{Wallet, WalletError};

/// Wallet holding a private key in process.
#[derive(Debug, Clone)]
pub struct LocalWallet {
    signer: PrivateKeySigner,
    chain_id: u64,
}

impl LocalWallet {
    /// Generate a wallet with a fresh random key.
    pub fn random(chain_id: u64) -> Self {
        Self {
            signer: PrivateKeySigner::random(),
            chain_id,
        }
    }

    /// Load a wallet from a hex private key, with or without the `0x` prefix.
    pub fn from_private_key(private_key_hex: &str, chain_id: u64) -> Result<Self, WalletError> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);
        let key_bytes = hex::decode(key_hex).map_err(|_| WalletError::InvalidPrivateKey)?;
        if key_bytes.len() != 32 {
            return Err(WalletError::InvalidPrivateKey);
        }
        let signer = PrivateKeySigner::from_bytes(&B256::from_slice(&key_bytes))
            .map_err(|e| WalletError::SignerCreation(e.to_string()))?;
        Ok(Self { signer, chain_id })
    }

    #[cfg(test)]
    fn private_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signer.credential().to_bytes()))
    }
}

#[async_trait]
impl Wallet for LocalWallet {
    fn address(&self) -> String {
        format!("{:#x}", self.signer.address())
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.chain_id)
    }

    async fn sign_message(&self, message: &str) -> Result<String, WalletError> {
        let signature = self
            .signer
            .sign_message(message.as_bytes())
            .await
            .map_err(|e| WalletError::SigningFailed(e.to_string()))?;
        Ok(format!("0x{}", hex::encode(signature.as_bytes())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_key_round_trip() {
        let wallet = LocalWallet::random(1);
        let restored = LocalWallet::from_private_key(&wallet.private_key_hex(), 1).unwrap();
        assert_eq!(restored.address(), wallet.address());
        assert!(wallet.address().starts_with("0x"));
        assert_eq!(wallet.address().len(), 42);
    }

    #[test]
    fn test_rejects_malformed_key() {
        assert_eq!(
            LocalWallet::from_private_key("0xnothex", 1).unwrap_err(),
            WalletError::InvalidPrivateKey
        );
        assert_eq!(
            LocalWallet::from_private_key("0xabcd", 1).unwrap_err(),
            WalletError::InvalidPrivateKey
        );
    }

    #[tokio::test]
    async fn test_sign_message_produces_65_byte_signature() {
        let wallet = LocalWallet::random(31337);
        let sig = wallet.sign_message("hello dao").await.unwrap();
        assert!(sig.starts_with("0x"));
        assert_eq!(sig.len(), 2 + 65 * 2);
        assert_eq!(wallet.chain_id().await.unwrap(), 31337);
    }
}
