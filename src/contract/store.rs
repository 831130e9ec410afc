//! Key/value contract surface.

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors raised by a contract backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// The contract (or the provider behind it) cannot serve requests.
    #[error("contract unavailable: {0}")]
    Unavailable(String),

    /// The user declined to sign the transaction.
    #[error("user rejected transaction: {0}")]
    Rejected(String),

    /// Any other backend failure.
    #[error("contract backend error: {0}")]
    Backend(String),

    /// Local I/O failure (database file, directory creation).
    #[error("contract I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ContractError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Receipt of a confirmed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// Transaction hash (`0x`-prefixed hex).
    pub hash: String,
    /// Storage key written by the transaction.
    pub key: String,
    /// Block (or sequence) number the write landed in.
    pub block: u64,
}

/// A submitted write awaiting confirmation.
///
/// The write is durable only once [`PendingTransaction::wait`] returns `Ok`.
pub struct PendingTransaction {
    hash: String,
    confirmation: BoxFuture<'static, Result<TxReceipt, ContractError>>,
}

impl PendingTransaction {
    /// Wrap a confirmation future.
    pub fn new<F>(hash: impl Into<String>, confirmation: F) -> Self
    where
        F: Future<Output = Result<TxReceipt, ContractError>> + Send + 'static,
    {
        Self {
            hash: hash.into(),
            confirmation: confirmation.boxed(),
        }
    }

    /// A transaction that is already confirmed.
    pub fn confirmed(receipt: TxReceipt) -> Self {
        let hash = receipt.hash.clone();
        Self::new(hash, futures::future::ready(Ok(receipt)))
    }

    /// Transaction hash assigned at submission.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Wait for on-chain confirmation.
    pub async fn wait(self) -> Result<TxReceipt, ContractError> {
        self.confirmation.await
    }
}

impl fmt::Debug for PendingTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTransaction")
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}

/// Read surface shared by every contract handle.
#[async_trait]
pub trait ContractReader: Send + Sync {
    /// Liveness / feature-flag check performed before any read.
    async fn is_available(&self) -> Result<bool, ContractError>;

    /// Address of the deployed contract.
    async fn address(&self) -> Result<String, ContractError>;

    /// Fetch the blob stored under `key`. Absent keys yield an empty vector.
    async fn get_data(&self, key: &str) -> Result<Vec<u8>, ContractError>;
}

/// Signer-bound handle: the read surface plus state-changing writes.
#[async_trait]
pub trait ContractWriter: ContractReader {
    /// Submit a write of `value` under `key`.
    async fn set_data(&self, key: &str, value: &[u8]) -> Result<PendingTransaction, ContractError>;
}

/// Deterministic transaction hash over the written key, value and sequence.
pub(crate) fn transaction_hash(key: &str, value: &[u8], sequence: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher.update([0u8]);
    hasher.update(value);
    hasher.update(sequence.to_be_bytes());
    format!("0x{}", hex::encode(hasher.finalize()))
}

/// Derive a 20-byte contract address from a seed string.
pub(crate) fn derive_address(seed: &str) -> String {
    let digest = Sha256::digest(seed.as_bytes());
    format!("0x{}", hex::encode(&digest[..20]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_confirmed_transaction_resolves_receipt() {
        let receipt = TxReceipt {
            hash: "0xabc".to_string(),
            key: "agent_keys".to_string(),
            block: 7,
        };
        let pending = PendingTransaction::confirmed(receipt.clone());
        assert_eq!(pending.hash(), "0xabc");
        assert_eq!(pending.wait().await.unwrap(), receipt);
    }

    #[test]
    fn test_pending_transaction_propagates_failure() {
        let pending = PendingTransaction::new("0xdead", async {
            Err(ContractError::Backend("reverted".to_string()))
        });
        let result = tokio_test::block_on(pending.wait());
        assert!(matches!(result, Err(ContractError::Backend(_))));
    }

    #[test]
    fn test_transaction_hash_depends_on_sequence() {
        let a = transaction_hash("k", b"v", 1);
        let b = transaction_hash("k", b"v", 2);
        assert_ne!(a, b);
        assert!(a.starts_with("0x"));
        assert_eq!(a.len(), 66);
    }

    #[test]
    fn test_derive_address_shape() {
        let addr = derive_address("seed");
        assert_eq!(addr.len(), 42);
        assert_eq!(addr, derive_address("seed"));
    }
}
