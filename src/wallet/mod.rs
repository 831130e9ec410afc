//! Wallet identity and the signature-gated decryption flow.
//!
//! - [`local`] — `LocalWallet`, an alloy local signer
//! - [`session`] — `DecryptionSession` and `decrypt_with_signature`

pub mod local;
pub mod session;

use async_trait::async_trait;
use thiserror::Error;

pub use local::LocalWallet;
pub use session::{decrypt_with_signature, generate_public_key, DecryptionSession};

/// Wallet errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// The user declined the signature request.
    #[error("user rejected signature request")]
    Rejected,
    #[error("invalid private key format")]
    InvalidPrivateKey,
    #[error("failed to create signer: {0}")]
    SignerCreation(String),
    #[error("signing failed: {0}")]
    SigningFailed(String),
}

/// A connected wallet.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Account address (`0x`-prefixed hex).
    fn address(&self) -> String;

    /// Chain id the wallet is connected to.
    async fn chain_id(&self) -> Result<u64, WalletError>;

    /// Sign `message` with EIP-191 personal_sign. Returns the `0x`-prefixed
    /// hex signature.
    async fn sign_message(&self, message: &str) -> Result<String, WalletError>;
}
