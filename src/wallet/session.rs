//! Signature-gated decryption.
//!
//! Before a stored vote is revealed the wallet must sign a session message
//! naming a locally generated public key, the contract address, the chain id
//! and a validity window. The signature is not verified and plays no part in
//! decoding; it only records explicit user consent.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::Wallet;
use crate::contract::ContractProvider;
use crate::errors::DaoError;
use crate::fhe;

/// Default validity window of a decryption session.
pub const DEFAULT_SESSION_DAYS: u32 = 30;

/// Number of hex digits in a generated session public key.
const PUBLIC_KEY_HEX_DIGITS: usize = 2000;

/// Generate a pseudo public key: `0x` followed by 2000 random hex digits.
pub fn generate_public_key() -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut rng = rand::thread_rng();
    let mut key = String::with_capacity(2 + PUBLIC_KEY_HEX_DIGITS);
    key.push_str("0x");
    for _ in 0..PUBLIC_KEY_HEX_DIGITS {
        key.push(HEX[rng.gen_range(0..16)] as char);
    }
    key
}

/// Parameters embedded in the message the wallet signs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionSession {
    pub public_key: String,
    pub contract_address: String,
    pub chain_id: u64,
    /// Session start, seconds since the epoch.
    pub start_timestamp: i64,
    pub duration_days: u32,
}

impl DecryptionSession {
    /// Build a session from the current provider and wallet.
    ///
    /// Missing pieces degrade rather than fail: an unavailable contract leaves
    /// the address empty and a disconnected wallet leaves the chain id at 0.
    pub async fn initialize(
        provider: &dyn ContractProvider,
        wallet: Option<&dyn Wallet>,
        now: DateTime<Utc>,
        duration_days: u32,
    ) -> Self {
        let contract_address = match provider.read_only().await {
            Some(contract) => contract.address().await.unwrap_or_else(|e| {
                log::warn!("decryption session: cannot read contract address: {}", e);
                String::new()
            }),
            None => String::new(),
        };

        let chain_id = match wallet {
            Some(wallet) => wallet.chain_id().await.unwrap_or_else(|e| {
                log::warn!("decryption session: cannot read chain id: {}", e);
                0
            }),
            None => 0,
        };

        Self {
            public_key: generate_public_key(),
            contract_address,
            chain_id,
            start_timestamp: now.timestamp(),
            duration_days,
        }
    }

    /// The exact text presented to the wallet for signing.
    pub fn message(&self) -> String {
        format!(
            "publickey:{}\ncontractAddresses:{}\ncontractsChainId:{}\nstartTimestamp:{}\ndurationDays:{}",
            self.public_key,
            self.contract_address,
            self.chain_id,
            self.start_timestamp,
            self.duration_days
        )
    }
}

/// Reveal an encoded value after the wallet signs the session message.
///
/// `delay` simulates decryption latency after signing.
pub async fn decrypt_with_signature(
    wallet: Option<&dyn Wallet>,
    session: &DecryptionSession,
    encrypted: &str,
    delay: Duration,
) -> Result<f64, DaoError> {
    let wallet = wallet.ok_or(DaoError::WalletNotConnected)?;
    let _signature = wallet.sign_message(&session.message()).await?;
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    Ok(fhe::decode(encrypted)?)
}
