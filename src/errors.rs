//! Error taxonomy for registry operations.
//!
//! Every failure is terminal for the invocation that raised it; nothing is
//! retried. Callers distinguish user rejections from other failures with
//! [`DaoError::is_user_rejection`] and render banner text with
//! [`DaoError::banner_message`].

use thiserror::Error;

use crate::contract::ContractError;
use crate::fhe::CodecError;
use crate::wallet::WalletError;

/// Errors from registry commands.
#[derive(Debug, Error)]
pub enum DaoError {
    /// No wallet identity is connected.
    #[error("Please connect wallet first")]
    WalletNotConnected,

    /// A contract handle could not be acquired, or the contract reports
    /// itself unavailable.
    #[error("{0}")]
    ContractUnavailable(String),

    /// The agent blob does not exist.
    #[error("Agent not found")]
    AgentNotFound { agent_id: String },

    /// The caller does not own the agent it tried to modify.
    #[error("Only the owner {owner} can modify agent {agent_id}")]
    NotOwner { agent_id: String, owner: String },

    /// Client-side validation rejected the input before any contract call.
    #[error("{0}")]
    InvalidInput(String),

    /// Stored data failed to (de)serialize.
    #[error("malformed agent data: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl DaoError {
    /// Whether the failure came from the user declining to sign.
    ///
    /// Typed rejections are recognized directly; errors from external
    /// backends are matched on their text.
    pub fn is_user_rejection(&self) -> bool {
        match self {
            Self::Contract(ContractError::Rejected(_)) | Self::Wallet(WalletError::Rejected) => {
                true
            }
            other => other.to_string().to_lowercase().contains("user rejected"),
        }
    }

    /// User-facing banner text for a failed `operation` (e.g. `"Creation"`).
    pub fn banner_message(&self, operation: &str) -> String {
        if self.is_user_rejection() {
            "Transaction rejected by user".to_string()
        } else {
            format!("{} failed: {}", operation, self)
        }
    }
}
