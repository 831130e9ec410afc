//! Immutable dashboard snapshots.

use serde::{Deserialize, Serialize};

use crate::registry::{AgentRecord, SkippedAgent};

/// Phase of the transaction-status banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBanner {
    pub status: TransactionStatus,
    pub message: String,
}

impl TransactionBanner {
    pub fn new(status: TransactionStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Everything the dashboard renders, published as a whole on every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    /// True until the first load finishes.
    pub loading: bool,
    /// True while a load is in flight.
    pub refreshing: bool,
    pub creating: bool,
    pub decrypting: bool,
    /// Agents, newest first.
    pub agents: Vec<AgentRecord>,
    /// Sum of decoded votes over active agents.
    pub fund_value: f64,
    pub active_agents: usize,
    /// Indexed agents left out of the last load.
    pub skipped: Vec<SkippedAgent>,
    pub transaction: Option<TransactionBanner>,
    pub wallet_address: Option<String>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            loading: true,
            refreshing: false,
            creating: false,
            decrypting: false,
            agents: Vec::new(),
            fund_value: 0.0,
            active_agents: 0,
            skipped: Vec::new(),
            transaction: None,
            wallet_address: None,
        }
    }
}

impl DashboardState {
    pub fn agent(&self, id: &str) -> Option<&AgentRecord> {
        self.agents.iter().find(|a| a.id == id)
    }
}
