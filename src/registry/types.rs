//! Registry data model.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::DaoError;
use crate::fhe::{self, CodecError};

/// Contract key holding the JSON array of agent ids.
pub const AGENT_KEYS_KEY: &str = "agent_keys";

/// Contract key of an agent blob.
pub fn agent_key(id: &str) -> String {
    format!("agent_{}", id)
}

static AGENT_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]{0,127}$").unwrap());

/// Whether `id` is usable as an agent id: alphanumeric start, then
/// alphanumerics, `_`, `.` or `-`, at most 128 characters.
pub fn is_valid_agent_id(id: &str) -> bool {
    AGENT_ID_PATTERN.is_match(id)
}

/// Generate a client-side agent id: `agent-<unix millis>-<4 base36 chars>`.
///
/// Uniqueness is probabilistic only; no check against existing ids is made.
pub fn generate_agent_id(now: DateTime<Utc>) -> String {
    const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..4)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("agent-{}-{}", now.timestamp_millis(), suffix)
}

/// Agent lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Active,
    Inactive,
}

impl AgentStatus {
    /// The opposite status.
    pub fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Inactive,
            Self::Inactive => Self::Active,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_performance() -> String {
    "0".to_string()
}

fn status_or_default<'de, D>(deserializer: D) -> Result<AgentStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<AgentStatus>::deserialize(deserializer)?.unwrap_or_default())
}

fn performance_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(default_performance()),
        Value::String(s) if s.is_empty() => Ok(default_performance()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "performance must be a string or number, got {}",
            other
        ))),
    }
}

/// On-contract JSON schema of an agent blob.
///
/// `status` and `performance` default when missing so older records still
/// load. Fields this schema does not know are kept in `extra` and written
/// back unchanged on every read-modify-write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAgent {
    pub strategy: String,
    pub vote: String,
    pub timestamp: i64,
    pub owner: String,
    #[serde(default, deserialize_with = "status_or_default")]
    pub status: AgentStatus,
    #[serde(default = "default_performance", deserialize_with = "performance_or_default")]
    pub performance: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl StoredAgent {
    /// Parse a blob read from the contract.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Serialize for writing back to the contract.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Attach the id this blob was stored under.
    pub fn into_record(self, id: impl Into<String>) -> AgentRecord {
        AgentRecord {
            id: id.into(),
            encrypted_strategy: self.strategy,
            encrypted_vote: self.vote,
            timestamp: self.timestamp,
            owner: self.owner,
            status: self.status,
            performance: self.performance,
        }
    }

    /// Whether `address` owns this agent (case-insensitive).
    pub fn is_owned_by(&self, address: &str) -> bool {
        self.owner.eq_ignore_ascii_case(address)
    }
}

/// One registered agent as presented to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
    pub id: String,
    pub encrypted_strategy: String,
    pub encrypted_vote: String,
    /// Creation time, seconds since the epoch.
    pub timestamp: i64,
    pub owner: String,
    pub status: AgentStatus,
    /// Decimal percentage string. Written as `"0"` at creation and never
    /// updated by any mutation.
    pub performance: String,
}

impl AgentRecord {
    pub fn is_active(&self) -> bool {
        self.status == AgentStatus::Active
    }

    /// Decoded voting power.
    pub fn vote(&self) -> Result<f64, CodecError> {
        fhe::decode(&self.encrypted_vote)
    }

    /// Decoded strategy weight.
    pub fn strategy(&self) -> Result<f64, CodecError> {
        fhe::decode(&self.encrypted_strategy)
    }

    /// Whether `address` owns this agent (case-insensitive).
    pub fn is_owned_by(&self, address: &str) -> bool {
        self.owner.eq_ignore_ascii_case(address)
    }
}

/// Input of the create-agent command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAgent {
    pub strategy: f64,
    pub initial_vote: f64,
}

impl NewAgent {
    /// Reject empty fields before any contract call.
    ///
    /// Zero counts as empty, so a strategy weight of 0 is refused even though
    /// it is a legal weight.
    pub fn validate(&self) -> Result<(), DaoError> {
        let filled = |v: f64| v.is_finite() && v != 0.0;
        if !filled(self.strategy) || !filled(self.initial_vote) {
            return Err(DaoError::InvalidInput("Please fill all fields".to_string()));
        }
        Ok(())
    }
}
