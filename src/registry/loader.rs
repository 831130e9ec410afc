//! Registry loader.
//!
//! Reconstructs every agent from the `agent_keys` index and the per-agent
//! blobs, then derives the fund aggregate. Failures are isolated per agent:
//! a missing or malformed blob drops that one agent and the load continues.

use serde::Serialize;

use super::types::{agent_key, AgentRecord, StoredAgent, AGENT_KEYS_KEY};
use crate::contract::{ContractError, ContractProvider, ContractReader};
use crate::errors::DaoError;

/// Sum of decoded votes over active agents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundAggregate {
    pub total_votes: f64,
    pub active_agents: usize,
}

impl FundAggregate {
    /// Aggregate over `agents`, counting only `active` ones.
    ///
    /// An active agent whose vote cannot be decoded is still counted but
    /// adds nothing to the total.
    pub fn from_agents(agents: &[AgentRecord]) -> Self {
        let mut fund = Self::default();
        for agent in agents.iter().filter(|a| a.is_active()) {
            match agent.vote() {
                Ok(vote) => fund.total_votes += vote,
                Err(e) => log::warn!("agent {}: vote not decodable: {}", agent.id, e),
            }
            fund.active_agents += 1;
        }
        fund
    }
}

/// Why an indexed agent was left out of a load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// The index names the agent but no blob exists.
    Missing,
    /// The blob does not match the stored-agent schema.
    Malformed(String),
    /// The blob could not be fetched.
    FetchFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedAgent {
    pub id: String,
    pub reason: SkipReason,
}

/// Result of a successful load.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistrySnapshot {
    /// Agents sorted newest first.
    pub agents: Vec<AgentRecord>,
    pub fund: FundAggregate,
    pub skipped: Vec<SkippedAgent>,
}

/// Outcome of [`load_agents`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// No read handle, or the contract reports itself unavailable or fails
    /// the availability check. Nothing was read.
    Unavailable,
    Loaded(RegistrySnapshot),
}

/// Parse index bytes. Empty, blank, or malformed text yields an empty index.
pub(crate) fn parse_index(bytes: &[u8]) -> Vec<String> {
    if bytes.is_empty() {
        return Vec::new();
    }
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("{} is not UTF-8: {}", AGENT_KEYS_KEY, e);
            return Vec::new();
        }
    };
    if text.trim().is_empty() {
        return Vec::new();
    }
    serde_json::from_str(text).unwrap_or_else(|e| {
        log::warn!("error parsing {}: {}", AGENT_KEYS_KEY, e);
        Vec::new()
    })
}

/// Read the agent id index.
pub async fn read_index<R>(contract: &R) -> Result<Vec<String>, ContractError>
where
    R: ContractReader + ?Sized,
{
    let bytes = contract.get_data(AGENT_KEYS_KEY).await?;
    Ok(parse_index(&bytes))
}

/// Read and parse one agent blob. `Ok(None)` when no blob exists.
pub async fn fetch_agent<R>(contract: &R, id: &str) -> Result<Option<StoredAgent>, DaoError>
where
    R: ContractReader + ?Sized,
{
    let bytes = contract.get_data(&agent_key(id)).await?;
    if bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(StoredAgent::from_slice(&bytes)?))
}

/// Load every indexed agent.
///
/// Blobs are fetched one at a time in index order. The result is sorted by
/// timestamp descending; ties keep index order.
pub async fn load_agents(provider: &dyn ContractProvider) -> Result<LoadOutcome, DaoError> {
    let Some(contract) = provider.read_only().await else {
        log::warn!("load skipped: no read-only contract handle");
        return Ok(LoadOutcome::Unavailable);
    };
    match contract.is_available().await {
        Ok(true) => {}
        Ok(false) => {
            log::warn!("load skipped: contract reports unavailable");
            return Ok(LoadOutcome::Unavailable);
        }
        Err(e) => {
            log::warn!("load skipped: availability check failed: {}", e);
            return Ok(LoadOutcome::Unavailable);
        }
    }

    let keys = read_index(contract.as_ref()).await?;
    let mut agents = Vec::with_capacity(keys.len());
    let mut skipped = Vec::new();

    for id in keys {
        match fetch_agent(contract.as_ref(), &id).await {
            Ok(Some(stored)) => agents.push(stored.into_record(id)),
            Ok(None) => {
                log::debug!("agent {} indexed but has no blob", id);
                skipped.push(SkippedAgent {
                    id,
                    reason: SkipReason::Missing,
                });
            }
            Err(DaoError::Malformed(e)) => {
                log::warn!("error parsing agent data for {}: {}", id, e);
                skipped.push(SkippedAgent {
                    id,
                    reason: SkipReason::Malformed(e.to_string()),
                });
            }
            Err(e) => {
                log::warn!("error loading agent {}: {}", id, e);
                skipped.push(SkippedAgent {
                    id,
                    reason: SkipReason::FetchFailed(e.to_string()),
                });
            }
        }
    }

    agents.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    let fund = FundAggregate::from_agents(&agents);
    log::debug!(
        "loaded {} agents ({} skipped), {} active",
        agents.len(),
        skipped.len(),
        fund.active_agents
    );

    Ok(LoadOutcome::Loaded(RegistrySnapshot {
        agents,
        fund,
        skipped,
    }))
}
