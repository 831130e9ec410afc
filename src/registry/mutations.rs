//! Agent mutation operations.
//!
//! Each operation is a read-modify-write against the contract with no
//! optimistic concurrency check. Ownership is enforced here, before any
//! write, so a client that skips the presentation layer cannot modify an
//! agent it does not own.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::loader::{fetch_agent, read_index};
use super::types::{
    agent_key, generate_agent_id, AgentRecord, AgentStatus, NewAgent, StoredAgent,
    AGENT_KEYS_KEY,
};
use crate::contract::{ContractProvider, ContractReader, ContractWriter, TxReceipt};
use crate::errors::DaoError;
use crate::fhe;

pub(crate) async fn signer(
    provider: &dyn ContractProvider,
) -> Result<Arc<dyn ContractWriter>, DaoError> {
    provider.with_signer().await.ok_or_else(|| {
        DaoError::ContractUnavailable("Failed to get contract with signer".to_string())
    })
}

async fn reader(provider: &dyn ContractProvider) -> Result<Arc<dyn ContractReader>, DaoError> {
    provider
        .read_only()
        .await
        .ok_or_else(|| DaoError::ContractUnavailable("Failed to get contract".to_string()))
}

pub(crate) async fn write_json<W>(contract: &W, key: &str, bytes: &[u8]) -> Result<TxReceipt, DaoError>
where
    W: ContractWriter + ?Sized,
{
    let pending = contract.set_data(key, bytes).await?;
    log::debug!("submitted write of {} ({})", key, pending.hash());
    Ok(pending.wait().await?)
}

async fn load_owned<R>(contract: &R, id: &str, caller: &str) -> Result<StoredAgent, DaoError>
where
    R: ContractReader + ?Sized,
{
    let stored = fetch_agent(contract, id)
        .await?
        .ok_or_else(|| DaoError::AgentNotFound {
            agent_id: id.to_string(),
        })?;
    if !stored.is_owned_by(caller) {
        return Err(DaoError::NotOwner {
            agent_id: id.to_string(),
            owner: stored.owner,
        });
    }
    Ok(stored)
}

/// Register a new agent owned by `owner`.
///
/// Writes the agent blob, then appends the id to the index. The two writes
/// are separate transactions: if the second never lands, the blob is
/// orphaned and invisible to the loader.
pub async fn create_agent(
    provider: &dyn ContractProvider,
    owner: &str,
    new: &NewAgent,
    now: DateTime<Utc>,
) -> Result<AgentRecord, DaoError> {
    new.validate()?;

    let stored = StoredAgent {
        strategy: fhe::encode(new.strategy),
        vote: fhe::encode(new.initial_vote),
        timestamp: now.timestamp(),
        owner: owner.to_string(),
        status: AgentStatus::Active,
        performance: "0".to_string(),
        extra: Default::default(),
    };

    let contract = signer(provider).await?;
    let id = generate_agent_id(now);
    write_json(contract.as_ref(), &agent_key(&id), &stored.to_bytes()?).await?;

    let mut keys = read_index(contract.as_ref()).await?;
    keys.push(id.clone());
    write_json(contract.as_ref(), AGENT_KEYS_KEY, &serde_json::to_vec(&keys)?).await?;

    log::info!("created agent {} for {}", id, owner);
    Ok(stored.into_record(id))
}

/// A replacement vote must be a finite number greater than zero.
pub fn validate_vote(new_vote: f64) -> Result<(), DaoError> {
    if !new_vote.is_finite() || new_vote <= 0.0 {
        return Err(DaoError::InvalidInput(format!(
            "Vote must be a positive number, got {}",
            new_vote
        )));
    }
    Ok(())
}

/// Replace the vote of agent `id` with a freshly encoded `new_vote`.
pub async fn update_agent_vote(
    provider: &dyn ContractProvider,
    caller: &str,
    id: &str,
    new_vote: f64,
) -> Result<AgentRecord, DaoError> {
    validate_vote(new_vote)?;

    let contract = reader(provider).await?;
    let mut stored = load_owned(contract.as_ref(), id, caller).await?;
    stored.vote = fhe::encode(new_vote);

    let writer = signer(provider).await?;
    write_json(writer.as_ref(), &agent_key(id), &stored.to_bytes()?).await?;

    log::info!("updated vote of agent {}", id);
    Ok(stored.into_record(id))
}

/// Flip agent `id` between `active` and `inactive`.
pub async fn toggle_agent_status(
    provider: &dyn ContractProvider,
    caller: &str,
    id: &str,
) -> Result<AgentRecord, DaoError> {
    let contract = signer(provider).await?;
    let mut stored = load_owned(contract.as_ref(), id, caller).await?;
    stored.status = stored.status.toggled();
    write_json(contract.as_ref(), &agent_key(id), &stored.to_bytes()?).await?;

    log::info!("agent {} is now {}", id, stored.status);
    Ok(stored.into_record(id))
}
