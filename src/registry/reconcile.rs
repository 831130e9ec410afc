//! Index reconciliation.
//!
//! Creation writes the agent blob and the index in two transactions, and
//! nothing ever deletes from the index, so the index can name ids whose blob
//! is missing. These helpers find and prune such dangling entries. They only
//! run when invoked; loads never rewrite the index.
//!
//! Orphaned blobs (written but never indexed) cannot be recovered here: the
//! contract offers no key enumeration.

use super::loader::read_index;
use super::mutations::{signer, write_json};
use super::types::{agent_key, AGENT_KEYS_KEY};
use crate::contract::{ContractProvider, ContractReader};
use crate::errors::DaoError;

/// Index entries with no agent blob, in index order.
pub async fn find_dangling_keys<R>(contract: &R) -> Result<Vec<String>, DaoError>
where
    R: ContractReader + ?Sized,
{
    let mut dangling = Vec::new();
    for id in read_index(contract).await? {
        if contract.get_data(&agent_key(&id)).await?.is_empty() {
            dangling.push(id);
        }
    }
    Ok(dangling)
}

/// Rewrite the index without its dangling entries.
///
/// Returns the removed ids. No transaction is submitted when nothing
/// dangles.
pub async fn prune_dangling_keys(provider: &dyn ContractProvider) -> Result<Vec<String>, DaoError> {
    let contract = signer(provider).await?;
    let removed = find_dangling_keys(contract.as_ref()).await?;
    if removed.is_empty() {
        return Ok(removed);
    }

    let kept: Vec<String> = read_index(contract.as_ref())
        .await?
        .into_iter()
        .filter(|id| !removed.contains(id))
        .collect();

    write_json(contract.as_ref(), AGENT_KEYS_KEY, &serde_json::to_vec(&kept)?).await?;
    log::info!("pruned {} dangling index entries: {:?}", removed.len(), removed);
    Ok(removed)
}
