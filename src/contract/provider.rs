//! Acquisition of contract handles.

use std::sync::Arc;

use async_trait::async_trait;

use super::store::{ContractReader, ContractWriter};

/// Source of read-only and signer-bound contract handles.
///
/// Handles are obtained asynchronously because they may depend on wallet or
/// provider initialization. `None` means the handle is not available right
/// now; callers treat that as a recoverable precondition failure.
#[async_trait]
pub trait ContractProvider: Send + Sync {
    /// Handle that can query the contract.
    async fn read_only(&self) -> Option<Arc<dyn ContractReader>>;

    /// Handle that can also submit writes.
    async fn with_signer(&self) -> Option<Arc<dyn ContractWriter>>;
}

/// Provider over a local backend ([`MemoryContract`](super::MemoryContract)
/// or [`SqliteContract`](super::SqliteContract)).
#[derive(Debug)]
pub struct LocalProvider<C> {
    contract: Arc<C>,
    signer: bool,
}

impl<C> LocalProvider<C>
where
    C: ContractWriter + 'static,
{
    /// Provider that hands out both read-only and signer-bound handles.
    pub fn new(contract: Arc<C>) -> Self {
        Self {
            contract,
            signer: true,
        }
    }

    /// Provider with no signer: `with_signer` always yields `None`.
    pub fn without_signer(contract: Arc<C>) -> Self {
        Self {
            contract,
            signer: false,
        }
    }

    /// The backing contract.
    pub fn contract(&self) -> &Arc<C> {
        &self.contract
    }
}

#[async_trait]
impl<C> ContractProvider for LocalProvider<C>
where
    C: ContractWriter + 'static,
{
    async fn read_only(&self) -> Option<Arc<dyn ContractReader>> {
        Some(self.contract.clone() as Arc<dyn ContractReader>)
    }

    async fn with_signer(&self) -> Option<Arc<dyn ContractWriter>> {
        if !self.signer {
            return None;
        }
        Some(self.contract.clone() as Arc<dyn ContractWriter>)
    }
}
