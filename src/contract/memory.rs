//! In-process contract backend.
//!
//! Provides thread-safe in-memory key/value storage with the same semantics
//! as the on-chain contract: absent keys read as empty blobs, and every write
//! is confirmed immediately with a fresh transaction hash.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use super::store::{
    derive_address, transaction_hash, ContractError, ContractReader, ContractWriter,
    PendingTransaction, TxReceipt,
};

/// In-memory key/value contract.
#[derive(Debug)]
pub struct MemoryContract {
    address: String,
    data: RwLock<HashMap<String, Vec<u8>>>,
    available: AtomicBool,
    block: AtomicU64,
    /// Error returned by the next `set_data` call, then cleared.
    write_failure: Mutex<Option<ContractError>>,
}

impl Default for MemoryContract {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryContract {
    /// Create an empty, available contract.
    pub fn new() -> Self {
        Self::with_address(derive_address("agent-dao/memory"))
    }

    /// Create an empty contract reporting the given address.
    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            data: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            block: AtomicU64::new(0),
            write_failure: Mutex::new(None),
        }
    }

    /// Flip the availability flag reported by `is_available`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make the next `set_data` call fail with `error`.
    pub fn fail_next_write(&self, error: ContractError) {
        *self.write_failure.lock() = Some(error);
    }

    /// Store raw bytes without going through a transaction.
    pub fn seed(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.data.write().insert(key.into(), value.into());
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of confirmed writes so far.
    pub fn block_height(&self) -> u64 {
        self.block.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContractReader for MemoryContract {
    async fn is_available(&self) -> Result<bool, ContractError> {
        Ok(self.available.load(Ordering::SeqCst))
    }

    async fn address(&self) -> Result<String, ContractError> {
        Ok(self.address.clone())
    }

    async fn get_data(&self, key: &str) -> Result<Vec<u8>, ContractError> {
        Ok(self.data.read().get(key).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl ContractWriter for MemoryContract {
    async fn set_data(&self, key: &str, value: &[u8]) -> Result<PendingTransaction, ContractError> {
        if let Some(error) = self.write_failure.lock().take() {
            return Err(error);
        }
        let block = self.block.fetch_add(1, Ordering::SeqCst) + 1;
        self.data.write().insert(key.to_string(), value.to_vec());
        log::debug!("memory contract: wrote {} bytes under {:?} in block {}", value.len(), key, block);

        Ok(PendingTransaction::confirmed(TxReceipt {
            hash: transaction_hash(key, value, block),
            key: key.to_string(),
            block,
        }))
    }
}
