//! SQLite-backed contract store.
//!
//! Persists the key/value surface in a local database file so the registry
//! survives restarts. Each write is recorded in a `transactions` table whose
//! row id serves as the block number.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use super::store::{
    derive_address, transaction_hash, ContractError, ContractReader, ContractWriter,
    PendingTransaction, TxReceipt,
};

/// Durable key/value contract on a SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteContract {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    address: String,
}

fn backend(e: rusqlite::Error) -> ContractError {
    ContractError::Backend(e.to_string())
}

impl SqliteContract {
    /// Open (or create) the database at `db_path`.
    ///
    /// The contract address is derived from the canonical database path so the
    /// same file always reports the same address.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let address = derive_address(&format!("agent-dao/sqlite/{}", db_path.display()));
        let contract = Self { db_path, address };
        contract.initialize_db()?;
        Ok(contract)
    }

    fn initialize_db(&self) -> Result<(), ContractError> {
        let conn = Connection::open(&self.db_path).map_err(|e| {
            log::error!("sqlite contract: cannot open {}: {}", self.db_path.display(), e);
            backend(e)
        })?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS contract_data (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS transactions (
                block INTEGER PRIMARY KEY AUTOINCREMENT,
                hash TEXT NOT NULL,
                key TEXT NOT NULL,
                submitted_at TEXT NOT NULL
            );",
        )
        .map_err(backend)?;
        Ok(())
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, ContractError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, ContractError> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = Connection::open(&db_path).map_err(backend)?;
            op(&mut conn)
        })
        .await
        .map_err(|e| ContractError::Backend(format!("sqlite task failed: {}", e)))?
    }
}

#[async_trait]
impl ContractReader for SqliteContract {
    async fn is_available(&self) -> Result<bool, ContractError> {
        self.blocking(|conn| {
            let ok = conn
                .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map(|v| v == 1)
                .unwrap_or(false);
            Ok(ok)
        })
        .await
    }

    async fn address(&self) -> Result<String, ContractError> {
        Ok(self.address.clone())
    }

    async fn get_data(&self, key: &str) -> Result<Vec<u8>, ContractError> {
        let key = key.to_string();
        self.blocking(move |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM contract_data WHERE key = ?1",
                    params![key],
                    |row| row.get::<_, Vec<u8>>(0),
                )
                .optional()
                .map_err(backend)?;
            Ok(value.unwrap_or_default())
        })
        .await
    }
}

#[async_trait]
impl ContractWriter for SqliteContract {
    async fn set_data(&self, key: &str, value: &[u8]) -> Result<PendingTransaction, ContractError> {
        let key = key.to_string();
        let value = value.to_vec();
        let receipt = self
            .blocking(move |conn| {
                let now = chrono::Utc::now().to_rfc3339();
                let tx = conn.transaction().map_err(backend)?;
                tx.execute(
                    "INSERT INTO transactions (hash, key, submitted_at) VALUES ('', ?1, ?2)",
                    params![key, now],
                )
                .map_err(backend)?;
                let block = tx.last_insert_rowid() as u64;
                let hash = transaction_hash(&key, &value, block);
                tx.execute(
                    "UPDATE transactions SET hash = ?1 WHERE block = ?2",
                    params![hash, block as i64],
                )
                .map_err(backend)?;
                tx.execute(
                    "INSERT INTO contract_data (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                    params![key, value, now],
                )
                .map_err(backend)?;
                tx.commit().map_err(backend)?;
                Ok(TxReceipt { hash, key, block })
            })
            .await?;

        log::debug!("sqlite contract: {} confirmed in block {}", receipt.key, receipt.block);
        Ok(PendingTransaction::confirmed(receipt))
    }
}
