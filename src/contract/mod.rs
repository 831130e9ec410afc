//! Contract data-access facade.
//!
//! The agent registry lives in a generic key/value smart contract reachable
//! only through `getData(key)` / `setData(key, bytes)` plus availability and
//! address queries. This module defines that surface as traits and ships two
//! local backends.
//!
//! # Modules
//!
//! - [`store`] — `ContractReader`, `ContractWriter`, `PendingTransaction`, `ContractError`
//! - [`provider`] — `ContractProvider` handing out read-only and signer-bound handles
//! - [`memory`] — in-process backend
//! - [`sqlite`] — durable backend on a local SQLite file
//!
//! # Access modes
//!
//! A read-only handle can query the contract; a signer-bound handle can also
//! submit writes. Either handle may be transiently unavailable (`None` from the
//! provider), which callers treat as a recoverable precondition failure.

pub mod memory;
pub mod provider;
pub mod sqlite;
pub mod store;

pub use memory::MemoryContract;
pub use provider::{ContractProvider, LocalProvider};
pub use sqlite::SqliteContract;
pub use store::{ContractError, ContractReader, ContractWriter, PendingTransaction, TxReceipt};
