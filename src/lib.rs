//! # agent-dao
//!
//! Registry dashboard for DAO voting agents.
//!
//! Agents are stored as JSON blobs in a string-keyed contract, indexed by a
//! single `agent_keys` array. Each agent carries a strategy and a vote in a
//! tagged encoding (`FHE-` + base64 of the decimal text). That encoding is
//! reversible obfuscation, not encryption: anyone who can read the contract
//! can recover every value. Revealing a vote in the dashboard is gated on a
//! wallet signature over a session message, which proves consent to the
//! reveal and nothing more.
//!
//! The crate is split into:
//!
//! - [`fhe`] — the tagged value codec and homomorphic-style operations
//! - [`contract`] — the key/value contract seam with in-memory and SQLite backends
//! - [`wallet`] — wallet identity, message signing, decryption sessions
//! - [`registry`] — agent records, loading, mutations and index reconciliation
//! - [`controller`] — the state-owning dashboard controller
//! - [`views`] — pure view-model derivations
//! - [`server`] — the axum HTTP surface

pub mod config;
pub mod contract;
pub mod controller;
pub mod errors;
pub mod fhe;
pub mod registry;
pub mod server;
pub mod views;
pub mod wallet;

pub use config::DaoConfig;
pub use controller::{DaoController, DashboardState};
pub use errors::DaoError;
pub use registry::{AgentRecord, AgentStatus, NewAgent};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
