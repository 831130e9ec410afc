//! State-owning controller for the agent dashboard.
//!
//! All registry commands go through [`DaoController`], which owns the
//! dashboard state and publishes immutable [`DashboardState`] snapshots over
//! a `tokio::sync::watch` channel. Commands that touch the registry are
//! serialized by a single in-flight guard, so two loads (or a load and a
//! mutation) can no longer interleave and overwrite each other's results.

pub mod dashboard;
pub mod state;

pub use dashboard::DaoController;
pub use state::{DashboardState, TransactionBanner, TransactionStatus};
