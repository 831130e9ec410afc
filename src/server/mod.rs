//! HTTP server for the agent registry.
//!
//! Exposes the [`DaoController`](crate::controller::DaoController) commands
//! as JSON endpoints.
//!
//! # Endpoints
//!
//! - `GET  /health`               — Liveness probe
//! - `GET  /agents`               — Current dashboard state
//! - `POST /agents`               — Register an agent
//! - `POST /agents/refresh`       — Reload the registry
//! - `POST /agents/:id/vote`      — Replace an agent's vote
//! - `POST /agents/:id/toggle`    — Flip an agent's status
//! - `POST /agents/:id/decrypt`   — Reveal an agent's vote after signing
//! - `POST /registry/prune`       — Drop dangling index entries (`?dry_run=true` lists them)
//! - `GET  /views/votes`          — Vote distribution
//! - `GET  /views/performance`    — Performance chart series

pub mod routes;

pub use routes::{app_router, AppState};
