//! Agent registry stored in the key/value contract.
//!
//! Storage schema:
//!
//! - `agent_keys` — JSON array of agent id strings; the authoritative index
//! - `agent_<id>` — JSON object `{strategy, vote, timestamp, owner, status, performance}`
//!   with `strategy` / `vote` in the tagged encoding of [`crate::fhe`]
//!
//! Records are created by [`create_agent`], modified in place by
//! [`update_agent_vote`] and [`toggle_agent_status`], and never deleted.

pub mod loader;
pub mod mutations;
pub mod reconcile;
pub mod types;

pub use loader::{
    fetch_agent, load_agents, read_index, FundAggregate, LoadOutcome, RegistrySnapshot,
    SkipReason, SkippedAgent,
};
pub use mutations::{create_agent, toggle_agent_status, update_agent_vote, validate_vote};
pub use reconcile::{find_dangling_keys, prune_dangling_keys};
pub use types::{
    agent_key, generate_agent_id, is_valid_agent_id, AgentRecord, AgentStatus, NewAgent,
    StoredAgent, AGENT_KEYS_KEY,
};
