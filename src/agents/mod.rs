//! Agent registry for lockstep.
//!
//! Every participant (one per running session) keeps a small JSON record in
//! `<coord-root>/agents/`:
//! - `agent_id`, optional `name`
//! - `started_at` / `last_heartbeat` (RFC 3339)
//! - optional `current_task` and advisory `locks_held`
//! - `pid` of the process that last wrote it
//!
//! The heartbeat timestamp is the liveness evidence the lock staleness policy
//! relies on. Records are written with atomic replace so readers never see a
//! half-written file.

pub mod heartbeat;
mod record;
mod registry;


pub use heartbeat::{run_heartbeat, wait_for_shutdown_signal};
pub use record::Agent;
pub use registry::AgentRegistry;

/// Generate an agent id for sessions that did not provide one.
///
/// Format: `<host>-<pid>-<suffix>` where the suffix comes from the clock.
pub fn generate_agent_id() -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "agent".to_string());

    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() % 100_000)
        .unwrap_or(0);

    format!("{}-{}-{}", host, std::process::id(), suffix)
}
