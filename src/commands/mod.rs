//! Command implementations for lockstep.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Every handler resolves its own [`CoordContext`] from the
//! global `--dir` flag, so handlers can be driven directly in tests.

mod agent;
mod check;
mod gc;
mod init;
mod lock;
mod status;
mod wait;

#[cfg(test)]
mod tests;

use crate::cli::Command;
use crate::context::CoordContext;
use crate::error::Result;
use crate::locks::LockManager;
use std::path::Path;

/// Dispatch a command to its implementation.
pub fn dispatch(dir: Option<&Path>, command: Command) -> Result<()> {
    match command {
        Command::Init(args) => init::cmd_init(dir, args),
        Command::Lock(args) => lock::cmd_lock(dir, args),
        Command::Unlock(args) => lock::cmd_unlock(dir, args),
        Command::Check(args) => check::cmd_check(dir, args),
        Command::Status => status::cmd_status(dir),
        Command::Wait(args) => wait::cmd_wait(dir, args),
        Command::Gc => gc::cmd_gc(dir),
        Command::Register(args) => agent::cmd_register(dir, args),
        Command::Heartbeat(args) => agent::cmd_heartbeat(dir, args),
        Command::Deregister(args) => agent::cmd_deregister(dir, args),
        Command::Task(args) => agent::cmd_task(dir, args),
    }
}

/// Mirror the lock store into a registered agent's advisory `locks_held`.
///
/// Agents that never registered are left alone; failures only warn since
/// the list is informational.
fn refresh_locks_held(ctx: &CoordContext, mgr: &LockManager, agent_id: &str) {
    let registry = ctx.agent_registry();
    if !matches!(registry.read(agent_id), Ok(Some(_))) {
        return;
    }

    let held = match mgr.list() {
        Ok(locks) => locks
            .into_iter()
            .filter(|lock| lock.is_owned_by(agent_id))
            .map(|lock| lock.resource)
            .collect(),
        Err(e) => {
            tracing::warn!(agent = agent_id, error = %e, "could not list locks for agent record");
            return;
        }
    };

    if let Err(e) = registry.update_locks(agent_id, held) {
        tracing::warn!(agent = agent_id, error = %e, "could not update agent record");
    }
}
