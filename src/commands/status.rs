//! Implementation of the `lockstep status` command.
//!
//! Displays every lock (flagging stale ones) and every registered agent
//! (flagging dead ones).

use crate::context::CoordContext;
use crate::error::Result;
use crate::locks::format_age;
use chrono::Utc;
use std::path::Path;

pub fn cmd_status(dir: Option<&Path>) -> Result<()> {
    let ctx = CoordContext::resolve(dir)?;
    let mgr = ctx.lock_manager()?;
    let registry = ctx.agent_registry();
    let now = Utc::now();

    let locks = mgr.list()?;
    let agents = registry.list()?;

    println!("Coordination root: {}", ctx.coord_dir.display());
    println!();

    println!("Locks");
    println!("=====");
    if locks.is_empty() {
        println!("  (none)");
    }
    for lock in &locks {
        let stale = if mgr.is_stale(lock) { " [STALE]" } else { "" };
        println!("  {}{}", lock.resource, stale);
        match &lock.owner_name {
            Some(name) => println!("    Agent: {} ({})", lock.owner_id, name),
            None => println!("    Agent: {}", lock.owner_id),
        }
        if let Some(op) = &lock.operation {
            println!("    Task:  {}", op);
        }
        println!(
            "    Age:   {} (TTL: {}s)",
            format_age(lock.age_at(now)),
            lock.ttl_seconds
        );
    }
    println!();

    println!("Agents");
    println!("======");
    if agents.is_empty() {
        println!("  (none)");
    }
    for agent in &agents {
        let status = if registry.is_alive(agent) {
            "alive"
        } else {
            "dead"
        };
        match &agent.name {
            Some(name) => println!("  {} ({}) [{}]", agent.id, name, status),
            None => println!("  {} [{}]", agent.id, status),
        }
        println!(
            "    Last seen: {} ago",
            format_age(now.signed_duration_since(agent.last_heartbeat))
        );
        if let Some(task) = &agent.current_task {
            println!("    Task:      {}", task);
        }
        if !agent.locks_held.is_empty() {
            println!("    Locks:     {}", agent.locks_held.join(", "));
        }
    }

    let stale_count = locks.iter().filter(|l| mgr.is_stale(l)).count();
    if stale_count > 0 {
        println!();
        println!(
            "Note: {} lock(s) are stale. Run `lockstep gc` to remove them.",
            stale_count
        );
    }

    Ok(())
}
