//! Implementation of `lockstep lock` and `lockstep unlock`.

use super::refresh_locks_held;
use crate::cli::{LockArgs, UnlockArgs};
use crate::context::{CoordContext, require_agent_id, resolve_agent_id};
use crate::error::{CoordError, Result};
use std::path::Path;

pub fn cmd_lock(dir: Option<&Path>, args: LockArgs) -> Result<()> {
    let ctx = CoordContext::resolve(dir)?;
    ctx.ensure_dirs()?;
    let mgr = ctx.lock_manager()?;
    let agent_id = resolve_agent_id(args.agent.agent.as_deref());

    let lock = mgr.acquire(
        &args.resource,
        &agent_id,
        args.agent.name.as_deref(),
        args.op.as_deref(),
        args.ttl,
    )?;
    refresh_locks_held(&ctx, &mgr, &agent_id);

    println!("Locked: {}", lock.resource);
    println!("  Agent: {}", agent_id);
    if let Some(op) = &lock.operation {
        println!("  Task:  {}", op);
    }
    println!("  TTL:   {}s", lock.ttl_seconds);

    Ok(())
}

pub fn cmd_unlock(dir: Option<&Path>, args: UnlockArgs) -> Result<()> {
    let ctx = CoordContext::resolve(dir)?;
    let mgr = ctx.lock_manager()?;
    let agent_id = require_agent_id(args.agent.as_deref())?;

    if args.all {
        let report = mgr.release_all(&agent_id)?;
        refresh_locks_held(&ctx, &mgr, &agent_id);

        if report.completed.is_empty() && report.is_clean() {
            println!("No locks held by {}.", agent_id);
        }
        for resource in &report.completed {
            println!("Unlocked: {}", resource);
        }
        report.into_result("release")?;
        return Ok(());
    }

    let Some(resource) = args.resource else {
        return Err(CoordError::UserError(
            "a resource or --all is required".to_string(),
        ));
    };
    mgr.release(&resource, &agent_id)?;
    refresh_locks_held(&ctx, &mgr, &agent_id);

    println!("Unlocked: {}", resource);
    Ok(())
}
