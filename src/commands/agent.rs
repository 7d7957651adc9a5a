//! Agent lifecycle commands: `register`, `heartbeat`, `deregister`, `task`.

use crate::agents::{run_heartbeat, wait_for_shutdown_signal};
use crate::cli::{DeregisterArgs, HeartbeatArgs, RegisterArgs, TaskArgs};
use crate::context::{CoordContext, require_agent_id, resolve_agent_id};
use crate::error::{CoordError, Result};
use std::path::Path;
use std::time::Duration;

pub fn cmd_register(dir: Option<&Path>, args: RegisterArgs) -> Result<()> {
    let ctx = CoordContext::resolve(dir)?;
    let agent_id = resolve_agent_id(args.agent.agent.as_deref());

    let agent = ctx
        .agent_registry()
        .register(&agent_id, args.agent.name.as_deref())?;

    println!("Registered agent: {}", agent.id);
    if let Some(name) = &agent.name {
        println!("  Name: {}", name);
    }
    Ok(())
}

pub fn cmd_heartbeat(dir: Option<&Path>, args: HeartbeatArgs) -> Result<()> {
    let ctx = CoordContext::resolve(dir)?;
    let registry = ctx.agent_registry();
    let agent_id = resolve_agent_id(args.agent.as_deref());

    registry.heartbeat(&agent_id)?;
    if !args.daemon {
        println!("Heartbeat sent for: {}", agent_id);
        return Ok(());
    }

    let period = match args.interval {
        Some(seconds) if seconds > 0 => Duration::from_secs(seconds),
        _ => ctx.config.settings.heartbeat_interval(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CoordError::UserError(format!("failed to start runtime: {}", e)))?;

    println!(
        "Heartbeat daemon running for {} (interval: {}s)",
        agent_id,
        period.as_secs()
    );
    let beats = runtime.block_on(run_heartbeat(
        &registry,
        &agent_id,
        period,
        wait_for_shutdown_signal(),
    ));
    println!("Heartbeat daemon stopped after {} beat(s).", beats);

    Ok(())
}

pub fn cmd_deregister(dir: Option<&Path>, args: DeregisterArgs) -> Result<()> {
    let ctx = CoordContext::resolve(dir)?;
    let agent_id = require_agent_id(args.agent.as_deref())?;

    // Locks are released first so a partial failure still deregisters.
    let released = if args.release_all {
        let report = ctx.lock_manager()?.release_all(&agent_id)?;
        for resource in &report.completed {
            println!("Unlocked: {}", resource);
        }
        report.into_result("release").map(|_| ())
    } else {
        Ok(())
    };

    if ctx.agent_registry().deregister(&agent_id)? {
        println!("Deregistered agent: {}", agent_id);
    } else {
        println!("Agent {} was not registered.", agent_id);
    }

    released
}

pub fn cmd_task(dir: Option<&Path>, args: TaskArgs) -> Result<()> {
    let ctx = CoordContext::resolve(dir)?;
    let agent_id = require_agent_id(args.agent.as_deref())?;

    let agent = ctx
        .agent_registry()
        .update_task(&agent_id, Some(&args.description))?;

    match &agent.current_task {
        Some(task) => println!("Task for {}: {}", agent.id, task),
        None => println!("Cleared task for {}", agent.id),
    }
    Ok(())
}
