//! Implementation of the `lockstep gc` command.
//!
//! Removes stale locks first, then dead agents. Both sweeps always run; any
//! per-item failures are reported together afterwards.

use crate::context::CoordContext;
use crate::error::{BatchReport, Result};
use std::path::Path;

pub fn cmd_gc(dir: Option<&Path>) -> Result<()> {
    let ctx = CoordContext::resolve(dir)?;
    let mgr = ctx.lock_manager()?;

    let locks = mgr.clean_stale()?;
    let agents = ctx.agent_registry().clean_stale()?;

    if locks.completed.is_empty() && agents.completed.is_empty() {
        println!("Nothing to clean.");
    }
    print_cleaned("stale lock(s)", &locks);
    print_cleaned("dead agent(s)", &agents);

    let mut combined = locks;
    combined.completed.extend(agents.completed);
    combined.failed.extend(agents.failed);
    combined.into_result("clean")?;
    Ok(())
}

fn print_cleaned(what: &str, report: &BatchReport) {
    if report.completed.is_empty() {
        return;
    }
    println!("Cleaned {} {}:", report.completed.len(), what);
    for key in &report.completed {
        println!("  - {}", key);
    }
}
