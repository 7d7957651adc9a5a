//! Implementation of the `lockstep check` command.
//!
//! Meant to run from editor hooks before every file write, so it stays quiet
//! unless a lock was acquired or a file is blocked. Paths found to be
//! unprotected are remembered in the check cache.

use super::refresh_locks_held;
use crate::cache::CheckCache;
use crate::cli::CheckArgs;
use crate::context::{CoordContext, resolve_agent_id};
use crate::error::{CoordError, Result};
use crate::locks::{Lock, Protection};
use std::path::Path;

pub fn cmd_check(dir: Option<&Path>, args: CheckArgs) -> Result<()> {
    let ctx = CoordContext::resolve(dir)?;
    let mgr = ctx.lock_manager()?;
    let agent_id = resolve_agent_id(args.agent.agent.as_deref());

    let mut cache = CheckCache::load(ctx.cache_path());
    cache.ensure_valid(&ctx.config);

    let mut acquired: Vec<Lock> = Vec::new();
    let mut blocked: Vec<(String, CoordError)> = Vec::new();

    for file in split_files(&args.files) {
        if cache.is_not_protected(&file) {
            continue;
        }

        if args.acquire {
            match mgr.check_or_acquire(
                &file,
                &agent_id,
                args.agent.name.as_deref(),
                args.op.as_deref(),
            ) {
                Ok(None) => cache.mark_not_protected(&file),
                Ok(Some(lock)) => {
                    if !acquired.iter().any(|l| l.resource == lock.resource) {
                        acquired.push(lock);
                    }
                }
                Err(e @ CoordError::Conflict { .. }) => blocked.push((file, e)),
                Err(e) => return Err(e),
            }
        } else {
            match mgr.check(&file)? {
                Protection::Unprotected => cache.mark_not_protected(&file),
                Protection::Held { lock, .. }
                    if !lock.is_owned_by(&agent_id) && !mgr.is_stale(&lock) =>
                {
                    blocked.push((file, lock.into_conflict()));
                }
                _ => {}
            }
        }
    }

    if let Err(e) = cache.save_if_modified() {
        tracing::warn!(error = %e, "could not save check cache");
    }

    if !acquired.is_empty() {
        refresh_locks_held(&ctx, &mgr, &agent_id);
        let resources: Vec<_> = acquired.iter().map(|l| l.resource.as_str()).collect();
        println!("Acquired locks for: {}", resources.join(", "));
    }

    if blocked.is_empty() {
        return Ok(());
    }

    println!("Blocked:");
    for (file, err) in &blocked {
        println!("  - {}: {}", file, err);
    }

    // The exit code comes from the first conflict; all of them were listed.
    match blocked.into_iter().next() {
        Some((_, first)) => Err(first),
        None => Ok(()),
    }
}

/// Split hook-provided arguments on commas, semicolons, and whitespace.
pub(super) fn split_files(args: &[String]) -> Vec<String> {
    args.iter()
        .flat_map(|arg| {
            arg.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}
