//! Implementation of the `lockstep init` command.
//!
//! # What `lockstep init` does
//!
//! 1. Picks the coordination root (`--local` forces `./.lockstep`)
//! 2. Writes the default `config.yaml` (kept if present, unless `--force`)
//! 3. Creates `locks/` and `agents/`
//! 4. For roots outside the git directory, writes a `.gitignore` so runtime
//!    state never gets committed
//!
//! Running it again is harmless.

use crate::cli::InitArgs;
use crate::config::Config;
use crate::context::{CACHE_FILE_NAME, CoordContext, LOCAL_COORD_DIR, RootSource, discover_coord_dir};
use crate::error::{CoordError, Result};
use crate::fs::atomic_write_file;
use std::env;
use std::path::Path;

/// Contents of the `.gitignore` written into roots that live in the tree.
const GITIGNORE: &str = "locks/\nagents/\ncheck-cache.json\n";

pub fn cmd_init(dir: Option<&Path>, args: InitArgs) -> Result<()> {
    let cwd = env::current_dir().map_err(|e| {
        CoordError::UserError(format!("failed to get current working directory: {}", e))
    })?;

    let (coord_dir, source) = if args.local && dir.is_none() {
        (cwd.join(LOCAL_COORD_DIR), RootSource::Default)
    } else {
        discover_coord_dir(&cwd, dir)
    };

    let mut ctx = CoordContext::with_config(coord_dir, Config::default());
    ctx.source = source;

    let wrote_config = write_config(&ctx, args.force)?;
    ctx.ensure_dirs()?;
    let wrote_gitignore = source != RootSource::GitCommonDir && write_gitignore(&ctx)?;

    tracing::info!(root = %ctx.coord_dir.display(), "initialized coordination root");

    println!("Initialized lockstep.");
    println!();
    println!("Coordination root: {}", ctx.coord_dir.display());
    if wrote_config {
        println!("  config.yaml        (default protected patterns)");
    } else {
        println!("  config.yaml        (kept existing; use --force to overwrite)");
    }
    println!("  locks/");
    println!("  agents/");
    if wrote_gitignore {
        println!("  .gitignore         (ignores locks/, agents/, {})", CACHE_FILE_NAME);
    }

    Ok(())
}

/// Write the default config unless one exists. Returns whether it wrote.
pub(super) fn write_config(ctx: &CoordContext, force: bool) -> Result<bool> {
    if ctx.is_initialized() && !force {
        return Ok(false);
    }
    ctx.config.save(&ctx.coord_dir)?;
    Ok(true)
}

/// Write `.gitignore` into the root if missing. Returns whether it wrote.
pub(super) fn write_gitignore(ctx: &CoordContext) -> Result<bool> {
    let path = ctx.coord_dir.join(".gitignore");
    if path.exists() {
        return Ok(false);
    }
    atomic_write_file(&path, GITIGNORE)?;
    Ok(true)
}
