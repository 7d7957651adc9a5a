//! Implementation of the `lockstep wait` command.

use crate::cli::WaitArgs;
use crate::context::CoordContext;
use crate::error::Result;
use std::path::Path;
use std::time::Duration;

pub fn cmd_wait(dir: Option<&Path>, args: WaitArgs) -> Result<()> {
    let ctx = CoordContext::resolve(dir)?;
    let mgr = ctx.lock_manager()?;

    println!("Waiting for {} to become available...", args.resource);

    mgr.wait_with(
        &args.resource,
        Duration::from_secs(args.timeout),
        Duration::from_secs(args.interval),
        |lock, elapsed| match &lock.operation {
            Some(op) => println!(
                "  Still locked by {} ({}), waiting... ({}s elapsed)",
                lock.owner_id,
                op,
                elapsed.as_secs()
            ),
            None => println!(
                "  Still locked by {}, waiting... ({}s elapsed)",
                lock.owner_id,
                elapsed.as_secs()
            ),
        },
    )?;

    println!("Resource available: {}", args.resource);
    Ok(())
}
