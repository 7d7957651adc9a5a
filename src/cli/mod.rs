//! CLI argument parsing for lockstep.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use crate::config::MAX_SECONDS;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Lockstep: advisory resource locks for agents sharing a working tree.
///
/// Agents claim protected resources (schema files, manifests, lockfiles)
/// before editing them:
/// - Locks are small JSON files created with exclusive-create semantics
/// - Agents prove liveness with periodic heartbeats
/// - Locks of silent agents become reclaimable
#[derive(Parser, Debug)]
#[command(name = "lockstep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Coordination root (default: discovered from the current directory).
    #[arg(long, global = true, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for lockstep.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a coordination root.
    ///
    /// Writes the default config and creates the locks/ and agents/
    /// directories.
    Init(InitArgs),

    /// Acquire a lock on a resource pattern.
    Lock(LockArgs),

    /// Release a lock (or all of this agent's locks).
    Unlock(UnlockArgs),

    /// Check whether files are protected and locked by someone else.
    ///
    /// Exits non-zero if any file is locked by another agent.
    Check(CheckArgs),

    /// Show active locks and agents.
    Status,

    /// Block until a resource is free.
    Wait(WaitArgs),

    /// Remove stale locks and dead agents.
    Gc,

    /// Register this agent.
    Register(RegisterArgs),

    /// Send a heartbeat (once, or periodically with --daemon).
    Heartbeat(HeartbeatArgs),

    /// Deregister this agent.
    Deregister(DeregisterArgs),

    /// Set the current task description of this agent.
    Task(TaskArgs),
}

/// Agent identity flags shared by most commands.
#[derive(Parser, Debug, Clone, Default)]
pub struct AgentArgs {
    /// Agent ID (default: $LOCKSTEP_AGENT_ID, else generated).
    #[arg(long)]
    pub agent: Option<String>,

    /// Agent display name.
    #[arg(long)]
    pub name: Option<String>,
}

/// Arguments for the `init` command.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config file.
    #[arg(long)]
    pub force: bool,

    /// Create `.lockstep/` in the current directory instead of inside git.
    #[arg(long)]
    pub local: bool,
}

/// Arguments for the `lock` command.
#[derive(Parser, Debug)]
pub struct LockArgs {
    /// Resource pattern to lock (usually a configured pattern, e.g. "db/**/*").
    pub resource: String,

    /// What you are doing with the resource.
    #[arg(long)]
    pub op: Option<String>,

    /// Lock TTL in seconds (0 = configured default).
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u64).range(..=MAX_SECONDS))]
    pub ttl: u64,

    #[command(flatten)]
    pub agent: AgentArgs,
}

/// Arguments for the `unlock` command.
#[derive(Parser, Debug)]
pub struct UnlockArgs {
    /// Resource pattern to unlock.
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub resource: Option<String>,

    /// Release every lock held by this agent.
    #[arg(long)]
    pub all: bool,

    /// Agent ID (default: $LOCKSTEP_AGENT_ID).
    #[arg(long)]
    pub agent: Option<String>,
}

/// Arguments for the `check` command.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Files to check; each argument may hold several paths separated by
    /// commas, semicolons, or spaces.
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Acquire locks for protected files that are free.
    #[arg(long)]
    pub acquire: bool,

    /// Operation recorded on acquired locks.
    #[arg(long)]
    pub op: Option<String>,

    #[command(flatten)]
    pub agent: AgentArgs,
}

/// Arguments for the `wait` command.
#[derive(Parser, Debug)]
pub struct WaitArgs {
    /// Resource pattern to wait for.
    pub resource: String,

    /// Give up after this many seconds (0 = wait forever).
    #[arg(long, default_value_t = 300)]
    pub timeout: u64,

    /// Seconds between checks.
    #[arg(long, default_value_t = 5)]
    pub interval: u64,
}

/// Arguments for the `register` command.
#[derive(Parser, Debug)]
pub struct RegisterArgs {
    #[command(flatten)]
    pub agent: AgentArgs,
}

/// Arguments for the `heartbeat` command.
#[derive(Parser, Debug)]
pub struct HeartbeatArgs {
    /// Agent ID (default: $LOCKSTEP_AGENT_ID, else generated).
    #[arg(long)]
    pub agent: Option<String>,

    /// Keep running and send a heartbeat every interval.
    #[arg(long)]
    pub daemon: bool,

    /// Seconds between heartbeats in daemon mode (default: from config).
    #[arg(long, value_parser = clap::value_parser!(u64).range(..=MAX_SECONDS))]
    pub interval: Option<u64>,
}

/// Arguments for the `deregister` command.
#[derive(Parser, Debug)]
pub struct DeregisterArgs {
    /// Agent ID (default: $LOCKSTEP_AGENT_ID).
    #[arg(long)]
    pub agent: Option<String>,

    /// Release all of the agent's locks first.
    #[arg(long)]
    pub release_all: bool,
}

/// Arguments for the `task` command.
#[derive(Parser, Debug)]
pub struct TaskArgs {
    /// Task description (empty clears it).
    pub description: String,

    /// Agent ID (default: $LOCKSTEP_AGENT_ID).
    #[arg(long)]
    pub agent: Option<String>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
