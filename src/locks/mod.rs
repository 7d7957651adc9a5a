//! Locking subsystem for lockstep.
//!
//! # Lock Files
//!
//! Lock records live in `<coord-root>/locks/`, one file per resource pattern.
//! Records are created with exclusive-create semantics so that exactly one
//! agent can hold a given resource at a time.
//!
//! # Lock Metadata
//!
//! Each lock file contains JSON metadata:
//! - `resource`: the protected pattern
//! - `agent_id` / `agent_name`: the owner
//! - `operation`: what the owner is doing (optional)
//! - `acquired_at`: RFC 3339 timestamp
//! - `ttl_seconds`: validity window
//! - `pid`: the acquiring process
//!
//! # Staleness
//!
//! A held lock becomes reclaimable once its owner stops sending heartbeats
//! (or, for owners without an agent record, once its TTL runs out). See
//! [`StalenessPolicy`].

mod manager;
mod record;
mod staleness;
mod store;


pub use manager::{LockManager, Protection};
pub use record::{Lock, format_age};
pub(crate) use record::{checked_seconds, empty_as_none, non_empty};
pub use staleness::StalenessPolicy;
pub use store::{Deleted, LockStore};
