//! Exit code constants for the lockstep CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config)
//! - 2: Resource held by another agent
//! - 3: Release attempted by a non-owner
//! - 4: Wait timed out
//! - 5: Storage (I/O) failure
//! - 6: Batch operation partially failed

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid configuration.
pub const USER_ERROR: i32 = 1;

/// The resource is locked by another agent.
pub const CONFLICT: i32 = 2;

/// A lock was released by an agent that does not own it.
pub const OWNERSHIP_MISMATCH: i32 = 3;

/// `wait` exceeded its timeout.
pub const TIMEOUT: i32 = 4;

/// Reading, writing, or deleting a record failed.
pub const STORAGE_FAILURE: i32 = 5;

/// Some items of a batch operation (release-all, gc) failed.
pub const PARTIAL_FAILURE: i32 = 6;
