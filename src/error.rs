//! Error types for lockstep.
//!
//! Uses thiserror for derive macros. Each variant maps to a process exit code
//! so the CLI layer never has to inspect message text.

use crate::exit_codes;
use std::time::Duration;
use thiserror::Error;

/// Main error type for lockstep operations.
#[derive(Error, Debug)]
pub enum CoordError {
    /// User provided invalid arguments or configuration.
    #[error("{0}")]
    UserError(String),

    /// The resource is held by another agent.
    #[error("resource '{resource}' is locked by agent '{owner_id}'{}{}", display_name(.owner_name), display_operation(.operation))]
    Conflict {
        resource: String,
        owner_id: String,
        owner_name: Option<String>,
        operation: Option<String>,
    },

    /// Release attempted by an agent that does not own the lock.
    #[error("lock on '{resource}' is owned by agent '{owner_id}', not '{requested_by}'")]
    OwnershipMismatch {
        resource: String,
        owner_id: String,
        requested_by: String,
    },

    /// A record that must exist was not found.
    #[error("{0} not found")]
    NotFound(String),

    /// `wait` gave up before the resource became available.
    #[error("timed out after {}s waiting for '{resource}' (locked by '{owner_id}')", .waited.as_secs())]
    Timeout {
        resource: String,
        owner_id: String,
        waited: Duration,
    },

    /// Creating, reading, or deleting a record failed.
    #[error("storage failure: {0}")]
    Storage(String),

    /// A batch operation finished with some failed items.
    #[error("failed to {action} {} item(s): {}", .failures.len(), .failures.join("; "))]
    Partial {
        action: String,
        failures: Vec<String>,
    },
}

fn display_name(name: &Option<String>) -> String {
    match name {
        Some(n) if !n.is_empty() => format!(" ({})", n),
        _ => String::new(),
    }
}

fn display_operation(operation: &Option<String>) -> String {
    match operation {
        Some(op) if !op.is_empty() => format!(": {}", op),
        _ => String::new(),
    }
}

impl CoordError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            CoordError::UserError(_) => exit_codes::USER_ERROR,
            CoordError::Conflict { .. } => exit_codes::CONFLICT,
            CoordError::OwnershipMismatch { .. } => exit_codes::OWNERSHIP_MISMATCH,
            CoordError::NotFound(_) => exit_codes::USER_ERROR,
            CoordError::Timeout { .. } => exit_codes::TIMEOUT,
            CoordError::Storage(_) => exit_codes::STORAGE_FAILURE,
            CoordError::Partial { .. } => exit_codes::PARTIAL_FAILURE,
        }
    }
}

/// Result type alias for lockstep operations.
pub type Result<T> = std::result::Result<T, CoordError>;

/// Per-item results of a batch operation.
///
/// Every item is attempted; a failure on one never stops the others.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Keys that were processed successfully.
    pub completed: Vec<String>,
    /// Keys that failed, with the reason.
    pub failed: Vec<(String, CoordError)>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Collapse into the completed keys, or a single `Partial` error naming
    /// every failed item.
    pub fn into_result(self, action: &str) -> Result<Vec<String>> {
        if self.failed.is_empty() {
            return Ok(self.completed);
        }

        Err(CoordError::Partial {
            action: action.to_string(),
            failures: self
                .failed
                .into_iter()
                .map(|(key, err)| format!("{}: {}", key, err))
                .collect(),
        })
    }
}
