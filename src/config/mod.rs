//! Configuration model for lockstep.
//!
//! This module defines the Config struct that represents
//! `<coord-root>/config.yaml`: the ordered list of protected patterns and the
//! lock/heartbeat timing settings. Parsing is forward-compatible (unknown
//! fields are ignored) and missing values fall back to defaults.

mod model;
mod operations;

#[cfg(test)]
mod tests;

pub use model::{
    Config, DEFAULT_HEARTBEAT_INTERVAL_SECONDS, DEFAULT_STALE_THRESHOLD_SECONDS,
    DEFAULT_TTL_SECONDS, MAX_SECONDS, ProtectedPattern, Settings, default_protected_patterns,
};
pub use operations::CONFIG_FILE_NAME;
