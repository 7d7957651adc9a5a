//! When may an existing lock be reclaimed?
//!
//! Two signals are combined. An owner with an agent record is judged purely
//! on its heartbeat: while the heartbeat is within the stale threshold the
//! lock survives, even past a short TTL; once the heartbeat goes silent the
//! lock is stale. An owner that never registered has no liveness evidence, so
//! its lock expires at the TTL or after the stale threshold, whichever comes
//! first.

use super::record::{Lock, checked_seconds};
use chrono::{DateTime, Duration, Utc};

/// Staleness rules for lock records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    /// `None` when the threshold is too large to ever be reached.
    stale_threshold: Option<Duration>,
}

impl StalenessPolicy {
    pub fn new(stale_threshold_seconds: u64) -> Self {
        Self {
            stale_threshold: checked_seconds(stale_threshold_seconds),
        }
    }

    /// Is `lock` stale at `now`, given its owner's last heartbeat (if the
    /// owner has an agent record)?
    pub fn is_stale(
        &self,
        lock: &Lock,
        owner_heartbeat: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        match owner_heartbeat {
            Some(last_heartbeat) => self.exceeded(now.signed_duration_since(last_heartbeat)),
            None => lock.ttl_expired_at(now) || self.exceeded(lock.age_at(now)),
        }
    }

    fn exceeded(&self, elapsed: Duration) -> bool {
        self.stale_threshold.is_some_and(|threshold| elapsed > threshold)
    }
}
