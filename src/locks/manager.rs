//! Lock lifecycle: acquire, release, check, and wait.
//!
//! Every call goes straight to the lock store; nothing is cached between
//! calls. The only cross-process primitive is the store's exclusive create:
//! it creates lock records, and it creates the per-acquisition guard that
//! every release and reclaim takes before deleting a record.

use super::record::{Lock, format_age};
use super::staleness::StalenessPolicy;
use super::store::{Deleted, LockStore};
use crate::agents::AgentRegistry;
use crate::config::Settings;
use crate::error::{BatchReport, CoordError, Result};
use crate::fs::Exclusive;
use crate::patterns::{PatternMatcher, ResourceMatcher};
use chrono::Utc;
use std::thread;
use std::time::{Duration, Instant};

/// Protection status of a concrete file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Protection {
    /// No configured pattern covers the path.
    Unprotected,
    /// Covered by `pattern`, and nobody holds it.
    Free { pattern: String },
    /// Covered by `pattern`, and `lock` applies to the path.
    Held { pattern: String, lock: Lock },
}

/// Orchestrates the lock store, staleness policy, and pattern matcher.
#[derive(Debug, Clone)]
pub struct LockManager {
    store: LockStore,
    registry: AgentRegistry,
    matcher: PatternMatcher,
    policy: StalenessPolicy,
    default_ttl: u64,
}

impl LockManager {
    pub fn new(
        store: LockStore,
        registry: AgentRegistry,
        matcher: PatternMatcher,
        settings: &Settings,
    ) -> Self {
        Self {
            store,
            registry,
            matcher,
            policy: StalenessPolicy::new(settings.stale_threshold),
            default_ttl: settings.default_ttl,
        }
    }

    /// Acquire `resource` for `owner_id`.
    ///
    /// A `ttl_seconds` of zero uses the configured default. If the resource
    /// is held by a stale lock, the stale record is removed and the create is
    /// retried once.
    ///
    /// # Returns
    ///
    /// * `Ok(Lock)` - The newly created lock record
    /// * `Err(CoordError::Conflict)` - Held by a live lock (or lost the retry)
    /// * `Err(CoordError::Storage)` - The store could not be read or written
    pub fn acquire(
        &self,
        resource: &str,
        owner_id: &str,
        owner_name: Option<&str>,
        operation: Option<&str>,
        ttl_seconds: u64,
    ) -> Result<Lock> {
        if resource.trim().is_empty() {
            return Err(CoordError::UserError("resource must not be empty".to_string()));
        }
        if owner_id.trim().is_empty() {
            return Err(CoordError::UserError("agent id must not be empty".to_string()));
        }

        let ttl = if ttl_seconds == 0 {
            self.default_ttl
        } else {
            ttl_seconds
        };

        let mut reclaimed = false;
        loop {
            let lock = Lock::new(resource, owner_id, owner_name, operation, ttl);
            if self.store.create_exclusive(&lock)? == Exclusive::Created {
                tracing::info!(resource, owner = owner_id, ttl, "acquired lock");
                return Ok(lock);
            }

            let existing = match self.store.read(resource)? {
                Some(existing) => existing,
                // Released between our create and read.
                None if !reclaimed => {
                    reclaimed = true;
                    continue;
                }
                None => {
                    return Err(CoordError::Conflict {
                        resource: resource.to_string(),
                        owner_id: "unknown".to_string(),
                        owner_name: None,
                        operation: None,
                    });
                }
            };

            if !reclaimed && self.is_stale(&existing) {
                reclaimed = true;
                tracing::info!(
                    resource,
                    previous_owner = %existing.owner_id,
                    age = %format_age(existing.age_at(Utc::now())),
                    "reclaiming stale lock"
                );
                self.reclaim(&existing)?;
                continue;
            }

            return Err(existing.into_conflict());
        }
    }

    /// Release `resource` on behalf of `owner_id`.
    ///
    /// Releasing a free resource succeeds. A lock held by someone else is
    /// left untouched.
    pub fn release(&self, resource: &str, owner_id: &str) -> Result<()> {
        let Some(existing) = self.store.read(resource)? else {
            tracing::debug!(resource, "release of free resource");
            return Ok(());
        };

        if !existing.is_owned_by(owner_id) {
            return Err(CoordError::OwnershipMismatch {
                resource: resource.to_string(),
                owner_id: existing.owner_id,
                requested_by: owner_id.to_string(),
            });
        }

        // A concurrent reclaim may already have removed it; either way the
        // caller no longer holds the resource.
        if self.store.remove_acquisition(&existing)? == Deleted::Removed {
            tracing::info!(resource, owner = owner_id, "released lock");
        }
        Ok(())
    }

    /// Release every lock owned by `owner_id`.
    ///
    /// All locks are attempted; failures are collected in the report.
    pub fn release_all(&self, owner_id: &str) -> Result<BatchReport> {
        let mut report = BatchReport::default();

        for lock in self.store.list()? {
            if !lock.is_owned_by(owner_id) {
                continue;
            }
            match self.release(&lock.resource, owner_id) {
                Ok(()) => report.completed.push(lock.resource),
                Err(e) => report.failed.push((lock.resource, e)),
            }
        }

        Ok(report)
    }

    /// Determine whether `file_path` is protected and, if so, who holds it.
    ///
    /// A lock applies when its resource is the matched pattern or when its
    /// own pattern matches the file (ad-hoc locks on overlapping patterns).
    pub fn check(&self, file_path: &str) -> Result<Protection> {
        let Some(protected) = self.matcher.resolve(file_path) else {
            return Ok(Protection::Unprotected);
        };
        let pattern = protected.pattern.clone();

        if let Some(lock) = self.store.read(&pattern)? {
            return Ok(Protection::Held { pattern, lock });
        }

        let overlapping = self
            .store
            .list()?
            .into_iter()
            .find(|lock| ResourceMatcher::new(&lock.resource).is_match(file_path));

        Ok(match overlapping {
            Some(lock) => Protection::Held { pattern, lock },
            None => Protection::Free { pattern },
        })
    }

    /// Make sure `owner_id` may modify `file_path`, acquiring the matching
    /// pattern if nobody holds it.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - The path is not protected
    /// * `Ok(Some(lock))` - The caller holds `lock` (existing or new)
    /// * `Err(CoordError::Conflict)` - Another agent holds a live lock
    pub fn check_or_acquire(
        &self,
        file_path: &str,
        owner_id: &str,
        owner_name: Option<&str>,
        operation: Option<&str>,
    ) -> Result<Option<Lock>> {
        match self.check(file_path)? {
            Protection::Unprotected => Ok(None),
            Protection::Held { lock, .. } if lock.is_owned_by(owner_id) => Ok(Some(lock)),
            Protection::Held { pattern, lock } => {
                if !self.is_stale(&lock) {
                    return Err(lock.into_conflict());
                }
                if lock.resource != pattern {
                    tracing::info!(
                        resource = %lock.resource,
                        previous_owner = %lock.owner_id,
                        "reclaiming stale overlapping lock"
                    );
                    self.reclaim(&lock)?;
                }
                self.acquire(&pattern, owner_id, owner_name, operation, 0)
                    .map(Some)
            }
            Protection::Free { pattern } => self
                .acquire(&pattern, owner_id, owner_name, operation, 0)
                .map(Some),
        }
    }

    /// Delete every stale lock.
    pub fn clean_stale(&self) -> Result<BatchReport> {
        let mut report = BatchReport::default();

        for lock in self.store.list()? {
            if !self.is_stale(&lock) {
                continue;
            }
            match self.reclaim(&lock) {
                Ok(true) => {
                    tracing::info!(resource = %lock.resource, owner = %lock.owner_id, "removed stale lock");
                    report.completed.push(lock.resource);
                }
                Ok(false) => {}
                Err(e) => report.failed.push((lock.resource, e)),
            }
        }

        Ok(report)
    }

    /// Block until `resource` is free or its lock is stale.
    ///
    /// A zero `timeout` waits indefinitely.
    pub fn wait(&self, resource: &str, timeout: Duration, poll_interval: Duration) -> Result<()> {
        self.wait_with(resource, timeout, poll_interval, |_, _| {})
    }

    /// Like [`wait`](Self::wait), calling `on_poll` with the blocking lock and
    /// the elapsed time before every sleep.
    pub fn wait_with<F>(
        &self,
        resource: &str,
        timeout: Duration,
        poll_interval: Duration,
        mut on_poll: F,
    ) -> Result<()>
    where
        F: FnMut(&Lock, Duration),
    {
        if poll_interval.is_zero() {
            return Err(CoordError::UserError(
                "poll interval must be greater than zero".to_string(),
            ));
        }

        let start = Instant::now();
        loop {
            let lock = match self.store.read(resource)? {
                None => return Ok(()),
                Some(lock) if self.is_stale(&lock) => return Ok(()),
                Some(lock) => lock,
            };

            let elapsed = start.elapsed();
            if !timeout.is_zero() && elapsed >= timeout {
                return Err(CoordError::Timeout {
                    resource: resource.to_string(),
                    owner_id: lock.owner_id,
                    waited: elapsed,
                });
            }

            on_poll(&lock, elapsed);

            let nap = if timeout.is_zero() {
                poll_interval
            } else {
                poll_interval.min(timeout - elapsed)
            };
            thread::sleep(nap);
        }
    }

    /// All current lock records, sorted by resource.
    pub fn list(&self) -> Result<Vec<Lock>> {
        self.store.list()
    }

    /// Is `lock` reclaimable right now?
    pub fn is_stale(&self, lock: &Lock) -> bool {
        let heartbeat = self.registry.last_heartbeat(&lock.owner_id);
        self.policy.is_stale(lock, heartbeat, Utc::now())
    }

    /// Delete `stale` if the record on disk is still the same acquisition.
    ///
    /// Returns `false` when the record was already gone, was replaced by a
    /// newer acquisition, or another caller is reclaiming it.
    fn reclaim(&self, stale: &Lock) -> Result<bool> {
        Ok(self.store.remove_acquisition(stale)? == Deleted::Removed)
    }
}
