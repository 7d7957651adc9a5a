//! Durable lock records, one file per resource.

use super::record::Lock;
use crate::error::{CoordError, Result};
use crate::fs::{Exclusive, create_exclusive, encode_key};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File extension of lock records.
pub const LOCK_EXTENSION: &str = "lock";

/// File extension of reclaim guards.
const GUARD_EXTENSION: &str = "reclaim";

/// A guard older than this was left behind by a remover that died.
const ABANDONED_GUARD_SECONDS: i64 = 30;

/// Outcome of [`LockStore::delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deleted {
    Removed,
    NotFound,
}

/// Lock records under `<coord-root>/locks/`.
#[derive(Debug, Clone)]
pub struct LockStore {
    dir: PathBuf,
}

impl LockStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `resource`.
    pub fn path_for(&self, resource: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", encode_key(resource), LOCK_EXTENSION))
    }

    /// Path of the guard taken while removing this particular acquisition.
    pub(crate) fn guard_path_for(&self, lock: &Lock) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(lock.owner_id.as_bytes());
        hasher.update(b"\n");
        hasher.update(lock.acquired_at.to_rfc3339().as_bytes());
        let acquisition = hex::encode(&hasher.finalize()[..4]);

        self.dir.join(format!(
            "{}.{}.{}",
            encode_key(&lock.resource),
            acquisition,
            GUARD_EXTENSION
        ))
    }

    /// Create the record for `lock.resource` unless one already exists.
    ///
    /// Exactly one of any number of concurrent callers succeeds.
    pub fn create_exclusive(&self, lock: &Lock) -> Result<Exclusive> {
        let json = lock.to_json()?;
        create_exclusive(self.path_for(&lock.resource), json.as_bytes())
    }

    /// Read the record for `resource`, if present.
    pub fn read(&self, resource: &str) -> Result<Option<Lock>> {
        read_record(&self.path_for(resource))
    }

    /// Delete the record for `resource`.
    pub fn delete(&self, resource: &str) -> Result<Deleted> {
        let path = self.path_for(resource);
        match fs::remove_file(&path) {
            Ok(()) => Ok(Deleted::Removed),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Deleted::NotFound),
            Err(e) => Err(CoordError::Storage(format!(
                "failed to delete lock '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    /// Delete the record for `lock.resource` only while it still holds this
    /// very acquisition.
    ///
    /// Removers of an acquisition first create its guard file exclusively, so
    /// exactly one of them proceeds. Nothing else can delete the record while
    /// the guard is held and nothing can be created over it, so the record
    /// verified under the guard is the record deleted.
    ///
    /// # Returns
    ///
    /// * `Ok(Deleted::Removed)` - This call deleted the acquisition
    /// * `Ok(Deleted::NotFound)` - The acquisition is gone, was replaced, or
    ///   another caller is removing it
    pub fn remove_acquisition(&self, lock: &Lock) -> Result<Deleted> {
        let guard = self.guard_path_for(lock);
        if !take_guard(&guard)? {
            tracing::debug!(resource = %lock.resource, "acquisition is already being removed");
            return Ok(Deleted::NotFound);
        }

        let removed = match self.read(&lock.resource) {
            Ok(Some(current)) if current.same_acquisition(lock) => self.delete(&lock.resource),
            Ok(_) => Ok(Deleted::NotFound),
            Err(e) => Err(e),
        };

        match fs::remove_file(&guard) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %guard.display(), error = %e, "failed to remove reclaim guard");
            }
        }

        removed
    }

    /// List all readable lock records, sorted by resource.
    ///
    /// A missing directory is an empty set. Entries that cannot be read or
    /// parsed are skipped.
    pub fn list(&self) -> Result<Vec<Lock>> {
        let entries = match fs::read_dir(self.dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(CoordError::Storage(format!(
                    "failed to read locks directory '{}': {}",
                    self.dir.display(),
                    e
                )));
            }
        };

        let mut locks = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                CoordError::Storage(format!("failed to read locks directory entry: {}", e))
            })?;
            let path = entry.path();

            if !is_record_file(&path) {
                continue;
            }

            match read_record(&path) {
                Ok(Some(lock)) => locks.push(lock),
                // Released between read_dir and read.
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable lock record");
                }
            }
        }

        locks.sort_by(|a, b| a.resource.cmp(&b.resource));
        Ok(locks)
    }
}

// Temporary files end in `.tmp` and reclaim guards in `.reclaim`, so the
// extension alone tells records apart. Names may start with a dot (`.env*`).
fn is_record_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(LOCK_EXTENSION) && path.is_file()
}

fn take_guard(guard: &Path) -> Result<bool> {
    let taken_at = Utc::now().to_rfc3339();
    if create_exclusive(guard, taken_at.as_bytes())? == Exclusive::Created {
        return Ok(true);
    }
    if !clear_abandoned_guard(guard)? {
        return Ok(false);
    }
    Ok(create_exclusive(guard, taken_at.as_bytes())? == Exclusive::Created)
}

/// Remove `guard` if its holder is presumed dead. Returns whether the guard
/// is gone.
fn clear_abandoned_guard(guard: &Path) -> Result<bool> {
    let abandoned = match fs::read_to_string(guard) {
        // Still being written by a create_new fallback.
        Ok(content) if content.trim().is_empty() => false,
        Ok(content) => match DateTime::parse_from_rfc3339(content.trim()) {
            Ok(taken_at) => {
                Utc::now().signed_duration_since(taken_at.with_timezone(&Utc))
                    > Duration::seconds(ABANDONED_GUARD_SECONDS)
            }
            Err(_) => true,
        },
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
        Err(_) => true,
    };

    if !abandoned {
        return Ok(false);
    }

    tracing::warn!(path = %guard.display(), "removing abandoned reclaim guard");
    match fs::remove_file(guard) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
        Err(e) => Err(CoordError::Storage(format!(
            "failed to remove abandoned reclaim guard '{}': {}",
            guard.display(),
            e
        ))),
    }
}

fn read_record(path: &Path) -> Result<Option<Lock>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(CoordError::Storage(format!(
                "failed to read lock '{}': {}",
                path.display(),
                e
            )));
        }
    };

    Lock::from_json(&content)
        .map(Some)
        .map_err(|e| CoordError::Storage(format!("{} ('{}')", e, path.display())))
}
