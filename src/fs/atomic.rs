//! Atomic filesystem operations for lockstep.
//!
//! Records are never written in place. Every write follows this pattern:
//! 1. Write content to a private temporary file in the same directory
//! 2. Sync the file to disk (fsync)
//! 3. Publish it under the final name in one step
//!
//! Publishing is either a `rename()` (replace semantics, used for agent
//! records, config, and the check cache) or a `hard_link()` (create-if-absent
//! semantics, used for lock records). Both are atomic when source and
//! destination live on the same filesystem, so readers see either the old
//! record, no record, or the complete new record.
//!
//! # Important Notes
//!
//! - On crash, a temporary file may remain (named `.{filename}.{pid}.{n}.tmp`);
//!   directory listings only accept their record extension, so it is ignored.
//! - Temporary names embed the process id and a per-process counter so that
//!   concurrent writers never share a temp file.

use crate::error::{CoordError, Result};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Outcome of [`create_exclusive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusive {
    /// The file did not exist and now holds the given content.
    Created,
    /// Another writer got there first; nothing was changed.
    AlreadyExists,
}

/// Atomically write bytes to a file, replacing any existing content.
///
/// # Arguments
///
/// * `path` - The target file path
/// * `content` - The bytes to write
///
/// # Returns
///
/// * `Ok(())` - On successful atomic write
/// * `Err(CoordError::Storage)` - On write or rename failure
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    ensure_parent(path)?;
    let temp_path = generate_temp_path(path)?;
    write_and_sync(&temp_path, content)?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        CoordError::Storage(format!(
            "failed to atomically replace '{}': {}",
            path.display(),
            e
        ))
    })?;

    sync_parent(path);
    Ok(())
}

/// Atomically write a string to a file.
///
/// Convenience wrapper around `atomic_write` for string content.
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Create `path` with `content` only if it does not already exist.
///
/// Under any number of concurrent callers targeting the same path, exactly
/// one observes [`Exclusive::Created`]. The content is complete before the
/// name becomes visible.
///
/// Filesystems without hard link support fall back to `create_new` followed
/// by a write, which keeps the exclusivity guarantee but may briefly expose
/// an empty file to readers.
pub fn create_exclusive<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<Exclusive> {
    let path = path.as_ref();

    ensure_parent(path)?;
    let temp_path = generate_temp_path(path)?;
    write_and_sync(&temp_path, content)?;

    let linked = fs::hard_link(&temp_path, path);
    let _ = fs::remove_file(&temp_path);

    match linked {
        Ok(()) => {
            sync_parent(path);
            Ok(Exclusive::Created)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(Exclusive::AlreadyExists),
        Err(e) if e.kind() == ErrorKind::Unsupported || e.kind() == ErrorKind::PermissionDenied => {
            create_new_fallback(path, content)
        }
        Err(e) => Err(CoordError::Storage(format!(
            "failed to create '{}': {}",
            path.display(),
            e
        ))),
    }
}

fn create_new_fallback(path: &Path, content: &[u8]) -> Result<Exclusive> {
    let mut file = match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(Exclusive::AlreadyExists),
        Err(e) => {
            return Err(CoordError::Storage(format!(
                "failed to create '{}': {}",
                path.display(),
                e
            )));
        }
    };

    file.write_all(content)
        .and_then(|()| file.sync_all())
        .map_err(|e| {
            let _ = fs::remove_file(path);
            CoordError::Storage(format!("failed to write '{}': {}", path.display(), e))
        })?;

    Ok(Exclusive::Created)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            CoordError::Storage(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }
    Ok(())
}

/// Generate a temporary file path in the same directory as the target.
fn generate_temp_path(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CoordError::Storage("invalid file path".to_string()))?;

    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let temp_name = format!(".{}.{}.{}.tmp", filename, std::process::id(), n);
    Ok(parent.join(temp_name))
}

/// Write content to a file and sync to disk.
fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        CoordError::Storage(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content).map_err(|e| {
        let _ = fs::remove_file(path);
        CoordError::Storage(format!("failed to write to temporary file: {}", e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(path);
        CoordError::Storage(format!("failed to sync temporary file to disk: {}", e))
    })?;

    Ok(())
}

/// Best-effort sync of the parent directory so the new entry is durable.
fn sync_parent(path: &Path) {
    if let Some(parent) = path.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }
}
