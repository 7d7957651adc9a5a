//! Cache of paths known not to be protected.
//!
//! `check` runs on every file edit, most of which touch unprotected files.
//! Remembering those paths skips pattern matching and the lock directory
//! scan for them. The cache is tied to the protected pattern list by a short
//! content hash; any change to the patterns discards it.

use crate::config::Config;
use crate::error::{CoordError, Result};
use crate::fs::atomic_write_file;
use crate::patterns::normalize_path;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Persisted "not protected" answers for one pattern list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckCache {
    /// Hash of the pattern list these answers were computed against.
    #[serde(default)]
    pub config_hash: String,

    #[serde(default)]
    pub not_protected: BTreeMap<String, bool>,

    #[serde(skip)]
    path: PathBuf,

    #[serde(skip)]
    modified: bool,
}

impl CheckCache {
    /// Load the cache at `path`. A missing or unreadable cache is empty.
    pub fn load<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();

        let mut cache = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str::<CheckCache>(&content).unwrap_or_else(|e| {
                tracing::debug!(path = %path.display(), error = %e, "discarding unreadable check cache");
                CheckCache::default()
            }),
            Err(_) => CheckCache::default(),
        };

        cache.path = path;
        cache.modified = false;
        cache
    }

    /// Does this cache belong to `config`'s pattern list?
    pub fn is_valid(&self, config: &Config) -> bool {
        self.config_hash == config_hash(config)
    }

    /// Drop every entry and bind the cache to `config`'s pattern list.
    pub fn reset(&mut self, config: &Config) {
        self.config_hash = config_hash(config);
        self.not_protected.clear();
        self.modified = true;
    }

    /// Reset the cache if it was built for a different pattern list.
    pub fn ensure_valid(&mut self, config: &Config) {
        if !self.is_valid(config) {
            tracing::debug!("check cache invalidated by pattern change");
            self.reset(config);
        }
    }

    pub fn is_not_protected(&self, file_path: &str) -> bool {
        self.not_protected
            .get(&normalize_path(file_path))
            .copied()
            .unwrap_or(false)
    }

    pub fn mark_not_protected(&mut self, file_path: &str) {
        if self
            .not_protected
            .insert(normalize_path(file_path), true)
            .is_none()
        {
            self.modified = true;
        }
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Write the cache back if anything changed since it was loaded.
    pub fn save_if_modified(&mut self) -> Result<()> {
        if !self.is_modified() {
            return Ok(());
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CoordError::Storage(format!("failed to serialize check cache: {}", e)))?;
        atomic_write_file(&self.path, &json)?;
        self.modified = false;
        Ok(())
    }
}

/// Short hash of the protected pattern list: hex of the first 8 bytes of the
/// SHA-256 of the JSON array of pattern strings.
pub fn config_hash(config: &Config) -> String {
    let patterns = config.pattern_strings();
    let data = serde_json::to_vec(&patterns).unwrap_or_default();
    let digest = Sha256::digest(&data);
    hex::encode(&digest[..8])
}
