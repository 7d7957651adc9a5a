//! Filesystem-safe record names.
//!
//! Lock resources are glob patterns and agent ids are free text, so neither
//! can be used as a file name directly. Path separators and glob
//! metacharacters are replaced with fixed fillers, keeping names readable in
//! a directory listing, and a short SHA-256 suffix of the raw key is appended
//! so that keys differing only in substituted characters (`db/schema/*` and
//! `db-schema-_`) still map to distinct files.

use sha2::{Digest, Sha256};

/// Number of hash bytes appended to an encoded key.
const SUFFIX_BYTES: usize = 4;

/// Longest readable prefix kept, in bytes. Leaves room under NAME_MAX for
/// the hash suffix, record extensions, and temporary-file decorations.
const MAX_READABLE_BYTES: usize = 160;

/// Encode a resource pattern or agent id as a file stem.
pub fn encode_key(key: &str) -> String {
    let mut readable: String = key
        .chars()
        .map(|c| match c {
            '/' | '\\' => '-',
            '*' | '?' => '_',
            c if c.is_control() || c == ':' => '_',
            c => c,
        })
        .collect();
    truncate_at_char_boundary(&mut readable, MAX_READABLE_BYTES);

    let digest = Sha256::digest(key.as_bytes());
    format!("{}.{}", readable, hex::encode(&digest[..SUFFIX_BYTES]))
}

fn truncate_at_char_boundary(s: &mut String, max_bytes: usize) {
    if s.len() <= max_bytes {
        return;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}
