//! Protected-resource pattern matching.
//!
//! Maps a concrete file path to the configured pattern that protects it.
//! Patterns use the nested-wildcard glob dialect: `*` and `?` stay within a
//! path segment, `**` spans segments (including zero of them), and `{a,b}`
//! expands alternatives. Matching is pure; the compiled set is built once per
//! invocation from the config.

use crate::config::ProtectedPattern;
use crate::error::{CoordError, Result};
use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

/// Compile a single glob with path-segment aware wildcards.
pub fn compile_glob(pattern: &str) -> std::result::Result<Glob, globset::Error> {
    GlobBuilder::new(pattern).literal_separator(true).build()
}

/// Normalize a file path for matching: forward slashes, no leading `./`.
pub fn normalize_path(path: &str) -> String {
    let normalized = path.trim().replace('\\', "/");
    let mut rest = normalized.as_str();
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    rest.to_string()
}

/// Compiled, ordered set of protected patterns.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    patterns: Vec<ProtectedPattern>,
    set: GlobSet,
}

impl PatternMatcher {
    /// Compile the protected patterns.
    ///
    /// # Returns
    ///
    /// * `Err(CoordError::UserError)` - if any pattern is not a valid glob
    pub fn new(patterns: &[ProtectedPattern]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();

        for protected in patterns {
            let glob = compile_glob(&protected.pattern).map_err(|e| {
                CoordError::UserError(format!(
                    "invalid protected pattern '{}': {}",
                    protected.pattern, e
                ))
            })?;
            builder.add(glob);
        }

        let set = builder.build().map_err(|e| {
            CoordError::UserError(format!("failed to compile protected patterns: {}", e))
        })?;

        Ok(Self {
            patterns: patterns.to_vec(),
            set,
        })
    }

    /// Return the first configured pattern matching `file_path`, if any.
    pub fn resolve(&self, file_path: &str) -> Option<&ProtectedPattern> {
        let path = normalize_path(file_path);
        self.set
            .matches(&path)
            .into_iter()
            .min()
            .and_then(|index| self.patterns.get(index))
    }
}

/// Single-pattern matcher for lock resources that were acquired ad hoc.
#[derive(Debug, Clone)]
pub struct ResourceMatcher(Option<GlobMatcher>);

impl ResourceMatcher {
    pub fn new(resource: &str) -> Self {
        Self(compile_glob(resource).ok().map(|g| g.compile_matcher()))
    }

    pub fn is_match(&self, file_path: &str) -> bool {
        self.0
            .as_ref()
            .is_some_and(|m| m.is_match(normalize_path(file_path)))
    }
}
