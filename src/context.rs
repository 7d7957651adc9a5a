//! Coordination root resolution for lockstep.
//!
//! Every command works against one coordination root: a directory holding
//! `config.yaml`, `locks/`, `agents/`, and the check cache. The root is
//! resolved once per invocation and handed to each operation through
//! [`CoordContext`]; nothing else reads paths or configuration on its own.
//!
//! Resolution order:
//! 1. An explicit `--dir`
//! 2. `<git common dir>/lockstep` when inside a git repository, so every
//!    worktree of the repository shares one root
//! 3. The nearest ancestor directory containing `.lockstep/`
//! 4. `./.lockstep`

use crate::agents::{AgentRegistry, generate_agent_id};
use crate::config::{CONFIG_FILE_NAME, Config};
use crate::error::{CoordError, Result};
use crate::git;
use crate::locks::{LockManager, LockStore};
use crate::patterns::PatternMatcher;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Root directory name inside the git common dir.
pub const GIT_COORD_DIR: &str = "lockstep";

/// Root directory name for roots outside git.
pub const LOCAL_COORD_DIR: &str = ".lockstep";

/// Lock records directory inside the root.
pub const LOCKS_DIR: &str = "locks";

/// Agent records directory inside the root.
pub const AGENTS_DIR: &str = "agents";

/// Check cache file inside the root.
pub const CACHE_FILE_NAME: &str = "check-cache.json";

/// Environment variable naming the current agent.
pub const AGENT_ID_ENV: &str = "LOCKSTEP_AGENT_ID";

/// How the coordination root was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootSource {
    /// Given with `--dir`.
    Explicit,
    /// Inside the repository's common git directory.
    GitCommonDir,
    /// An existing `.lockstep/` in the current directory or an ancestor.
    Ancestor,
    /// Nothing found; `./.lockstep`.
    Default,
}

/// Resolved paths and configuration for one invocation.
#[derive(Debug, Clone)]
pub struct CoordContext {
    /// Absolute path to the coordination root.
    pub coord_dir: PathBuf,

    /// `{coord_dir}/locks`
    pub locks_dir: PathBuf,

    /// `{coord_dir}/agents`
    pub agents_dir: PathBuf,

    /// How `coord_dir` was found.
    pub source: RootSource,

    /// Loaded configuration (defaults when `config.yaml` is absent).
    pub config: Config,
}

impl CoordContext {
    /// Resolve the context from the current working directory.
    pub fn resolve(dir_override: Option<&Path>) -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            CoordError::UserError(format!("failed to get current working directory: {}", e))
        })?;

        Self::resolve_from(&cwd, dir_override)
    }

    /// Resolve the context as if invoked from `cwd`.
    pub fn resolve_from<P: AsRef<Path>>(cwd: P, dir_override: Option<&Path>) -> Result<Self> {
        let (coord_dir, source) = discover_coord_dir(cwd.as_ref(), dir_override);
        tracing::debug!(root = %coord_dir.display(), ?source, "resolved coordination root");
        let mut ctx = Self::from_dir(coord_dir)?;
        ctx.source = source;
        Ok(ctx)
    }

    /// Context for the root at `coord_dir`, loading its config if present.
    pub fn from_dir<P: Into<PathBuf>>(coord_dir: P) -> Result<Self> {
        let coord_dir = coord_dir.into();
        let config = Config::load_or_default(coord_dir.join(CONFIG_FILE_NAME))?;
        Ok(Self::with_config(coord_dir, config))
    }

    /// Context for the root at `coord_dir` with an already loaded config.
    pub fn with_config<P: Into<PathBuf>>(coord_dir: P, config: Config) -> Self {
        let coord_dir = coord_dir.into();
        Self {
            locks_dir: coord_dir.join(LOCKS_DIR),
            agents_dir: coord_dir.join(AGENTS_DIR),
            coord_dir,
            source: RootSource::Explicit,
            config,
        }
    }

    /// Has `init` written a config file here?
    pub fn is_initialized(&self) -> bool {
        self.config_path().is_file()
    }

    /// Create the `locks/` and `agents/` directories.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.locks_dir, &self.agents_dir] {
            fs::create_dir_all(dir).map_err(|e| {
                CoordError::Storage(format!(
                    "failed to create directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.coord_dir.join(CONFIG_FILE_NAME)
    }

    /// Get the path to the check cache.
    pub fn cache_path(&self) -> PathBuf {
        self.coord_dir.join(CACHE_FILE_NAME)
    }

    pub fn lock_store(&self) -> LockStore {
        LockStore::new(&self.locks_dir)
    }

    pub fn agent_registry(&self) -> AgentRegistry {
        AgentRegistry::new(&self.agents_dir, self.config.settings.stale_threshold)
    }

    pub fn pattern_matcher(&self) -> Result<PatternMatcher> {
        PatternMatcher::new(&self.config.protected)
    }

    /// Build a lock manager over this root.
    pub fn lock_manager(&self) -> Result<LockManager> {
        Ok(LockManager::new(
            self.lock_store(),
            self.agent_registry(),
            self.pattern_matcher()?,
            &self.config.settings,
        ))
    }
}

/// Find the coordination root for an invocation from `cwd`.
pub fn discover_coord_dir(cwd: &Path, dir_override: Option<&Path>) -> (PathBuf, RootSource) {
    if let Some(dir) = dir_override {
        return (cwd.join(dir), RootSource::Explicit);
    }

    if let Some(common_dir) = git::git_common_dir(cwd) {
        return (common_dir.join(GIT_COORD_DIR), RootSource::GitCommonDir);
    }

    for ancestor in cwd.ancestors() {
        let candidate = ancestor.join(LOCAL_COORD_DIR);
        if candidate.is_dir() {
            return (candidate, RootSource::Ancestor);
        }
    }

    (cwd.join(LOCAL_COORD_DIR), RootSource::Default)
}

/// The agent id for this invocation: `explicit`, else `$LOCKSTEP_AGENT_ID`,
/// else a generated id.
pub fn resolve_agent_id(explicit: Option<&str>) -> String {
    known_agent_id(explicit).unwrap_or_else(generate_agent_id)
}

/// Like [`resolve_agent_id`], but for commands acting on an existing
/// identity, where a freshly generated id could never match anything.
pub fn require_agent_id(explicit: Option<&str>) -> Result<String> {
    known_agent_id(explicit).ok_or_else(|| {
        CoordError::UserError(format!(
            "agent ID required: pass --agent or set {}",
            AGENT_ID_ENV
        ))
    })
}

fn known_agent_id(explicit: Option<&str>) -> Option<String> {
    if let Some(id) = explicit.filter(|id| !id.trim().is_empty()) {
        return Some(id.to_string());
    }

    env::var(AGENT_ID_ENV)
        .ok()
        .filter(|id| !id.trim().is_empty())
}
