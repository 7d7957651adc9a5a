//! Durable per-agent records under `<coord-root>/agents/`.

use super::record::Agent;
use crate::error::{BatchReport, CoordError, Result};
use crate::fs::{atomic_write_file, encode_key};
use crate::locks::checked_seconds;
use chrono::{DateTime, Duration, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File extension of agent records.
pub const AGENT_EXTENSION: &str = "agent";

/// Agent records and liveness rules.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    dir: PathBuf,
    stale_threshold: Option<Duration>,
}

impl AgentRegistry {
    pub fn new<P: Into<PathBuf>>(dir: P, stale_threshold_seconds: u64) -> Self {
        Self {
            dir: dir.into(),
            stale_threshold: checked_seconds(stale_threshold_seconds),
        }
    }

    /// Path of the record for agent `id`.
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", encode_key(id), AGENT_EXTENSION))
    }

    /// Create or overwrite the record for `id` with fresh timestamps.
    pub fn register(&self, id: &str, name: Option<&str>) -> Result<Agent> {
        let agent = Agent::new(id, name);
        self.save(&agent)?;
        tracing::debug!(agent = id, "registered agent");
        Ok(agent)
    }

    /// Refresh the heartbeat of `id`, registering it first if needed.
    pub fn heartbeat(&self, id: &str) -> Result<Agent> {
        let existing = match self.read(id) {
            Ok(existing) => existing,
            Err(e) => {
                tracing::warn!(agent = id, error = %e, "replacing unreadable agent record");
                None
            }
        };

        match existing {
            Some(mut agent) => {
                agent.touch();
                self.save(&agent)?;
                Ok(agent)
            }
            None => self.register(id, None),
        }
    }

    /// Set the current task of a registered agent.
    pub fn update_task(&self, id: &str, task: Option<&str>) -> Result<Agent> {
        self.update(id, |agent| {
            agent.current_task = task.filter(|t| !t.is_empty()).map(str::to_string);
        })
    }

    /// Replace the advisory list of held locks of a registered agent.
    pub fn update_locks(&self, id: &str, locks: Vec<String>) -> Result<Agent> {
        self.update(id, |agent| agent.locks_held = locks)
    }

    fn update(&self, id: &str, mutate: impl FnOnce(&mut Agent)) -> Result<Agent> {
        let mut agent = self
            .read(id)?
            .ok_or_else(|| CoordError::NotFound(format!("agent '{}'", id)))?;

        mutate(&mut agent);
        agent.touch();
        self.save(&agent)?;
        Ok(agent)
    }

    /// Remove the record for `id`. Returns whether a record was removed.
    pub fn deregister(&self, id: &str) -> Result<bool> {
        let path = self.path_for(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CoordError::Storage(format!(
                "failed to remove agent record '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    /// Read the record for `id`, if present.
    pub fn read(&self, id: &str) -> Result<Option<Agent>> {
        read_record(&self.path_for(id))
    }

    /// Last heartbeat of `id`, or `None` if it has no readable record.
    pub fn last_heartbeat(&self, id: &str) -> Option<DateTime<Utc>> {
        match self.read(id) {
            Ok(agent) => agent.map(|a| a.last_heartbeat),
            Err(e) => {
                tracing::warn!(agent = id, error = %e, "ignoring unreadable agent record");
                None
            }
        }
    }

    /// Is the agent's heartbeat within the stale threshold?
    pub fn is_alive(&self, agent: &Agent) -> bool {
        self.is_alive_at(agent, Utc::now())
    }

    pub fn is_alive_at(&self, agent: &Agent, now: DateTime<Utc>) -> bool {
        let silent_for = now.signed_duration_since(agent.last_heartbeat);
        self.stale_threshold
            .is_none_or(|threshold| silent_for < threshold)
    }

    /// All readable agent records, sorted by id.
    pub fn list(&self) -> Result<Vec<Agent>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(CoordError::Storage(format!(
                    "failed to read agents directory '{}': {}",
                    self.dir.display(),
                    e
                )));
            }
        };

        let mut agents = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                CoordError::Storage(format!("failed to read agents directory entry: {}", e))
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(AGENT_EXTENSION) {
                continue;
            }

            match read_record(&path) {
                Ok(Some(agent)) => agents.push(agent),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable agent record");
                }
            }
        }

        agents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(agents)
    }

    /// Deregister every agent whose heartbeat is past the stale threshold.
    pub fn clean_stale(&self) -> Result<BatchReport> {
        let now = Utc::now();
        let mut report = BatchReport::default();

        for agent in self.list()? {
            if self.is_alive_at(&agent, now) {
                continue;
            }

            match self.deregister(&agent.id) {
                Ok(_) => {
                    tracing::info!(agent = %agent.id, "removed dead agent");
                    report.completed.push(agent.id);
                }
                Err(e) => report.failed.push((agent.id, e)),
            }
        }

        Ok(report)
    }

    fn save(&self, agent: &Agent) -> Result<()> {
        let json = agent.to_json()?;
        atomic_write_file(self.path_for(&agent.id), &json)
    }
}

fn read_record(path: &Path) -> Result<Option<Agent>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(CoordError::Storage(format!(
                "failed to read agent record '{}': {}",
                path.display(),
                e
            )));
        }
    };

    Agent::from_json(&content).map(Some)
}
