//! Agent record stored in `<coord-root>/agents/*.agent`.

use crate::error::{CoordError, Result};
use crate::locks::{empty_as_none, non_empty};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One coordination participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    #[serde(rename = "agent_id")]
    pub id: String,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub name: Option<String>,

    pub started_at: DateTime<Utc>,

    pub last_heartbeat: DateTime<Utc>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub current_task: Option<String>,

    /// Advisory; the lock store is authoritative.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locks_held: Vec<String>,

    #[serde(rename = "pid", default)]
    pub process_id: u32,
}

impl Agent {
    /// A freshly started agent in this process.
    pub fn new(id: &str, name: Option<&str>) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            name: non_empty(name),
            started_at: now,
            last_heartbeat: now,
            current_task: None,
            locks_held: Vec::new(),
            process_id: std::process::id(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CoordError::Storage(format!("failed to parse agent record: {}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CoordError::Storage(format!("failed to serialize agent record: {}", e)))
    }

    /// Refresh the heartbeat to now.
    pub fn touch(&mut self) {
        self.last_heartbeat = Utc::now();
    }
}
