//! Lock record stored in `<coord-root>/locks/*.lock`.

use crate::error::{CoordError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Exclusive ownership of one resource pattern.
///
/// The on-disk field names (`agent_id`, `agent_name`, `pid`) are kept stable
/// so records written by other tools sharing the same root stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    /// The protected pattern; the lock's identity.
    pub resource: String,

    #[serde(rename = "agent_id")]
    pub owner_id: String,

    #[serde(
        rename = "agent_name",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub owner_name: Option<String>,

    /// What the owner is doing with the resource.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub operation: Option<String>,

    /// Set once at creation.
    pub acquired_at: DateTime<Utc>,

    pub ttl_seconds: u64,

    /// Process that acquired the lock (diagnostic only).
    #[serde(rename = "pid", default)]
    pub owner_process_id: u32,
}

impl Lock {
    /// Build a lock record owned by the current process, acquired now.
    pub fn new(
        resource: &str,
        owner_id: &str,
        owner_name: Option<&str>,
        operation: Option<&str>,
        ttl_seconds: u64,
    ) -> Self {
        Self {
            resource: resource.to_string(),
            owner_id: owner_id.to_string(),
            owner_name: non_empty(owner_name),
            operation: non_empty(operation),
            acquired_at: Utc::now(),
            ttl_seconds,
            owner_process_id: std::process::id(),
        }
    }

    /// Parse a lock record from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CoordError::Storage(format!("failed to parse lock record: {}", e)))
    }

    /// Serialize the lock record to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CoordError::Storage(format!("failed to serialize lock record: {}", e)))
    }

    /// Age of the lock at `now`.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.acquired_at)
    }

    /// Has the TTL elapsed at `now`? A TTL too large to represent never does.
    pub fn ttl_expired_at(&self, now: DateTime<Utc>) -> bool {
        checked_seconds(self.ttl_seconds).is_some_and(|ttl| self.age_at(now) > ttl)
    }

    /// Do both records describe the same acquisition of the same resource?
    pub fn same_acquisition(&self, other: &Lock) -> bool {
        self.resource == other.resource
            && self.owner_id == other.owner_id
            && self.acquired_at == other.acquired_at
    }

    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id
    }

    /// The error reported to anyone else who wants this resource.
    pub fn into_conflict(self) -> CoordError {
        CoordError::Conflict {
            resource: self.resource,
            owner_id: self.owner_id,
            owner_name: self.owner_name,
            operation: self.operation,
        }
    }
}

/// Format a duration as a short human-readable age.
pub fn format_age(age: Duration) -> String {
    let seconds = age.num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

/// `seconds` as a chrono duration, or `None` when it does not fit.
pub(crate) fn checked_seconds(seconds: u64) -> Option<Duration> {
    i64::try_from(seconds).ok().and_then(Duration::try_seconds)
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

pub(crate) fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_lock_is_owned_by_this_process() {
        let lock = Lock::new("db/**/*", "agent-1", Some(""), Some("migrating"), 300);

        assert_eq!(lock.owner_process_id, std::process::id());
        assert_eq!(lock.owner_name, None);
        assert_eq!(lock.operation.as_deref(), Some("migrating"));
        assert!(lock.age_at(Utc::now()).num_seconds() < 5);
    }

    #[test]
    fn json_uses_stable_field_names() {
        let lock = Lock::new("package.json", "agent-1", Some("Bot"), None, 60);
        let json = lock.to_json().unwrap();

        assert!(json.contains("\"agent_id\": \"agent-1\""));
        assert!(json.contains("\"agent_name\": \"Bot\""));
        assert!(json.contains("\"pid\""));
        assert!(!json.contains("operation"));
    }

    #[test]
    fn parses_externally_written_record() {
        let json = r#"{
  "resource": "db/schema/*",
  "agent_id": "agent-7",
  "agent_name": "",
  "operation": "Adding email verification",
  "acquired_at": "2026-01-02T03:04:05.123456Z",
  "ttl_seconds": 300,
  "pid": 4242
}"#;
        let lock = Lock::from_json(json).unwrap();

        assert_eq!(lock.owner_id, "agent-7");
        assert_eq!(lock.owner_name, None);
        assert_eq!(lock.owner_process_id, 4242);
        assert_eq!(lock.ttl_seconds, 300);
    }

    #[test]
    fn ttl_expiry_is_strictly_greater() {
        let mut lock = Lock::new("r", "a", None, None, 10);
        let now = lock.acquired_at + Duration::seconds(10);
        assert!(!lock.ttl_expired_at(now));
        assert!(lock.ttl_expired_at(now + Duration::milliseconds(1)));

        lock.ttl_seconds = 0;
        assert!(lock.ttl_expired_at(lock.acquired_at + Duration::seconds(1)));
    }

    #[test]
    fn format_age_buckets() {
        assert_eq!(format_age(Duration::seconds(42)), "42s");
        assert_eq!(format_age(Duration::seconds(125)), "2m 5s");
        assert_eq!(format_age(Duration::minutes(135)), "2h 15m");
        assert_eq!(format_age(Duration::hours(50)), "2d 2h");
        assert_eq!(format_age(Duration::seconds(-3)), "0s");
    }
}
