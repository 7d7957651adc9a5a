//! Config struct definition and default implementation.

use serde::{Deserialize, Serialize};

/// Default lock time-to-live in seconds.
pub const DEFAULT_TTL_SECONDS: u64 = 300;

/// Default heartbeat staleness threshold in seconds.
pub const DEFAULT_STALE_THRESHOLD_SECONDS: u64 = 120;

/// Default heartbeat daemon interval in seconds.
pub const DEFAULT_HEARTBEAT_INTERVAL_SECONDS: u64 = 30;

/// Upper bound for every duration setting and for lock TTLs (ten years).
pub const MAX_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

/// Configuration for a coordination root.
///
/// This struct represents the contents of `<coord-root>/config.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Config format version.
    pub version: u32,

    /// Protected resource patterns, in match order (first match wins).
    pub protected: Vec<ProtectedPattern>,

    /// Timing settings.
    pub settings: Settings,
}

/// A protected resource pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedPattern {
    /// Glob pattern (`*`, `**`, `{a,b}`), relative to the working tree root.
    pub pattern: String,

    /// Human-readable label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ProtectedPattern {
    /// Create a pattern with a display name and no description.
    pub fn named(pattern: &str, name: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            name: Some(name.to_string()),
            description: None,
        }
    }
}

/// Lock and heartbeat timing, all in seconds.
///
/// A value of zero (or a missing key) means "use the default".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// TTL applied when `acquire` is called with a TTL of zero.
    pub default_ttl: u64,

    /// How long an agent may go without a heartbeat before it is dead.
    pub stale_threshold: u64,

    /// Interval of the heartbeat daemon.
    pub heartbeat_interval: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL_SECONDS,
            stale_threshold: DEFAULT_STALE_THRESHOLD_SECONDS,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL_SECONDS,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            protected: default_protected_patterns(),
            settings: Settings::default(),
        }
    }
}

/// Patterns protected out of the box: schemas, manifests, and lockfiles.
pub fn default_protected_patterns() -> Vec<ProtectedPattern> {
    let mut patterns = vec![ProtectedPattern {
        pattern: "db/**/*".to_string(),
        name: Some("Database".to_string()),
        description: Some("Database schema and migrations".to_string()),
    }];

    patterns.extend(
        [
            ("migrations/**/*", "Migrations"),
            ("prisma/schema.prisma", "Prisma Schema"),
            ("drizzle/**/*", "Drizzle Schema"),
            ("package.json", "NPM Config"),
            ("package-lock.json", "NPM Lock"),
            ("yarn.lock", "Yarn Lock"),
            ("pnpm-lock.yaml", "PNPM Lock"),
            ("Cargo.toml", "Cargo Config"),
            ("Cargo.lock", "Cargo Lock"),
            ("go.mod", "Go Module"),
            ("go.sum", "Go Sum"),
            ("requirements.txt", "Python Requirements"),
            ("pyproject.toml", "Python Project"),
            ("poetry.lock", "Poetry Lock"),
            (".env*", "Environment Files"),
        ]
        .into_iter()
        .map(|(pattern, name)| ProtectedPattern::named(pattern, name)),
    );

    patterns
}
