//! Tests for the command handlers.
//!
//! Handlers are driven with an explicit absolute `--dir`, so only the tests
//! that rely on discovery from the working directory need `#[serial]`.

use super::check::split_files;
use super::init::{write_config, write_gitignore};
use super::*;
use crate::cli::{
    AgentArgs, CheckArgs, DeregisterArgs, HeartbeatArgs, InitArgs, LockArgs, RegisterArgs,
    TaskArgs, UnlockArgs, WaitArgs,
};
use crate::cache::CheckCache;
use crate::config::Config;
use crate::context::{AGENT_ID_ENV, CoordContext};
use crate::error::CoordError;
use crate::locks::Lock;
use crate::test_support::{DirGuard, create_test_repo};
use chrono::{Duration, Utc};
use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn init_root() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("coord");
    init::cmd_init(
        Some(root.as_path()),
        InitArgs {
            force: false,
            local: false,
        },
    )
    .unwrap();
    (temp_dir, root)
}

fn agent_args(id: &str) -> AgentArgs {
    AgentArgs {
        agent: Some(id.to_string()),
        name: None,
    }
}

fn lock_args(resource: &str, id: &str) -> LockArgs {
    LockArgs {
        resource: resource.to_string(),
        op: Some("editing".to_string()),
        ttl: 0,
        agent: agent_args(id),
    }
}

fn check_args(files: &[&str], id: &str, acquire: bool) -> CheckArgs {
    CheckArgs {
        files: files.iter().map(|f| f.to_string()).collect(),
        acquire,
        op: None,
        agent: agent_args(id),
    }
}

fn context(root: &Path) -> CoordContext {
    CoordContext::from_dir(root).unwrap()
}

// ============================================================================
// init
// ============================================================================

#[test]
fn test_init_creates_layout() {
    let (_tmp, root) = init_root();

    assert!(root.join("config.yaml").is_file());
    assert!(root.join("locks").is_dir());
    assert!(root.join("agents").is_dir());

    let gitignore = fs::read_to_string(root.join(".gitignore")).unwrap();
    assert!(gitignore.contains("locks/"));
    assert!(gitignore.contains("agents/"));

    let ctx = context(&root);
    assert!(ctx.is_initialized());
    assert_eq!(ctx.config, Config::default());
}

#[test]
fn test_init_keeps_existing_config_unless_forced() {
    let (_tmp, root) = init_root();
    let custom = "protected:\n  - pattern: \"schema/*.sql\"\n";
    fs::write(root.join("config.yaml"), custom).unwrap();

    let ctx = CoordContext::with_config(&root, Config::default());
    assert!(!write_config(&ctx, false).unwrap());
    assert_eq!(fs::read_to_string(root.join("config.yaml")).unwrap(), custom);

    assert!(write_config(&ctx, true).unwrap());
    assert_eq!(context(&root).config, Config::default());
}

#[test]
fn test_init_does_not_overwrite_gitignore() {
    let (_tmp, root) = init_root();
    fs::write(root.join(".gitignore"), "custom\n").unwrap();

    let ctx = CoordContext::with_config(&root, Config::default());
    assert!(!write_gitignore(&ctx).unwrap());
    assert_eq!(fs::read_to_string(root.join(".gitignore")).unwrap(), "custom\n");
}

#[test]
#[serial]
fn test_init_local_uses_current_dir() {
    let temp_dir = TempDir::new().unwrap();
    let _guard = DirGuard::new(temp_dir.path());

    init::cmd_init(
        None,
        InitArgs {
            force: false,
            local: true,
        },
    )
    .unwrap();

    let root = temp_dir.path().join(".lockstep");
    assert!(root.join("config.yaml").is_file());
    assert!(root.join(".gitignore").is_file());
}

#[test]
#[serial]
fn test_init_in_git_repo_uses_common_dir() {
    let repo = create_test_repo();
    let _guard = DirGuard::new(repo.path());

    init::cmd_init(
        None,
        InitArgs {
            force: false,
            local: false,
        },
    )
    .unwrap();

    let root = repo.path().join(".git").join("lockstep");
    assert!(root.join("config.yaml").is_file());
    assert!(root.join("locks").is_dir());
    assert!(!root.join(".gitignore").exists());
    assert!(!repo.path().join(".lockstep").exists());
}

// ============================================================================
// lock / unlock
// ============================================================================

#[test]
fn test_lock_then_conflict() {
    let (_tmp, root) = init_root();

    lock::cmd_lock(Some(root.as_path()), lock_args("db/**/*", "agent-1")).unwrap();
    let err = lock::cmd_lock(Some(root.as_path()), lock_args("db/**/*", "agent-2")).unwrap_err();

    assert!(matches!(err, CoordError::Conflict { .. }));
    assert_eq!(err.exit_code(), crate::exit_codes::CONFLICT);
}

#[test]
fn test_lock_updates_registered_agent() {
    let (_tmp, root) = init_root();
    agent::cmd_register(Some(root.as_path()), RegisterArgs { agent: agent_args("agent-1") }).unwrap();

    lock::cmd_lock(Some(root.as_path()), lock_args("package.json", "agent-1")).unwrap();
    lock::cmd_lock(Some(root.as_path()), lock_args("db/**/*", "agent-1")).unwrap();

    let registry = context(&root).agent_registry();
    let record = registry.read("agent-1").unwrap().unwrap();
    assert_eq!(record.locks_held, vec!["db/**/*", "package.json"]);

    lock::cmd_unlock(
        Some(root.as_path()),
        UnlockArgs {
            resource: Some("db/**/*".to_string()),
            all: false,
            agent: Some("agent-1".to_string()),
        },
    )
    .unwrap();
    let record = registry.read("agent-1").unwrap().unwrap();
    assert_eq!(record.locks_held, vec!["package.json"]);
}

#[test]
fn test_lock_leaves_unregistered_agent_unregistered() {
    let (_tmp, root) = init_root();
    lock::cmd_lock(Some(root.as_path()), lock_args("package.json", "agent-1")).unwrap();

    assert!(context(&root).agent_registry().read("agent-1").unwrap().is_none());
}

#[test]
fn test_unlock_foreign_lock_is_ownership_mismatch() {
    let (_tmp, root) = init_root();
    lock::cmd_lock(Some(root.as_path()), lock_args("db/**/*", "agent-1")).unwrap();

    let err = lock::cmd_unlock(
        Some(root.as_path()),
        UnlockArgs {
            resource: Some("db/**/*".to_string()),
            all: false,
            agent: Some("agent-2".to_string()),
        },
    )
    .unwrap_err();

    assert_eq!(err.exit_code(), crate::exit_codes::OWNERSHIP_MISMATCH);
    assert!(context(&root).lock_store().read("db/**/*").unwrap().is_some());
}

#[test]
fn test_unlock_all_releases_own_locks() {
    let (_tmp, root) = init_root();
    lock::cmd_lock(Some(root.as_path()), lock_args("db/**/*", "agent-1")).unwrap();
    lock::cmd_lock(Some(root.as_path()), lock_args("go.mod", "agent-1")).unwrap();
    lock::cmd_lock(Some(root.as_path()), lock_args("go.sum", "agent-2")).unwrap();

    lock::cmd_unlock(
        Some(root.as_path()),
        UnlockArgs {
            resource: None,
            all: true,
            agent: Some("agent-1".to_string()),
        },
    )
    .unwrap();

    let remaining: Vec<_> = context(&root)
        .lock_manager()
        .unwrap()
        .list()
        .unwrap()
        .into_iter()
        .map(|l| l.resource)
        .collect();
    assert_eq!(remaining, vec!["go.sum"]);
}

#[test]
#[serial]
fn test_unlock_requires_known_agent() {
    let (_tmp, root) = init_root();
    // SAFETY: serialized with every other test touching the environment.
    unsafe { std::env::remove_var(AGENT_ID_ENV) };

    let err = lock::cmd_unlock(
        Some(root.as_path()),
        UnlockArgs {
            resource: Some("db/**/*".to_string()),
            all: false,
            agent: None,
        },
    )
    .unwrap_err();
    assert!(matches!(err, CoordError::UserError(_)));
}

// ============================================================================
// check
// ============================================================================

#[test]
fn test_split_files_handles_hook_separators() {
    let args = vec![
        "db/a.sql,db/b.sql".to_string(),
        "package.json; go.mod".to_string(),
        "  src/main.rs  ".to_string(),
    ];
    assert_eq!(
        split_files(&args),
        vec!["db/a.sql", "db/b.sql", "package.json", "go.mod", "src/main.rs"]
    );
}

#[test]
fn test_check_passes_for_free_and_own_files() {
    let (_tmp, root) = init_root();
    lock::cmd_lock(Some(root.as_path()), lock_args("db/**/*", "agent-1")).unwrap();

    check::cmd_check(
        Some(root.as_path()),
        check_args(&["db/schema.sql", "package.json", "src/main.rs"], "agent-1", false),
    )
    .unwrap();

    assert!(context(&root).lock_store().read("package.json").unwrap().is_none());
}

#[test]
fn test_check_blocks_on_foreign_lock() {
    let (_tmp, root) = init_root();
    lock::cmd_lock(Some(root.as_path()), lock_args("db/**/*", "agent-1")).unwrap();

    let err = check::cmd_check(
        Some(root.as_path()),
        check_args(&["src/lib.rs,db/schema/users.sql"], "agent-2", false),
    )
    .unwrap_err();

    assert!(matches!(err, CoordError::Conflict { ref owner_id, .. } if owner_id == "agent-1"));
}

#[test]
fn test_check_ignores_stale_foreign_lock() {
    let (_tmp, root) = init_root();
    let ctx = context(&root);
    let mut stale = Lock::new("db/**/*", "ghost", None, None, 1);
    stale.acquired_at = Utc::now() - Duration::seconds(10);
    fs::write(
        ctx.lock_store().path_for("db/**/*"),
        stale.to_json().unwrap(),
    )
    .unwrap();

    check::cmd_check(Some(root.as_path()), check_args(&["db/a.sql"], "agent-2", false)).unwrap();
}

#[test]
fn test_check_acquire_takes_locks_and_caches_unprotected() {
    let (_tmp, root) = init_root();

    check::cmd_check(
        Some(root.as_path()),
        check_args(&["db/a.sql db/b.sql", "package.json", "README.md"], "agent-1", true),
    )
    .unwrap();

    let ctx = context(&root);
    let resources: Vec<_> = ctx
        .lock_manager()
        .unwrap()
        .list()
        .unwrap()
        .into_iter()
        .map(|l| l.resource)
        .collect();
    assert_eq!(resources, vec!["db/**/*", "package.json"]);

    let cache = CheckCache::load(ctx.cache_path());
    assert!(cache.is_valid(&ctx.config));
    assert!(cache.is_not_protected("README.md"));
    assert!(!cache.is_not_protected("package.json"));

    // Repeating is a no-op for the owner.
    check::cmd_check(Some(root.as_path()), check_args(&["db/a.sql"], "agent-1", true)).unwrap();

    let err = check::cmd_check(Some(root.as_path()), check_args(&["db/c.sql"], "agent-2", true))
        .unwrap_err();
    assert!(matches!(err, CoordError::Conflict { .. }));
}

// ============================================================================
// wait / gc
// ============================================================================

#[test]
fn test_wait_on_free_resource() {
    let (_tmp, root) = init_root();
    wait::cmd_wait(
        Some(root.as_path()),
        WaitArgs {
            resource: "db/**/*".to_string(),
            timeout: 1,
            interval: 1,
        },
    )
    .unwrap();
}

#[test]
fn test_wait_timeout_exit_code() {
    let (_tmp, root) = init_root();
    lock::cmd_lock(Some(root.as_path()), lock_args("db/**/*", "agent-1")).unwrap();

    let err = wait::cmd_wait(
        Some(root.as_path()),
        WaitArgs {
            resource: "db/**/*".to_string(),
            timeout: 1,
            interval: 1,
        },
    )
    .unwrap_err();
    assert_eq!(err.exit_code(), crate::exit_codes::TIMEOUT);
}

#[test]
fn test_gc_removes_stale_locks_and_dead_agents() {
    let (_tmp, root) = init_root();
    let ctx = context(&root);
    let registry = ctx.agent_registry();

    let mut dead = registry.register("dead", None).unwrap();
    dead.last_heartbeat = Utc::now() - Duration::seconds(600);
    fs::write(registry.path_for("dead"), dead.to_json().unwrap()).unwrap();
    registry.register("alive", None).unwrap();

    let mut stale = Lock::new("db/**/*", "dead", None, None, 300);
    stale.acquired_at = Utc::now() - Duration::seconds(600);
    fs::write(
        ctx.lock_store().path_for("db/**/*"),
        stale.to_json().unwrap(),
    )
    .unwrap();
    lock::cmd_lock(Some(root.as_path()), lock_args("package.json", "alive")).unwrap();

    gc::cmd_gc(Some(root.as_path())).unwrap();

    let locks: Vec<_> = ctx
        .lock_manager()
        .unwrap()
        .list()
        .unwrap()
        .into_iter()
        .map(|l| l.resource)
        .collect();
    assert_eq!(locks, vec!["package.json"]);
    let agents: Vec<_> = registry.list().unwrap().into_iter().map(|a| a.id).collect();
    assert_eq!(agents, vec!["alive"]);
}

// ============================================================================
// agents
// ============================================================================

#[test]
fn test_single_heartbeat_registers_agent() {
    let (_tmp, root) = init_root();
    agent::cmd_heartbeat(
        Some(root.as_path()),
        HeartbeatArgs {
            agent: Some("agent-1".to_string()),
            daemon: false,
            interval: None,
        },
    )
    .unwrap();

    assert!(context(&root).agent_registry().read("agent-1").unwrap().is_some());
}

#[test]
fn test_task_updates_registered_agent() {
    let (_tmp, root) = init_root();
    let err = agent::cmd_task(
        Some(root.as_path()),
        TaskArgs {
            description: "Adding OAuth".to_string(),
            agent: Some("agent-1".to_string()),
        },
    )
    .unwrap_err();
    assert!(matches!(err, CoordError::NotFound(_)));

    agent::cmd_register(Some(root.as_path()), RegisterArgs { agent: agent_args("agent-1") }).unwrap();
    agent::cmd_task(
        Some(root.as_path()),
        TaskArgs {
            description: "Adding OAuth".to_string(),
            agent: Some("agent-1".to_string()),
        },
    )
    .unwrap();

    let record = context(&root).agent_registry().read("agent-1").unwrap().unwrap();
    assert_eq!(record.current_task.as_deref(), Some("Adding OAuth"));
}

#[test]
fn test_deregister_release_all() {
    let (_tmp, root) = init_root();
    agent::cmd_register(Some(root.as_path()), RegisterArgs { agent: agent_args("agent-1") }).unwrap();
    lock::cmd_lock(Some(root.as_path()), lock_args("db/**/*", "agent-1")).unwrap();
    lock::cmd_lock(Some(root.as_path()), lock_args("Cargo.lock", "agent-2")).unwrap();

    agent::cmd_deregister(
        Some(root.as_path()),
        DeregisterArgs {
            agent: Some("agent-1".to_string()),
            release_all: true,
        },
    )
    .unwrap();

    let ctx = context(&root);
    assert!(ctx.agent_registry().read("agent-1").unwrap().is_none());
    let locks = ctx.lock_manager().unwrap().list().unwrap();
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].owner_id, "agent-2");

    // Deregistering again is harmless.
    agent::cmd_deregister(
        Some(root.as_path()),
        DeregisterArgs {
            agent: Some("agent-1".to_string()),
            release_all: false,
        },
    )
    .unwrap();
}

#[test]
fn test_dispatch_routes_status() {
    let (_tmp, root) = init_root();
    dispatch(Some(root.as_path()), crate::cli::Command::Status).unwrap();
}
