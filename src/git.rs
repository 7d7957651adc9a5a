//! Git command runner for lockstep.
//!
//! Git is only consulted to locate the shared coordination root: every
//! worktree of a repository resolves to the same common git directory, so a
//! root placed there is shared by all of them.

use crate::error::{CoordError, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Result of a successful git command execution.
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Standard output from the command (trimmed).
    pub stdout: String,
    /// Standard error from the command (trimmed).
    pub stderr: String,
}

impl GitOutput {
    fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}

/// Run a git command with the specified working directory.
///
/// # Returns
///
/// * `Ok(GitOutput)` - On successful execution (exit code 0)
/// * `Err(CoordError::UserError)` - If git is missing or exits non-zero
pub fn run_git<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Result<GitOutput> {
    let output = Command::new("git")
        .current_dir(cwd.as_ref())
        .args(args)
        .output()
        .map_err(|e| {
            CoordError::UserError(format!("failed to execute git: {} (is git installed?)", e))
        })?;

    let git_output = GitOutput::from_output(&output);

    if output.status.success() {
        Ok(git_output)
    } else {
        let error_msg = if git_output.stderr.is_empty() {
            git_output.stdout
        } else {
            git_output.stderr
        };

        Err(CoordError::UserError(format!(
            "git {} failed (exit code {}): {}",
            args.first().unwrap_or(&""),
            output.status.code().unwrap_or(-1),
            error_msg
        )))
    }
}

/// The common git directory shared by every worktree of the repository
/// containing `cwd`, or `None` outside a repository.
///
/// `git rev-parse --git-common-dir` may print a path relative to `cwd`; the
/// result is always absolute.
pub fn git_common_dir<P: AsRef<Path>>(cwd: P) -> Option<PathBuf> {
    let cwd = cwd.as_ref();

    match run_git(cwd, &["rev-parse", "--git-common-dir"]) {
        Ok(output) if !output.stdout.is_empty() => {
            let dir = PathBuf::from(&output.stdout);
            Some(if dir.is_absolute() { dir } else { cwd.join(dir) })
        }
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(cwd = %cwd.display(), error = %e, "not using git for discovery");
            None
        }
    }
}
