//! Thin async wrappers around the `git` command line

use super::VcsInfo;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("Failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("git {args} exited with {status}: {stderr}")]
    CommandFailed {
        args: String,
        status: String,
        stderr: String,
    },
}

impl VcsError {
    /// stderr of a failed command, or the I/O error text
    pub fn detail(&self) -> String {
        match self {
            VcsError::Spawn(e) => e.to_string(),
            VcsError::CommandFailed { stderr, .. } => stderr.clone(),
        }
    }
}

/// Runs `git <args>` in `dir` and returns trimmed stdout.
///
/// Dropping the returned future kills the `git` process.
pub async fn run_git(dir: &Path, args: &[&str]) -> Result<String, VcsError> {
    debug!(dir = %dir.display(), args = ?args, "Running git");

    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(VcsError::CommandFailed {
            args: args.join(" "),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// True when `dir` holds a git checkout (a `.git` directory or file).
pub fn is_repository(dir: &Path) -> bool {
    dir.join(".git").exists()
}

/// URL of the `origin` remote, if one is configured.
pub async fn remote_url(dir: &Path) -> Option<String> {
    run_git(dir, &["remote", "get-url", "origin"])
        .await
        .ok()
        .filter(|url| !url.is_empty())
}

/// Reads HEAD, branch, last commit author/timestamp and origin URL.
///
/// Fails only when `dir` is not a git checkout. Every field is best effort:
/// a repository without commits has no `head_sha` and a detached checkout
/// has no `branch`.
pub async fn read_vcs_info(dir: &Path) -> Result<VcsInfo, VcsError> {
    run_git(dir, &["rev-parse", "--git-dir"]).await?;

    let head_sha = run_git(dir, &["rev-parse", "--verify", "--quiet", "HEAD"])
        .await
        .ok()
        .filter(|sha| !sha.is_empty());

    let branch = run_git(dir, &["symbolic-ref", "--short", "--quiet", "HEAD"])
        .await
        .ok()
        .filter(|b| !b.is_empty());

    let (author, committed_at) = match run_git(dir, &["log", "-1", "--format=%an%n%cI"]).await {
        Ok(out) => parse_log_line(&out),
        Err(_) => (None, None),
    };

    Ok(VcsInfo {
        head_sha,
        branch,
        author,
        committed_at,
        remote_url: remote_url(dir).await,
    })
}

fn parse_log_line(out: &str) -> (Option<String>, Option<DateTime<Utc>>) {
    let mut lines = out.lines();
    let author = lines.next().map(str::to_string).filter(|a| !a.is_empty());
    let committed_at = lines
        .next()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts.trim()).ok())
        .map(|ts| ts.with_timezone(&Utc));
    (author, committed_at)
}
