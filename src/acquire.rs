//! Idempotent "ensure a local copy of a remote repository" routine.
//!
//! Backed by the external `git` binary. A target directory that already holds
//! a `.git` marker or any file counts as acquired; in update mode a `.git`
//! checkout is pulled, and a failed pull falls back to the existing copy.

use crate::error::{HarvestError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(300);

/// How a repository ended up available locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquireStatus {
    Cloned,
    Updated,
    AlreadyExists,
}

impl AcquireStatus {
    pub fn message(self, name: &str) -> String {
        match self {
            Self::Cloned => format!("Successfully cloned: {name}"),
            Self::Updated => format!("Updated: {name}"),
            Self::AlreadyExists => format!("Already exists: {name}"),
        }
    }
}

#[async_trait]
pub trait RepoAcquirer: Send + Sync {
    /// Make sure `target` holds a copy of `url`, pulling first when `update` is set.
    async fn ensure_local_copy(&self, url: &str, target: &Path, update: bool)
    -> Result<AcquireStatus>;
}

/// True when `target` has a `.git` marker or any entry at all.
pub fn is_already_acquired(target: &Path) -> bool {
    if !target.is_dir() {
        return false;
    }
    if target.join(".git").exists() {
        return true;
    }
    std::fs::read_dir(target)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// [`RepoAcquirer`] that shells out to `git`.
pub struct GitAcquirer {
    git: PathBuf,
    timeout: Duration,
}

impl GitAcquirer {
    pub fn new(git: PathBuf) -> Self {
        Self {
            git,
            timeout: DEFAULT_GIT_TIMEOUT,
        }
    }

    /// Locate `git` on PATH.
    pub fn from_path() -> Option<Self> {
        which::which("git").ok().map(Self::new)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn git_path(&self) -> &Path {
        &self.git
    }

    async fn run_git(&self, args: &[&OsStr], operation: &str) -> Result<Output> {
        let mut command = Command::new(&self.git);
        command
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| HarvestError::timeout(operation, self.timeout.as_secs()))?
            .map_err(|e| HarvestError::external_tool(format!("Failed to execute git: {e}")))
    }
}

/// Trimmed stderr, or stdout when stderr is empty.
fn failure_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[async_trait]
impl RepoAcquirer for GitAcquirer {
    async fn ensure_local_copy(
        &self,
        url: &str,
        target: &Path,
        update: bool,
    ) -> Result<AcquireStatus> {
        if is_already_acquired(target) {
            if update && target.join(".git").exists() {
                info!(target = %target.display(), "Updating repository");
                let args = [OsStr::new("-C"), target.as_os_str(), OsStr::new("pull")];
                match self.run_git(&args, "git pull").await {
                    Ok(output) if output.status.success() => return Ok(AcquireStatus::Updated),
                    Ok(output) => warn!(
                        target = %target.display(),
                        reason = %failure_text(&output),
                        "Update failed, keeping existing copy"
                    ),
                    Err(e) => warn!(
                        target = %target.display(),
                        error = %e,
                        "Update failed, keeping existing copy"
                    ),
                }
            }
            return Ok(AcquireStatus::AlreadyExists);
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        info!(url, target = %target.display(), "Cloning repository");
        let args = [
            OsStr::new("clone"),
            OsStr::new("--depth"),
            OsStr::new("1"),
            OsStr::new(url),
            target.as_os_str(),
        ];
        let output = self.run_git(&args, "git clone").await?;

        if output.status.success() {
            Ok(AcquireStatus::Cloned)
        } else {
            Err(HarvestError::external_tool(format!(
                "git clone failed: {}",
                failure_text(&output)
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_git() -> GitAcquirer {
        GitAcquirer::new(PathBuf::from("/nonexistent/bin/git-binary-xyz"))
    }

    #[test]
    fn test_already_acquired_rules() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("repo");
        assert!(!is_already_acquired(&target));

        std::fs::create_dir(&target).unwrap();
        assert!(!is_already_acquired(&target));

        std::fs::write(target.join("README.md"), "hello").unwrap();
        assert!(is_already_acquired(&target));

        let checkout = dir.path().join("checkout");
        std::fs::create_dir_all(checkout.join(".git")).unwrap();
        assert!(is_already_acquired(&checkout));
    }

    #[tokio::test]
    async fn test_existing_copy_is_not_touched() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("rules.yar"), "rule x {}").unwrap();

        let status = missing_git()
            .ensure_local_copy("https://example.invalid/repo", dir.path(), false)
            .await
            .unwrap();
        assert_eq!(status, AcquireStatus::AlreadyExists);
    }

    #[tokio::test]
    async fn test_failed_update_keeps_existing_copy() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();

        let status = missing_git()
            .ensure_local_copy("https://example.invalid/repo", dir.path(), true)
            .await
            .unwrap();
        assert_eq!(status, AcquireStatus::AlreadyExists);
    }

    #[tokio::test]
    async fn test_clone_without_git_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = missing_git()
            .ensure_local_copy("https://example.invalid/repo", &dir.path().join("new"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::ExternalTool(_)));
        assert!(err.to_string().contains("Failed to execute git"));
    }

    #[tokio::test]
    async fn test_clone_failure_reports_git_output() {
        let Some(git) = GitAcquirer::from_path() else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let missing_source = dir.path().join("does-not-exist");

        let err = git
            .ensure_local_copy(
                missing_source.to_str().unwrap(),
                &dir.path().join("clone"),
                false,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("git clone failed:"));
    }

    #[test]
    fn test_status_messages() {
        assert_eq!(AcquireStatus::Cloned.message("sigma"), "Successfully cloned: sigma");
        assert_eq!(AcquireStatus::AlreadyExists.message("sigma"), "Already exists: sigma");
    }
}
