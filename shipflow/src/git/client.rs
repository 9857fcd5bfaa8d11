//! Access to the local git configuration.

use crate::errors::GitError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::trace;

/// The version-control queries the repository resolver depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VcsClient: Send + Sync {
    /// Returns true if the working directory is inside a work tree.
    async fn is_inside_repository(&self) -> bool;

    /// Returns the short name of the checked out branch.
    async fn current_branch(&self) -> Result<String, GitError>;

    /// Returns the remote the current branch tracks.
    ///
    /// Falls back to `origin` when the branch has no tracking configuration.
    async fn current_branch_upstream_remote_name(&self) -> Result<String, GitError>;

    /// Returns the URL configured for a remote.
    async fn remote_url(&self, remote: &str) -> Result<String, GitError>;

    /// Returns the `(remote, merge ref)` tracking configuration of a branch.
    async fn branch_merge_config(&self, branch: &str) -> Result<(String, String), GitError>;
}

/// [`VcsClient`] backed by the `git` binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    dir: PathBuf,
}

impl GitCli {
    /// Name of the remote used when a branch does not track one.
    pub const DEFAULT_REMOTE: &'static str = "origin";

    /// Creates a client running git inside `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates a client for the process working directory.
    pub fn current_dir() -> Result<Self, GitError> {
        Self::from_working_dir(std::env::current_dir())
    }

    fn from_working_dir(dir: std::io::Result<PathBuf>) -> Result<Self, GitError> {
        dir.map(Self::new).map_err(GitError::WorkingDirectory)
    }

    /// Returns the directory git runs in.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Runs git and returns its trimmed standard output.
    pub async fn run(&self, args: &[&str]) -> Result<String, GitError> {
        trace!(args = ?args, dir = %self.dir.display(), "running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await?;

        if !output.status.success() {
            return Err(GitError::Command {
                args: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Reads a single config value; `None` when the key is unset.
    async fn config_get(&self, key: &str) -> Result<Option<String>, GitError> {
        match self.run(&["config", "--get", key]).await {
            Ok(value) if value.is_empty() => Ok(None),
            Ok(value) => Ok(Some(value)),
            // `git config --get` exits with 1 for a missing key
            Err(GitError::Command { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl VcsClient for GitCli {
    async fn is_inside_repository(&self) -> bool {
        self.run(&["rev-parse", "--is-inside-work-tree"])
            .await
            .map(|out| out == "true")
            .unwrap_or(false)
    }

    async fn current_branch(&self) -> Result<String, GitError> {
        self.run(&["symbolic-ref", "--quiet", "--short", "HEAD"]).await
    }

    async fn current_branch_upstream_remote_name(&self) -> Result<String, GitError> {
        let Ok(branch) = self.current_branch().await else {
            return Ok(Self::DEFAULT_REMOTE.to_string());
        };
        Ok(self
            .config_get(&format!("branch.{branch}.remote"))
            .await?
            .unwrap_or_else(|| Self::DEFAULT_REMOTE.to_string()))
    }

    async fn remote_url(&self, remote: &str) -> Result<String, GitError> {
        match self.run(&["remote", "get-url", remote]).await {
            Ok(url) if !url.is_empty() => Ok(url),
            Ok(_) | Err(GitError::Command { .. }) => Err(GitError::NoRemote),
            Err(e) => Err(e),
        }
    }

    async fn branch_merge_config(&self, branch: &str) -> Result<(String, String), GitError> {
        let remote = self
            .config_get(&format!("branch.{branch}.remote"))
            .await?
            .ok_or(GitError::NoRemote)?;
        let merge = self
            .config_get(&format!("branch.{branch}.merge"))
            .await?
            .unwrap_or_default();
        Ok((remote, merge))
    }
}
