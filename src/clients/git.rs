//! Keeps a local working copy of the game repository in sync by shelling out to `git`.

use std::{
    io,
    path::{Path, PathBuf},
    process::Stdio,
};

use thiserror::Error;
use tokio::{fs, process::Command};
use tracing::info;

/// Failures raised while cloning or resetting the game checkout.
#[derive(Debug, Error)]
pub enum RepositorySyncError {
    /// The parent directory of the checkout could not be created.
    #[error("failed to create checkout root `{}`", .path.display())]
    CreateRoot {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The git binary could not be started at all.
    #[error("failed to run `{binary}`")]
    GitUnavailable {
        /// Binary that failed to start.
        binary: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// A git command ran but exited unsuccessfully (unreachable remote, unknown branch, ...).
    #[error("git {operation} failed with status {status:?}: {stderr}")]
    GitFailed {
        /// Git subcommand, e.g. `clone` or `fetch`.
        operation: &'static str,
        /// Exit status, absent when killed by a signal.
        status: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },
    /// The checkout directory exists but is not the root of a git working copy.
    #[error("`{}` exists but is not a git checkout", .path.display())]
    NotARepository {
        /// The offending checkout directory.
        path: PathBuf,
    },
}

/// What [`GitCli::ensure_checkout`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A fresh shallow clone was created.
    Cloned,
    /// An existing checkout was fetched and hard-reset to the remote branch.
    Reset,
}

/// Thin wrapper around the `git` command line.
#[derive(Debug, Clone)]
pub struct GitCli {
    binary: String,
}

impl GitCli {
    /// Use `binary` (usually `git`) for every operation.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Make sure `checkout_dir` holds `branch` of `repo_url`.
    ///
    /// A missing checkout is shallow-cloned (single branch). An existing one is fetched from
    /// `origin` and hard-reset to `origin/<branch>`, discarding local modifications.
    pub async fn ensure_checkout(
        &self,
        root_dir: &Path,
        checkout_dir: &Path,
        repo_url: &str,
        branch: &str,
    ) -> Result<SyncOutcome, RepositorySyncError> {
        info!(path = %root_dir.display(), "creating checkout directory");
        fs::create_dir_all(root_dir)
            .await
            .map_err(|source| RepositorySyncError::CreateRoot {
                path: root_dir.to_path_buf(),
                source,
            })?;

        if checkout_dir.exists() {
            info!(path = %checkout_dir.display(), "checkout directory already exists");
            self.reset(checkout_dir, branch).await?;
            Ok(SyncOutcome::Reset)
        } else {
            info!(path = %checkout_dir.display(), "checkout directory doesn't exist");
            self.clone_branch(checkout_dir, repo_url, branch).await?;
            Ok(SyncOutcome::Cloned)
        }
    }

    async fn clone_branch(
        &self,
        checkout_dir: &Path,
        repo_url: &str,
        branch: &str,
    ) -> Result<(), RepositorySyncError> {
        info!(
            branch,
            repo = repo_url,
            path = %checkout_dir.display(),
            "cloning game repository"
        );

        let mut command = self.command();
        command
            .args(["clone", "--depth", "1", "--single-branch", "--branch", branch])
            .arg(repo_url)
            .arg(checkout_dir);
        self.run("clone", command).await?;

        info!("game repository cloned successfully");
        Ok(())
    }

    async fn reset(&self, checkout_dir: &Path, branch: &str) -> Result<(), RepositorySyncError> {
        // `.git` is a directory for clones and a file for worktrees.
        if !checkout_dir.join(".git").exists() {
            return Err(RepositorySyncError::NotARepository {
                path: checkout_dir.to_path_buf(),
            });
        }

        let mut fetch = self.command();
        fetch.current_dir(checkout_dir).args(["fetch", "origin"]);
        self.run("fetch", fetch).await?;

        let mut reset = self.command();
        reset
            .current_dir(checkout_dir)
            .args(["reset", "--hard"])
            .arg(format!("origin/{branch}"));
        self.run("reset", reset).await?;

        info!(branch, "game repository reset successfully");
        Ok(())
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null());
        command
    }

    async fn run(
        &self,
        operation: &'static str,
        mut command: Command,
    ) -> Result<(), RepositorySyncError> {
        let output =
            command
                .output()
                .await
                .map_err(|source| RepositorySyncError::GitUnavailable {
                    binary: self.binary.clone(),
                    source,
                })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(RepositorySyncError::GitFailed {
                operation,
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}
